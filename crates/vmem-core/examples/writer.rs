//! Writer demo - publishes counters through a shared mapped file
//!
//! Run this first, then the reader in another terminal:
//! ```bash
//! cargo run --example writer
//! ```

use std::fs::OpenOptions;
use std::thread;
use std::time::Duration;

use vmem_core::{AccessMode, MappedRegion};

const SLOTS: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join("vmem_demo");
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&path)?;
    file.set_len((SLOTS * 8) as u64)?;

    let mapped = MappedRegion::map(&file, AccessMode::ReadWrite, 0, (SLOTS * 8) as u64)?;
    let view = mapped.longs(0, SLOTS)?;
    println!("Publishing to {}", path.display());

    for round in 1i64.. {
        for i in 1..SLOTS {
            view.set(i, round * i as i64)?;
        }
        // The round number goes last; readers trust the data slots only
        // after seeing it.
        view.set_ordered(0, round)?;
        println!("published round {round}");
        thread::sleep(Duration::from_secs(1));
    }
    Ok(())
}
