//! Reader demo - polls the counters published by the writer example
//!
//! ```bash
//! cargo run --example reader
//! ```

use std::fs::OpenOptions;
use std::thread;
use std::time::Duration;

use vmem_core::{AccessMode, MappedRegion};

const SLOTS: usize = 16;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join("vmem_demo");
    let file = OpenOptions::new().read(true).open(&path)?;

    let mapped = MappedRegion::map(&file, AccessMode::ReadOnly, 0, (SLOTS * 8) as u64)?;
    let view = mapped.longs(0, SLOTS)?;
    println!("Watching {}", path.display());

    let mut last = 0i64;
    loop {
        let round = view.get_volatile(0)?;
        if round != last {
            last = round;
            let values: Vec<i64> = (1..SLOTS).map(|i| view.get(i).unwrap()).collect();
            println!("round {round}: {values:?}");
        }
        thread::sleep(Duration::from_millis(100));
    }
}
