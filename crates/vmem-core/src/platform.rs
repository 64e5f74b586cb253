//! Platform memory facts: page size, mapping granularity, address width

use std::sync::OnceLock;

/// Windows aligns file mappings to its 64 KiB allocation granularity
/// regardless of the page size.
const WINDOWS_ALLOCATION_GRANULARITY: usize = 64 << 10;

/// Used when the sysconf query is inconclusive.
const DEFAULT_PAGE_SIZE: usize = 4096;

struct Facts {
    page_size: usize,
    map_alignment: usize,
    is_64bit: bool,
}

static FACTS: OnceLock<Facts> = OnceLock::new();

fn facts() -> &'static Facts {
    FACTS.get_or_init(|| {
        let page_size = probe_page_size();
        let map_alignment = if cfg!(windows) {
            WINDOWS_ALLOCATION_GRANULARITY
        } else {
            page_size
        };
        Facts {
            page_size,
            map_alignment,
            is_64bit: cfg!(target_pointer_width = "64"),
        }
    })
}

fn probe_page_size() -> usize {
    use nix::unistd::{sysconf, SysconfVar};
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => DEFAULT_PAGE_SIZE,
    }
}

/// OS-reported virtual memory page size.
pub fn page_size() -> usize {
    facts().page_size
}

/// Granularity to which mapping offsets and lengths must be rounded.
///
/// Equal to [`page_size`] except on Windows, where the mapping API mandates
/// the larger allocation granularity.
pub fn map_alignment() -> usize {
    facts().map_alignment
}

/// Whether the process address space is 64-bit, per the compilation target.
pub fn is_64bit() -> bool {
    facts().is_64bit
}

/// Round `size` up to the next multiple of [`map_alignment`].
///
/// Every offset and length handed to the native mapping primitives must go
/// through this; an unaligned request is undefined behavior at that layer,
/// not a recoverable error.
pub fn align_up(size: u64) -> u64 {
    let align = map_alignment() as u64;
    size.div_ceil(align) * align
}
