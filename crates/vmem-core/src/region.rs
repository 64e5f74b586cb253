//! File-backed virtual memory mappings

use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::os::fd::AsFd;
use std::ptr::NonNull;

use nix::libc::off_t;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};

use crate::platform;
use crate::{Error, Result};

/// Mappings above 4 GiB are unusable on Windows; fail before the native call.
const WINDOWS_MAP_CEILING: u64 = 4 << 30;

/// Access mode for a mapped region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
    /// Copy-on-write: stores stay private to this process.
    Private,
}

impl AccessMode {
    fn prot(self) -> ProtFlags {
        match self {
            AccessMode::ReadOnly => ProtFlags::PROT_READ,
            AccessMode::ReadWrite | AccessMode::Private => {
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE
            }
        }
    }

    fn flags(self) -> MapFlags {
        match self {
            AccessMode::ReadOnly | AccessMode::ReadWrite => MapFlags::MAP_SHARED,
            AccessMode::Private => MapFlags::MAP_PRIVATE,
        }
    }
}

/// A live virtual memory mapping: base address plus the aligned length
/// actually mapped.
///
/// Produced by [`map`], consumed by [`unmap`]. Deliberately not `Clone`:
/// exactly one [`RetainedRegion`](crate::RetainedRegion) owns a handle, and
/// unmapping the same range twice is undefined behavior at the native layer.
#[derive(Debug)]
pub struct RegionHandle {
    addr: NonNull<c_void>,
    len: usize,
}

impl RegionHandle {
    /// Base address of the mapping.
    pub fn addr(&self) -> *mut u8 {
        self.addr.as_ptr().cast()
    }

    /// Mapped length in bytes, rounded up to [`platform::map_alignment`].
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Map `size` bytes of `file` starting at `offset`.
///
/// Offset and size are rounded up to the platform mapping granularity before
/// the native call. The returned handle should be wrapped in a
/// [`RetainedRegion`](crate::RetainedRegion) immediately; no bookkeeping
/// happens here.
pub fn map<F: AsFd>(file: &F, mode: AccessMode, offset: u64, size: u64) -> Result<RegionHandle> {
    if size == 0 {
        return Err(Error::InvalidArgument(
            "mapping size must be positive".into(),
        ));
    }
    if cfg!(windows) && size > WINDOWS_MAP_CEILING {
        return Err(Error::InvalidArgument(format!(
            "mapping {} MiB exceeds the 4096 MiB Windows ceiling",
            size >> 20
        )));
    }

    let aligned_offset = platform::align_up(offset);
    let aligned_size = platform::align_up(size);
    let length = usize::try_from(aligned_size)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            Error::InvalidArgument(format!("size {size} does not fit the address space"))
        })?;
    let native_offset = off_t::try_from(aligned_offset)
        .map_err(|_| Error::InvalidArgument(format!("offset {offset} out of range")))?;

    // SAFETY: length and offset are aligned to the mapping granularity and
    // the descriptor stays open for the duration of the call.
    let addr = unsafe { mmap(None, length, mode.prot(), mode.flags(), file, native_offset) }
        .map_err(|errno| Error::Map {
            mode,
            offset,
            size,
            errno,
        })?;

    Ok(RegionHandle {
        addr,
        len: length.get(),
    })
}

/// Unmap a region.
///
/// Must be called exactly once per handle, and only by the zero-transition
/// logic of [`RetainedRegion`](crate::RetainedRegion), never directly by
/// application code. Failure is not retried; a partially unmapped region
/// cannot be restored.
pub fn unmap(handle: &RegionHandle) -> Result<()> {
    // SAFETY: the address and length come from a successful map() and the
    // refcount logic guarantees this is the only unmap of the handle.
    unsafe { munmap(handle.addr, handle.len) }.map_err(|errno| Error::Unmap {
        addr: handle.addr.as_ptr() as usize,
        len: handle.len,
        errno,
    })
}
