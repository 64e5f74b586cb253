//! Reference-counted mapping lifetime

use std::os::fd::AsFd;
use std::sync::atomic::{fence, AtomicI64, Ordering};
use std::sync::Arc;

use crate::longs::LongArrayView;
use crate::region::{self, AccessMode, RegionHandle};
use crate::Result;

/// Unmap hook. [`RetainedRegion::new`] wires this to [`region::unmap`];
/// tests substitute a counting hook.
pub type UnmapFn = Box<dyn Fn(&RegionHandle) -> Result<()> + Send + Sync>;

/// Reference-counted owner of a [`RegionHandle`].
///
/// Every borrower takes a reference with [`acquire`](Self::acquire) before
/// touching the mapped bytes and drops it with [`release`](Self::release);
/// the munmap syscall fires exactly once, at the transition from one
/// reference to zero. The count protects against premature unmap only;
/// callers still have to hold a reference before publishing the region to
/// another thread.
pub struct RetainedRegion {
    handle: RegionHandle,
    refs: AtomicI64,
    unmap: UnmapFn,
}

// SAFETY: the mapped bytes may be read and written from any thread; the
// reference count is only mutated atomically and the handle itself stays
// immutable until the final release.
unsafe impl Send for RetainedRegion {}
unsafe impl Sync for RetainedRegion {}

impl RetainedRegion {
    /// Wrap a freshly mapped handle. The creator holds the initial
    /// reference and must eventually call [`release`](Self::release).
    pub fn new(handle: RegionHandle) -> Self {
        Self::with_unmapper(handle, Box::new(region::unmap))
    }

    /// Like [`new`](Self::new) with a custom unmap hook, e.g. to count
    /// invocations in tests.
    pub fn with_unmapper(handle: RegionHandle, unmap: UnmapFn) -> Self {
        Self {
            handle,
            refs: AtomicI64::new(1),
            unmap,
        }
    }

    /// Base address of the mapping.
    pub fn addr(&self) -> *mut u8 {
        self.handle.addr()
    }

    /// Mapped length in bytes.
    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handle.is_empty()
    }

    /// Current number of live references. Racy by nature; diagnostics only.
    pub fn ref_count(&self) -> i64 {
        self.refs.load(Ordering::Acquire)
    }

    /// Whether the handle was still valid at the moment of inspection.
    pub fn is_mapped(&self) -> bool {
        self.ref_count() > 0
    }

    /// Take a reference before reading or writing through the mapping, or
    /// before handing the region to another borrower.
    ///
    /// # Panics
    ///
    /// Panics if the region has already been unmapped; no acquire may
    /// succeed once the count has reached zero.
    pub fn acquire(&self) {
        let ok = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > 0).then_some(n + 1)
            });
        assert!(ok.is_ok(), "acquire on an unmapped region");
    }

    /// Drop a reference. The final release unmaps the region as part of the
    /// same logical step.
    ///
    /// # Panics
    ///
    /// Panics on underflow (more releases than acquires); letting the count
    /// wrap would fire a second unmap, a use-after-free at the native layer.
    pub fn release(&self) {
        let prev = self.refs.fetch_sub(1, Ordering::Release);
        assert!(prev > 0, "release without a matching acquire");
        if prev == 1 {
            // Synchronize with every preceding release before the handle dies.
            fence(Ordering::Acquire);
            if let Err(e) = (self.unmap)(&self.handle) {
                log::error!("failed to unmap region at {:p}: {e}", self.addr());
            }
        }
    }
}

#[cfg(feature = "leak-detect")]
impl Drop for RetainedRegion {
    fn drop(&mut self) {
        let refs = *self.refs.get_mut();
        if refs > 0 {
            // Leaked pages are reclaimed at process exit; unmapping under a
            // live borrower is not recoverable at all.
            log::warn!(
                "region at {:p} dropped with {refs} live reference(s); mapping leaked",
                self.handle.addr()
            );
        }
    }
}

/// Owning handle for a mapped byte range of a file.
///
/// Maps on construction and releases the initial reference when dropped:
/// scope exit of the owner and of every outstanding view is what finally
/// unmaps the region, not a finalizer.
pub struct MappedRegion {
    region: Arc<RetainedRegion>,
}

impl MappedRegion {
    /// Map `size` bytes of `file` at `offset` and take ownership of the
    /// region's initial reference.
    pub fn map<F: AsFd>(file: &F, mode: AccessMode, offset: u64, size: u64) -> Result<Self> {
        let handle = region::map(file, mode, offset, size)?;
        Ok(Self {
            region: Arc::new(RetainedRegion::new(handle)),
        })
    }

    /// Mapped length in bytes (alignment-rounded).
    pub fn len(&self) -> usize {
        self.region.len()
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// The shared reference-counted core, for borrowers that manage their
    /// own acquire/release pairing.
    pub fn retained(&self) -> &Arc<RetainedRegion> {
        &self.region
    }

    /// Interpret `capacity` 64-bit slots starting `base_offset` bytes into
    /// the mapping as an atomic long array. The view holds its own
    /// reference, so the region stays mapped until the view is gone too.
    pub fn longs(&self, base_offset: usize, capacity: usize) -> Result<LongArrayView> {
        LongArrayView::new(&self.region, base_offset, capacity)
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        self.region.release();
    }
}
