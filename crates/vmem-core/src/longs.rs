//! Atomic 64-bit array view over a mapped region

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::guard::RetainedRegion;
use crate::{Error, Result};

const SLOT_SIZE: usize = std::mem::size_of::<i64>();

/// Fixed-capacity array of 64-bit slots laid over a sub-range of a mapping.
///
/// Plain `get`/`set` carry no cross-thread ordering and are only sound under
/// caller-side synchronization; `get_volatile`, `set_ordered` and
/// `compare_and_set` give acquire, release and full-barrier semantics per
/// slot. The view holds a reference on the region for its whole lifetime, so
/// no access can ever land on unmapped memory.
pub struct LongArrayView {
    region: Arc<RetainedRegion>,
    base: *mut i64,
    capacity: usize,
}

// SAFETY: every slot access goes through a raw pointer or an atomic into
// mapped memory that the held reference keeps alive for the view's lifetime.
unsafe impl Send for LongArrayView {}
unsafe impl Sync for LongArrayView {}

impl LongArrayView {
    /// Lay `capacity` slots over the mapping, starting `base_offset` bytes
    /// in. Takes a reference on the region; released when the view drops.
    pub fn new(region: &Arc<RetainedRegion>, base_offset: usize, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidArgument("capacity must be positive".into()));
        }
        if base_offset % SLOT_SIZE != 0 {
            return Err(Error::InvalidArgument(format!(
                "base offset {base_offset} is not 8-byte aligned"
            )));
        }
        let end = capacity
            .checked_mul(SLOT_SIZE)
            .and_then(|bytes| bytes.checked_add(base_offset))
            .ok_or_else(|| Error::InvalidArgument("slot range overflows".into()))?;
        if end > region.len() {
            return Err(Error::InvalidArgument(format!(
                "{capacity} slots at offset {base_offset} exceed mapped length {}",
                region.len()
            )));
        }

        region.acquire();
        // SAFETY: base_offset lies within the mapping, checked above.
        let base = unsafe { region.addr().add(base_offset) } as *mut i64;
        Ok(Self {
            region: Arc::clone(region),
            base,
            capacity,
        })
    }

    /// Number of 64-bit slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn slot(&self, index: usize) -> Result<*mut i64> {
        if index >= self.capacity {
            return Err(Error::OutOfBounds {
                index,
                capacity: self.capacity,
            });
        }
        // SAFETY: index is in bounds, so the slot lies inside the mapping.
        Ok(unsafe { self.base.add(index) })
    }

    fn atomic(&self, index: usize) -> Result<&AtomicI64> {
        // SAFETY: the slot is 8-byte aligned and stays mapped while the view
        // holds its reference.
        self.slot(index).map(|p| unsafe { &*(p as *const AtomicI64) })
    }

    /// Plain read of one slot.
    pub fn get(&self, index: usize) -> Result<i64> {
        self.slot(index).map(|p| unsafe { p.read() })
    }

    /// Plain write of one slot.
    pub fn set(&self, index: usize, value: i64) -> Result<()> {
        self.slot(index).map(|p| unsafe { p.write(value) })
    }

    /// Acquire-ordered read: observes every write released before it.
    pub fn get_volatile(&self, index: usize) -> Result<i64> {
        self.atomic(index).map(|a| a.load(Ordering::Acquire))
    }

    /// Release-ordered write: cheaper than a full barrier, still publishes
    /// prior writes to `get_volatile` readers.
    pub fn set_ordered(&self, index: usize, value: i64) -> Result<()> {
        self.atomic(index).map(|a| a.store(value, Ordering::Release))
    }

    /// Atomically replace the slot iff it still holds `expected`; returns
    /// whether the swap happened. Linearizable with every other atomic or
    /// volatile access to the same slot.
    pub fn compare_and_set(&self, index: usize, expected: i64, value: i64) -> Result<bool> {
        self.atomic(index).map(|a| {
            a.compare_exchange(expected, value, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        })
    }

    /// Bind one slot to a reusable cursor, paying the bounds check and the
    /// index-to-address computation once.
    pub fn bind(&self, index: usize) -> Result<LongSlot<'_>> {
        let slot = self.slot(index)?;
        Ok(LongSlot { slot, _view: self })
    }
}

impl Drop for LongArrayView {
    fn drop(&mut self) {
        self.region.release();
    }
}

/// Cursor bound to one slot of a [`LongArrayView`].
pub struct LongSlot<'a> {
    slot: *mut i64,
    // Keeps the view (and through it the region reference) alive.
    _view: &'a LongArrayView,
}

// SAFETY: the cursor dereferences a single in-bounds slot of a mapping the
// borrowed view keeps alive; atomicity matches the view's accessors.
unsafe impl Send for LongSlot<'_> {}
unsafe impl Sync for LongSlot<'_> {}

impl LongSlot<'_> {
    fn atomic(&self) -> &AtomicI64 {
        // SAFETY: same alignment and lifetime argument as the view's slots.
        unsafe { &*(self.slot as *const AtomicI64) }
    }

    pub fn get(&self) -> i64 {
        unsafe { self.slot.read() }
    }

    pub fn set(&self, value: i64) {
        unsafe { self.slot.write(value) }
    }

    pub fn get_volatile(&self) -> i64 {
        self.atomic().load(Ordering::Acquire)
    }

    pub fn set_ordered(&self, value: i64) {
        self.atomic().store(value, Ordering::Release)
    }

    pub fn compare_and_set(&self, expected: i64, value: i64) -> bool {
        self.atomic()
            .compare_exchange(expected, value, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
