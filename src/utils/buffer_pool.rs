//! Fixed-size slab pool with borrow/return semantics. All memory lives in a
//! single contiguous block allocated up front and guarded by a mutex; slots
//! are handed out as move-only RAII handles that return themselves on drop
//! and access their bytes through mapped lock guards.

use parking_lot::{Condvar, MappedMutexGuard, Mutex, MutexGuard};
use std::sync::Arc;

struct PoolInner {
    // Contiguous backing store, slot_size * slot_count bytes. Slot ranges
    // are disjoint; the free list hands each index to at most one borrower.
    storage: Mutex<Vec<u8>>,
    slot_size: usize,
    slot_count: usize,
    free: Mutex<Vec<usize>>,
    available: Condvar,
}

/// Thread-safe pool over a pre-allocated contiguous byte store.
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(slot_size: usize, slot_count: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                storage: Mutex::new(vec![0; slot_size * slot_count]),
                slot_size,
                slot_count,
                free: Mutex::new((0..slot_count).rev().collect()),
                available: Condvar::new(),
            }),
        }
    }

    /// Blocking borrow: waits until a slot is returned.
    pub fn borrow(&self) -> BufferSlot {
        let mut free = self.inner.free.lock();
        while free.is_empty() {
            self.inner.available.wait(&mut free);
        }
        let index = free.pop().expect("non-empty free list");
        BufferSlot {
            inner: Arc::clone(&self.inner),
            index,
        }
    }

    /// Non-blocking borrow: `None` when the pool is exhausted.
    pub fn try_borrow(&self) -> Option<BufferSlot> {
        let index = self.inner.free.lock().pop()?;
        Some(BufferSlot {
            inner: Arc::clone(&self.inner),
            index,
        })
    }

    pub fn available(&self) -> usize {
        self.inner.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.slot_count
    }

    pub fn slot_size(&self) -> usize {
        self.inner.slot_size
    }
}

/// Move-only handle to one borrowed slot. Returns the slot and wakes one
/// waiter when dropped.
pub struct BufferSlot {
    inner: Arc<PoolInner>,
    index: usize,
}

impl BufferSlot {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.inner.slot_size
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slot_size == 0
    }

    /// Read access to this slot's bytes. Holds the storage lock for the
    /// guard's lifetime.
    pub fn data(&self) -> MappedMutexGuard<'_, [u8]> {
        self.guard()
    }

    /// Write access to this slot's bytes. Holds the storage lock for the
    /// guard's lifetime.
    pub fn data_mut(&mut self) -> MappedMutexGuard<'_, [u8]> {
        self.guard()
    }

    fn guard(&self) -> MappedMutexGuard<'_, [u8]> {
        let start = self.index * self.inner.slot_size;
        let end = start + self.inner.slot_size;
        MutexGuard::map(self.inner.storage.lock(), |storage| {
            &mut storage[start..end]
        })
    }
}

impl Drop for BufferSlot {
    fn drop(&mut self) {
        self.inner.free.lock().push(self.index);
        self.inner.available.notify_one();
    }
}
