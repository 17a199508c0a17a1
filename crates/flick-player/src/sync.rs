//! Blocking single-assignment values.
//!
//! Stream metadata (canvas size, frame rate) becomes known only after
//! the header is decoded, while other threads may already need it. An
//! `OnceValue` blocks readers until the first publish and degenerates
//! to a plain read afterwards, since the value never changes again.

use parking_lot::{Condvar, Mutex};

struct Slot<T> {
    value: Option<T>,
    cancelled: bool,
}

/// A value that is assigned at most once and can be waited on.
pub struct OnceValue<T> {
    slot: Mutex<Slot<T>>,
    cond: Condvar,
}

impl<T: Clone> OnceValue<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: None,
                cancelled: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Publish the value. Returns `false` if a value was already set or
    /// the cell was cancelled; the first publish wins.
    pub fn set(&self, value: T) -> bool {
        let mut slot = self.slot.lock();
        if slot.value.is_some() || slot.cancelled {
            return false;
        }
        slot.value = Some(value);
        self.cond.notify_all();
        true
    }

    /// Block until the value is published, then return a copy. Returns
    /// `None` if the cell was cancelled before a publish.
    pub fn get(&self) -> Option<T> {
        let mut slot = self.slot.lock();
        while slot.value.is_none() && !slot.cancelled {
            self.cond.wait(&mut slot);
        }
        slot.value.clone()
    }

    /// Non-blocking read.
    pub fn try_get(&self) -> Option<T> {
        self.slot.lock().value.clone()
    }

    /// Wake every blocked reader with `None`. Used when the producer
    /// fails before publishing. A value already set stays readable.
    pub fn cancel(&self) {
        let mut slot = self.slot.lock();
        slot.cancelled = true;
        self.cond.notify_all();
    }
}

impl<T: Clone> Default for OnceValue<T> {
    fn default() -> Self {
        Self::new()
    }
}
