//! Process-wide error and shutdown latches.
//!
//! Both latches are single-assignment: once set they never revert.
//! Shutdown takes priority over error reporting, so an error raised
//! while shutdown is already in progress is dropped.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Shared lifecycle flags for every playback thread.
pub struct Lifecycle {
    error_flag: AtomicBool,
    error_cause: Mutex<Option<String>>,
    shutdown_flag: AtomicBool,
    terminated: Mutex<bool>,
    terminated_cond: Condvar,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            error_flag: AtomicBool::new(false),
            error_cause: Mutex::new(None),
            shutdown_flag: AtomicBool::new(false),
            terminated: Mutex::new(false),
            terminated_cond: Condvar::new(),
        }
    }

    /// Record an error cause. Only the first cause is retained, for
    /// easier fixing and reporting. Returns `true` when this call set
    /// the latch. No-op while shutting down.
    pub fn set_error(&self, cause: impl Into<String>) -> bool {
        if self.shutdown_flag.load(Ordering::SeqCst) {
            return false;
        }
        let mut slot = self.error_cause.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(cause.into());
        self.error_flag.store(true, Ordering::SeqCst);
        true
    }

    pub fn is_error(&self) -> bool {
        self.error_flag.load(Ordering::SeqCst)
    }

    /// The first recorded error cause, if any.
    pub fn error_cause(&self) -> Option<String> {
        self.error_cause.lock().clone()
    }

    /// Raise the shutdown latch. Idempotent in effect, but termination
    /// waiters are always woken, even on repeated calls.
    pub fn request_shutdown(&self) -> bool {
        let first = !self.shutdown_flag.swap(true, Ordering::SeqCst);
        if first {
            info!("shutdown requested");
        }
        let mut terminated = self.terminated.lock();
        *terminated = true;
        self.terminated_cond.notify_all();
        first
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Whether long-running loops should exit.
    pub fn should_terminate(&self) -> bool {
        self.is_shutting_down() || self.is_error()
    }

    /// Block until shutdown has been requested.
    pub fn wait_terminated(&self) {
        let mut terminated = self.terminated.lock();
        while !*terminated {
            self.terminated_cond.wait(&mut terminated);
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
