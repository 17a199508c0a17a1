//! The input thread.
//!
//! Drains the platform backend's raw event channel and feeds the
//! dispatcher. The loop exits when the channel closes (the coordinator
//! drops the sender on shutdown) or when the terminal latch is
//! observed after an event.

use crate::dispatcher::InputDispatcher;
use crate::events::RawInput;
use crossbeam_channel::Receiver;
use flick_player::Lifecycle;
use std::sync::Arc;
use std::thread;
use tracing::{error, info};

/// Owns the spawned input loop.
pub struct InputThread {
    thread: Option<thread::JoinHandle<()>>,
}

impl InputThread {
    pub fn spawn(
        dispatcher: Arc<InputDispatcher>,
        events: Receiver<RawInput>,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        let thread = thread::Builder::new()
            .name("flick-input".to_string())
            .spawn(move || run_loop(dispatcher, events, lifecycle))
            .ok();
        if thread.is_none() {
            error!("failed to spawn input thread");
        }
        Self { thread }
    }

    /// Wait for the loop to exit. The coordinator drops the raw event
    /// sender first, which unblocks the receive.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("input thread panicked");
            }
        }
    }
}

impl Drop for InputThread {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop(
    dispatcher: Arc<InputDispatcher>,
    events: Receiver<RawInput>,
    lifecycle: Arc<Lifecycle>,
) {
    info!("input thread up");
    while let Ok(raw) = events.recv() {
        if lifecycle.should_terminate() {
            break;
        }
        dispatcher.handle(raw);
    }
    info!("input thread down");
}
