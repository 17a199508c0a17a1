//! Playback cursor state.
//!
//! `current_frame` is mutated exclusively by the frame-advance tick
//! handler (single writer) and read by the render thread and external
//! queries, so plain atomics are enough.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// The playback cursor and stop flag.
#[derive(Debug, Default)]
pub struct PlaybackState {
    current: AtomicUsize,
    stopped: AtomicBool,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the frame currently on screen.
    pub fn current_frame(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Halt frame advancement. Rendering continues on the held frame.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Resume frame advancement.
    pub fn resume(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Advance one frame. Called only from the frame-advance tick.
    ///
    /// While the stream is still loading the cursor holds at the last
    /// published frame rather than outrunning the parser; once every
    /// declared frame is loaded, playback loops from the top.
    pub fn advance(&self, frames_loaded: usize, total_frames: usize) {
        if self.is_stopped() || frames_loaded == 0 {
            return;
        }
        let cur = self.current.load(Ordering::SeqCst);
        let next = cur + 1;
        if next < frames_loaded {
            self.current.store(next, Ordering::SeqCst);
        } else if frames_loaded == total_frames {
            self.current.store(0, Ordering::SeqCst);
        }
        // Otherwise hold: the next frame is not published yet.
    }
}
