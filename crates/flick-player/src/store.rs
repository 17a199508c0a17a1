//! The append-only frame store.
//!
//! Single producer (the parse job) appends operations to an in-progress
//! frame and publishes it with `commit`. Consumers only ever observe
//! committed frames, gated by the monotonic `frames_loaded` watermark.
//! Failure is terminal: once `mark_failed` runs, no later frame becomes
//! available and every blocked waiter is released.

use crate::sync::OnceValue;
use crossbeam_channel::Sender;
use flick_core::{
    DictionaryEntry, FlickError, Frame, FrameOp, FrameRate, Rect, Result, Rgb, SharedFrame,
};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// Notifications pushed to the coordinator as parsing progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The header's frame rate has been published.
    RateKnown(FrameRate),
    /// The first frame has been committed; playback pacing can start.
    FirstFrame,
}

struct StoreInner {
    frames: Vec<SharedFrame>,
    current: Option<Frame>,
    total: usize,
    reserved: bool,
    closed: bool,
    fail_cause: Option<String>,
    dictionary: Vec<DictionaryEntry>,
}

/// Append-only sequence of committed frames plus the stream metadata
/// watermarks.
pub struct FrameStore {
    inner: Mutex<StoreInner>,
    new_frame: Condvar,
    frames_loaded: AtomicUsize,
    failed: AtomicBool,
    shutdown: AtomicBool,
    canvas: OnceValue<Rect>,
    frame_rate: OnceValue<FrameRate>,
    background: Mutex<Rgb>,
    events: Option<Sender<StoreEvent>>,
}

impl FrameStore {
    /// Create an empty store. `events` receives progress notifications;
    /// pass `None` when nothing is wired to them (tests, probing).
    pub fn new(events: Option<Sender<StoreEvent>>) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                frames: Vec::new(),
                current: Some(Frame::new()),
                total: 0,
                reserved: false,
                closed: false,
                fail_cause: None,
                dictionary: Vec::new(),
            }),
            new_frame: Condvar::new(),
            frames_loaded: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            canvas: OnceValue::new(),
            frame_rate: OnceValue::new(),
            background: Mutex::new(Rgb::WHITE),
            events,
        }
    }

    // ── Producer side ──────────────────────────────────────────────

    /// Fix the backing capacity from the header's declared frame count.
    /// Must precede any `append`.
    pub fn reserve(&self, total_frames: usize) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.reserved {
            return Err(FlickError::Internal(
                "frame store reserved twice".to_string(),
            ));
        }
        inner.frames.reserve_exact(total_frames);
        inner.total = total_frames;
        inner.reserved = true;
        debug!(total_frames, "frame store reserved");
        Ok(())
    }

    /// Append one operation to the in-progress frame.
    pub fn append(&self, op: FrameOp) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(cause) = &inner.fail_cause {
            return Err(FlickError::Format(cause.clone()));
        }
        if !inner.reserved {
            return Err(FlickError::Internal(
                "append before reserve".to_string(),
            ));
        }
        match inner.current.as_mut() {
            Some(frame) => {
                frame.push(op);
                Ok(())
            }
            None => Err(FlickError::Format(
                "append to a closed frame store".to_string(),
            )),
        }
    }

    /// Publish the in-progress frame. With `continue_to_next` a fresh
    /// in-progress frame is opened; otherwise the store closes for
    /// good and no further frame is ever appended.
    pub fn commit(&self, continue_to_next: bool) -> Result<()> {
        let first;
        {
            let mut inner = self.inner.lock();
            if inner.closed {
                return Err(FlickError::Format(
                    "commit on a closed frame store".to_string(),
                ));
            }
            let frame = inner.current.take().ok_or_else(|| {
                FlickError::Internal("commit without an in-progress frame".to_string())
            })?;
            if inner.reserved && inner.frames.len() == inner.total {
                // Restore the frame so the store state stays coherent
                // for the failure path.
                inner.current = Some(frame);
                return Err(FlickError::Capacity(format!(
                    "stream contains more than the declared {} frames",
                    inner.total
                )));
            }
            inner.frames.push(SharedFrame::new(frame));
            self.frames_loaded.store(inner.frames.len(), Ordering::SeqCst);
            if continue_to_next {
                inner.current = Some(Frame::new());
            } else {
                inner.closed = true;
            }
            first = inner.frames.len() == 1;
        }
        self.new_frame.notify_all();
        if first {
            info!("first frame committed");
            if let Some(events) = &self.events {
                let _ = events.send(StoreEvent::FirstFrame);
            }
        }
        Ok(())
    }

    /// Discard an in-progress frame that never received any content.
    /// Guards against the trailing empty frame some streams carry
    /// before the end marker. Closes the store.
    pub fn revert(&self) {
        let mut inner = self.inner.lock();
        if let Some(frame) = inner.current.take() {
            assert!(
                frame.is_empty(),
                "revert discards only frames without content"
            );
        }
        inner.closed = true;
    }

    /// Name the in-progress frame. Labels can only be assigned before
    /// the frame's commit finalization.
    pub fn label_current_frame(&self, name: impl Into<String>) -> Result<()> {
        let mut inner = self.inner.lock();
        match inner.current.as_mut() {
            Some(frame) => {
                frame.label = Some(name.into());
                Ok(())
            }
            None => Err(FlickError::Format(
                "label on a closed frame store".to_string(),
            )),
        }
    }

    /// Record a terminal parse failure. Idempotent; the first cause is
    /// retained. Every blocked waiter is released and the metadata
    /// watermarks are cancelled so nobody waits on a rate that will
    /// never arrive.
    pub fn mark_failed(&self, cause: impl Into<String>) {
        {
            let mut inner = self.inner.lock();
            if inner.fail_cause.is_some() {
                return;
            }
            let cause = cause.into();
            warn!(%cause, "frame store marked failed");
            inner.fail_cause = Some(cause);
        }
        self.failed.store(true, Ordering::SeqCst);
        self.canvas.cancel();
        self.frame_rate.cancel();
        self.new_frame.notify_all();
    }

    /// Release waiters because playback is shutting down. Not a
    /// failure; `wait_for_frame` reports `ShuttingDown` instead.
    pub fn notify_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.canvas.cancel();
        self.frame_rate.cancel();
        self.new_frame.notify_all();
    }

    // ── Consumer side ──────────────────────────────────────────────

    /// Block until frame `index` has been committed, then return it.
    /// Subsequent calls for the same index return immediately.
    pub fn wait_for_frame(&self, index: usize) -> Result<SharedFrame> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(cause) = &inner.fail_cause {
                return Err(FlickError::Format(cause.clone()));
            }
            if self.shutdown.load(Ordering::SeqCst) {
                return Err(FlickError::ShuttingDown);
            }
            if index < inner.frames.len() {
                return Ok(inner.frames[index].clone());
            }
            if inner.closed {
                // No producer will ever publish this index.
                return Err(FlickError::Format(format!(
                    "frame {} past the end of a closed stream",
                    index
                )));
            }
            self.new_frame.wait(&mut inner);
        }
    }

    /// Published count of committed frames. Monotonic.
    pub fn frames_loaded(&self) -> usize {
        self.frames_loaded.load(Ordering::SeqCst)
    }

    /// Declared total frame count, 0 before `reserve`.
    pub fn total_frames(&self) -> usize {
        self.inner.lock().total
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn fail_cause(&self) -> Option<String> {
        self.inner.lock().fail_cause.clone()
    }

    // ── Stream metadata ────────────────────────────────────────────

    /// Publish the canvas rectangle decoded from the header.
    pub fn set_canvas(&self, canvas: Rect) {
        self.canvas.set(canvas);
    }

    /// Block until the canvas rectangle is known. `None` after failure
    /// or shutdown before the header was decoded.
    pub fn canvas(&self) -> Option<Rect> {
        self.canvas.get()
    }

    /// Publish the frame rate decoded from the header and notify the
    /// coordinator so render pacing can start.
    pub fn set_frame_rate(&self, rate: FrameRate) {
        if self.frame_rate.set(rate) {
            if let Some(events) = &self.events {
                let _ = events.send(StoreEvent::RateKnown(rate));
            }
        }
    }

    /// Block until the frame rate is known.
    pub fn frame_rate(&self) -> Option<FrameRate> {
        self.frame_rate.get()
    }

    /// Non-blocking frame rate read.
    pub fn try_frame_rate(&self) -> Option<FrameRate> {
        self.frame_rate.try_get()
    }

    pub fn set_background(&self, color: Rgb) {
        *self.background.lock() = color;
    }

    pub fn background(&self) -> Rgb {
        *self.background.lock()
    }

    // ── Dictionary ─────────────────────────────────────────────────

    /// Register a resource. Resources have no frame effect.
    pub fn add_to_dictionary(&self, entry: DictionaryEntry) {
        self.inner.lock().dictionary.push(entry);
    }

    /// Look up a resource by id.
    pub fn dictionary_lookup(&self, id: u16) -> Option<DictionaryEntry> {
        self.inner
            .lock()
            .dictionary
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }
}
