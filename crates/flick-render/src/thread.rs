//! The render thread and its wake/handshake plumbing.
//!
//! One thread owns the surface. Other threads only ever talk to it
//! through [`RenderHandle`]: redraw requests go over an unbounded wake
//! channel and collapse into a single draw, hit-test requests flip a
//! pending flag and block on a done channel until the identifier
//! buffer has been read back.

use crate::surface::{IdBuffer, RenderSurface};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use flick_core::FlickError;
use flick_player::{FrameStore, Lifecycle, PlaybackState, ThreadProfile};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Identifier sampled where no interactive target was drawn, and the
/// fallback answer when the render thread is gone.
pub const NO_TARGET: f32 = 0.0;

struct FpsCounter {
    window_start: Instant,
    frames: u32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
        }
    }

    fn frame(&mut self) {
        self.frames += 1;
        let elapsed = self.window_start.elapsed();
        if elapsed >= Duration::from_secs(1) {
            debug!(fps = self.frames, "redraw requests in the last second");
            self.window_start = Instant::now();
            self.frames = 0;
        }
    }
}

/// Shared side of the render thread. Lives behind an `Arc`; every
/// method is safe to call from any thread.
pub struct RenderHandle {
    wake_tx: Sender<()>,
    hit_done_rx: Receiver<()>,
    hit_pending: AtomicBool,
    // Serializes requesters; the done channel carries one handshake at
    // a time.
    hit_lock: Mutex<()>,
    id_buffer: Mutex<Option<IdBuffer>>,
    fps: Mutex<FpsCounter>,
}

impl RenderHandle {
    /// Ask for a redraw. Requests arriving while a draw is in flight
    /// are collapsed into one.
    pub fn request_draw(&self) {
        // Send failure means the render thread already exited; the
        // request is moot.
        let _ = self.wake_tx.send(());
        self.fps.lock().frame();
    }

    /// Synchronously resolve the interactive target under a canvas
    /// point. Blocks until the render thread has produced a fresh
    /// identifier pass, then samples it. Returns [`NO_TARGET`] when
    /// the render thread has shut down.
    pub fn request_hit_test(&self, x: u32, y: u32) -> f32 {
        let _serial = self.hit_lock.lock();
        self.hit_pending.store(true, Ordering::SeqCst);
        if self.wake_tx.send(()).is_err() {
            return NO_TARGET;
        }
        if self.hit_done_rx.recv().is_err() {
            // The thread exited with the request in flight.
            return NO_TARGET;
        }
        match self.id_buffer.lock().as_ref() {
            Some(buffer) => buffer.id_at(x, y),
            None => NO_TARGET,
        }
    }
}

/// Everything the render loop reads from the rest of the pipeline.
pub struct RenderContext {
    pub store: Arc<FrameStore>,
    pub playback: Arc<PlaybackState>,
    pub lifecycle: Arc<Lifecycle>,
    pub profile: Arc<ThreadProfile>,
    /// Called with the cause when a surface operation fails; the owner
    /// decides whether that trips the terminal error latch.
    pub on_error: Arc<dyn Fn(String) + Send + Sync>,
}

/// Owns the spawned render thread.
pub struct RenderThread {
    handle: Arc<RenderHandle>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RenderThread {
    /// Spawn the render thread over a surface. The surface moves into
    /// the thread and is dropped when the loop exits.
    pub fn spawn<S: RenderSurface + 'static>(surface: S, ctx: RenderContext) -> Self {
        let (wake_tx, wake_rx) = unbounded();
        let (hit_done_tx, hit_done_rx) = bounded(1);
        let handle = Arc::new(RenderHandle {
            wake_tx,
            hit_done_rx,
            hit_pending: AtomicBool::new(false),
            hit_lock: Mutex::new(()),
            id_buffer: Mutex::new(None),
            fps: Mutex::new(FpsCounter::new()),
        });

        let loop_handle = Arc::clone(&handle);
        let thread = thread::Builder::new()
            .name("flick-render".to_string())
            .spawn(move || run_loop(surface, ctx, loop_handle, wake_rx, hit_done_tx))
            .ok();
        if thread.is_none() {
            error!("failed to spawn render thread");
        }

        Self {
            handle,
            thread,
        }
    }

    pub fn handle(&self) -> Arc<RenderHandle> {
        Arc::clone(&self.handle)
    }

    /// Wait for the render loop to exit. The loop exits on the next
    /// wake delivered after the terminal latch is raised, so callers
    /// send one final `request_draw` before joining.
    pub fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop<S: RenderSurface>(
    mut surface: S,
    ctx: RenderContext,
    handle: Arc<RenderHandle>,
    wake_rx: Receiver<()>,
    hit_done_tx: Sender<()>,
) {
    info!("render thread up");
    loop {
        if wake_rx.recv().is_err() {
            break;
        }
        let started = Instant::now();

        // A pending hit test is serviced before the drain so the
        // requester never waits behind a collapsed draw.
        service_hit_test(&mut surface, &ctx, &handle, &hit_done_tx);

        // Collapse every wake that piled up while we were busy.
        let mut faked = 0u32;
        while wake_rx.try_recv().is_ok() {
            faked += 1;
            if ctx.lifecycle.is_shutting_down() {
                break;
            }
        }
        if faked > 0 {
            debug!(count = faked, "coalesced redundant redraw requests");
        }

        // The pending flag is raised before the requester's wake is
        // sent, so re-checking after the drain catches a request whose
        // wake the drain just swallowed.
        service_hit_test(&mut surface, &ctx, &handle, &hit_done_tx);

        if ctx.lifecycle.is_shutting_down() {
            break;
        }

        if ctx.lifecycle.is_error() {
            let cause = ctx
                .lifecycle
                .error_cause()
                .unwrap_or_else(|| "unknown error".to_string());
            if let Err(e) = surface.present_diagnostic(&cause) {
                error!(error = %e, "failed to present diagnostic view");
            }
        } else {
            match ctx.store.wait_for_frame(ctx.playback.current_frame()) {
                Ok(frame) => {
                    if let Err(e) = surface.present_frame(&frame, ctx.store.background()) {
                        (ctx.on_error)(e.to_string());
                    }
                }
                Err(FlickError::ShuttingDown) => break,
                Err(_) => {
                    // The store failed; the error latch is being
                    // raised and the next wake draws the diagnostic.
                }
            }
        }
        ctx.profile.account_time(started.elapsed());
    }
    info!("render thread down");
    // hit_done_tx drops here; a requester mid-handshake observes the
    // closed channel and resolves to NO_TARGET.
}

fn service_hit_test<S: RenderSurface>(
    surface: &mut S,
    ctx: &RenderContext,
    handle: &RenderHandle,
    hit_done_tx: &Sender<()>,
) {
    if handle.hit_pending.swap(false, Ordering::SeqCst) {
        match hit_test_pass(surface) {
            Ok(buffer) => *handle.id_buffer.lock() = Some(buffer),
            Err(e) => (ctx.on_error)(e.to_string()),
        }
        // A full or closed channel means no one is waiting.
        let _ = hit_done_tx.try_send(());
    }
}

fn hit_test_pass<S: RenderSurface>(surface: &mut S) -> flick_core::Result<IdBuffer> {
    surface.begin_hit_test_pass()?;
    surface.end_hit_test_pass()
}
