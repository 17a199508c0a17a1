//! The render surface contract.
//!
//! The playback core needs exactly three capabilities from a graphics
//! backend: present a committed frame, render an offscreen hit-test
//! pass and read back its identifier buffer, and present a diagnostic
//! view when the stream failed. Everything else (shaders, swapchains,
//! windowing) stays behind the implementation.

use flick_core::{Frame, Result, Rgb};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Readback of the offscreen identifier pass. Each pixel holds the
/// normalized hit identifier of the topmost interactive target drawn
/// there, or 0.0 where nothing interactive was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct IdBuffer {
    width: u32,
    height: u32,
    ids: Vec<f32>,
}

impl IdBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ids: vec![0.0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Write an identifier at a pixel. Out-of-bounds writes are
    /// dropped.
    pub fn set(&mut self, x: u32, y: u32, id: f32) {
        if x < self.width && y < self.height {
            self.ids[(y * self.width + x) as usize] = id;
        }
    }

    /// Sample the identifier at a pixel. Out-of-bounds reads return
    /// 0.0, the "no target" value.
    pub fn id_at(&self, x: u32, y: u32) -> f32 {
        if x < self.width && y < self.height {
            self.ids[(y * self.width + x) as usize]
        } else {
            0.0
        }
    }
}

/// Abstract drawing backend driven by the render thread.
pub trait RenderSurface: Send {
    /// Draw a committed frame over the stage background and present
    /// it.
    fn present_frame(&mut self, frame: &Frame, background: Rgb) -> Result<()>;

    /// Start the offscreen identifier pass. The surface re-renders the
    /// most recently presented content with hit identifiers in place
    /// of colors.
    fn begin_hit_test_pass(&mut self) -> Result<()>;

    /// Finish the identifier pass and read it back.
    fn end_hit_test_pass(&mut self) -> Result<IdBuffer>;

    /// Present the degraded "unsupported content" view with the error
    /// cause.
    fn present_diagnostic(&mut self, message: &str) -> Result<()>;
}

/// Observable state of a [`TestSurface`], shared with the test that
/// created it after the surface moved into the render thread.
#[derive(Default)]
pub struct TestSurfaceState {
    frames_presented: AtomicUsize,
    hit_test_passes: AtomicUsize,
    diagnostics: Mutex<Vec<String>>,
    last_background: Mutex<Rgb>,
}

impl TestSurfaceState {
    pub fn frames_presented(&self) -> usize {
        self.frames_presented.load(Ordering::SeqCst)
    }

    pub fn hit_test_passes(&self) -> usize {
        self.hit_test_passes.load(Ordering::SeqCst)
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().clone()
    }

    pub fn last_background(&self) -> Rgb {
        *self.last_background.lock()
    }
}

/// Headless surface double for tests and probing runs. Presents are
/// counted rather than drawn; the hit-test pass returns a buffer the
/// test programs up front.
pub struct TestSurface {
    state: Arc<TestSurfaceState>,
    hit_ids: IdBuffer,
    present_delay: Duration,
}

impl TestSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Arc::new(TestSurfaceState::default()),
            hit_ids: IdBuffer::new(width, height),
            present_delay: Duration::ZERO,
        }
    }

    /// Shared view of the surface's counters.
    pub fn state(&self) -> Arc<TestSurfaceState> {
        Arc::clone(&self.state)
    }

    /// Program the identifier returned by the next hit-test passes.
    pub fn set_hit_id(&mut self, x: u32, y: u32, id: f32) {
        self.hit_ids.set(x, y, id);
    }

    /// Make every present take this long, to exercise wake coalescing.
    pub fn with_present_delay(mut self, delay: Duration) -> Self {
        self.present_delay = delay;
        self
    }
}

impl RenderSurface for TestSurface {
    fn present_frame(&mut self, _frame: &Frame, background: Rgb) -> Result<()> {
        if !self.present_delay.is_zero() {
            std::thread::sleep(self.present_delay);
        }
        *self.state.last_background.lock() = background;
        self.state.frames_presented.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn begin_hit_test_pass(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_hit_test_pass(&mut self) -> Result<IdBuffer> {
        self.state.hit_test_passes.fetch_add(1, Ordering::SeqCst);
        Ok(self.hit_ids.clone())
    }

    fn present_diagnostic(&mut self, message: &str) -> Result<()> {
        self.state.diagnostics.lock().push(message.to_string());
        Ok(())
    }
}
