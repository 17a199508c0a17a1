//! Integration tests for input dispatch over the live render thread.
//!
//! Raw pointer events travel the real path: input thread → dispatcher
//! → render hit-test handshake → event sink.

use flick_input::{EventKind, EventSink, InteractiveTarget, RawInput, TargetId};
use flick_parser::tag::encode;
use flick_render::{TestSurface, NO_TARGET};
use flick_runtime::{Coordinator, PlayerConfig};
use parking_lot::Mutex;
use std::io::Cursor;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<(TargetId, EventKind)>>,
}

impl CollectingSink {
    fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|(_, k)| *k).collect()
    }
}

impl EventSink for CollectingSink {
    fn post(&self, target: TargetId, kind: EventKind) {
        self.events.lock().push((target, kind));
    }
}

struct Button {
    hit_id_bits: AtomicU32,
}

impl Button {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            hit_id_bits: AtomicU32::new(0),
        })
    }

    fn hit_id(&self) -> f32 {
        f32::from_bits(self.hit_id_bits.load(Ordering::SeqCst))
    }
}

impl InteractiveTarget for Button {
    fn set_hit_id(&self, id: f32) {
        self.hit_id_bits.store(id.to_bits(), Ordering::SeqCst);
    }
}

fn one_frame_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    encode::header(&mut bytes, 24 * 256, 1, 64, 64);
    encode::display_list(&mut bytes, 1, b"A");
    encode::end(&mut bytes);
    bytes
}

fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

// ── Pointer events through the live pipeline ───────────────────

#[test]
fn click_reaches_the_target_under_the_pointer() {
    let mut surface = TestSurface::new(64, 64);
    // Two listeners partition (0,1] as {0.5, 1.0}; the pixel at
    // (10, 20) is painted with the second target's id.
    surface.set_hit_id(10, 20, 1.0);
    let sink = Arc::new(CollectingSink::default());
    let coordinator = Coordinator::new(PlayerConfig::default(), surface, sink.clone());
    coordinator.play(Cursor::new(one_frame_stream()));

    let first = Button::new();
    let second = Button::new();
    coordinator.dispatcher().register(first.clone());
    let second_id = coordinator.dispatcher().register(second.clone());
    assert_eq!(first.hit_id(), 0.5);
    assert_eq!(second.hit_id(), 1.0);

    let raw = coordinator.raw_input_sender().unwrap();
    raw.send(RawInput::PointerDown { x: 10, y: 20 }).unwrap();
    raw.send(RawInput::PointerUp { x: 10, y: 20 }).unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        sink.events.lock().len() == 3
    }));
    let events = sink.events.lock().clone();
    assert_eq!(
        events,
        vec![
            (second_id, EventKind::MouseDown),
            (second_id, EventKind::MouseUp),
            (second_id, EventKind::Click),
        ]
    );
    coordinator.join();
}

#[test]
fn pointer_over_empty_canvas_posts_nothing() {
    let surface = TestSurface::new(64, 64); // no ids painted anywhere
    let sink = Arc::new(CollectingSink::default());
    let coordinator = Coordinator::new(PlayerConfig::default(), surface, sink.clone());
    coordinator.play(Cursor::new(one_frame_stream()));
    coordinator.dispatcher().register(Button::new());

    let raw = coordinator.raw_input_sender().unwrap();
    raw.send(RawInput::PointerDown { x: 1, y: 1 }).unwrap();
    raw.send(RawInput::PointerUp { x: 1, y: 1 }).unwrap();

    thread::sleep(Duration::from_millis(200));
    assert!(sink.kinds().is_empty());
    coordinator.join();
}

#[test]
fn up_on_a_different_target_posts_no_click() {
    let mut surface = TestSurface::new(64, 64);
    surface.set_hit_id(0, 0, 0.5); // first target
    surface.set_hit_id(9, 9, 1.0); // second target
    let sink = Arc::new(CollectingSink::default());
    let coordinator = Coordinator::new(PlayerConfig::default(), surface, sink.clone());
    coordinator.play(Cursor::new(one_frame_stream()));
    coordinator.dispatcher().register(Button::new());
    coordinator.dispatcher().register(Button::new());

    let raw = coordinator.raw_input_sender().unwrap();
    raw.send(RawInput::PointerDown { x: 0, y: 0 }).unwrap();
    raw.send(RawInput::PointerUp { x: 9, y: 9 }).unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        sink.events.lock().len() == 2
    }));
    assert_eq!(sink.kinds(), vec![EventKind::MouseDown, EventKind::MouseUp]);
    coordinator.join();
}

// ── Shutdown races ─────────────────────────────────────────────

#[test]
fn hit_test_after_shutdown_returns_no_target() {
    let mut surface = TestSurface::new(64, 64);
    surface.set_hit_id(1, 1, 1.0);
    let coordinator = Coordinator::new(
        PlayerConfig::default(),
        surface,
        Arc::new(CollectingSink::default()),
    );
    coordinator.play(Cursor::new(one_frame_stream()));
    coordinator.dispatcher().register(Button::new());

    let handle = coordinator.render_handle().unwrap();
    assert_eq!(handle.request_hit_test(1, 1), 1.0);

    coordinator.join();
    assert_eq!(handle.request_hit_test(1, 1), NO_TARGET);
}
