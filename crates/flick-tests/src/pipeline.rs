//! Integration tests for the playback pipeline.
//!
//! Exercises the full parse → store → schedule → render path through
//! the coordinator, against the headless test surface.

use flick_core::{FrameOp, FrameRate};
use flick_input::{EventKind, EventSink, TargetId};
use flick_parser::tag::encode;
use flick_render::{TestSurface, TestSurfaceState};
use flick_runtime::{Coordinator, PlayerConfig};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

struct NullSink;

impl EventSink for NullSink {
    fn post(&self, _target: TargetId, _kind: EventKind) {}
}

fn two_frame_stream() -> Vec<u8> {
    let mut bytes = Vec::new();
    encode::header(&mut bytes, 24 * 256, 2, 640, 480);
    encode::display_list(&mut bytes, 1, b"A");
    encode::show_frame(&mut bytes);
    encode::display_list(&mut bytes, 1, b"B");
    encode::end(&mut bytes);
    bytes
}

fn session(surface: TestSurface) -> (Arc<Coordinator>, Arc<TestSurfaceState>) {
    let state = surface.state();
    let coordinator = Coordinator::new(PlayerConfig::default(), surface, Arc::new(NullSink));
    (coordinator, state)
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

// ── End-to-end playback ────────────────────────────────────────

#[test]
fn two_frame_stream_plays_to_the_end() {
    let (coordinator, state) = session(TestSurface::new(64, 64));
    coordinator.play(Cursor::new(two_frame_stream()));

    assert!(wait_until(Duration::from_secs(3), || {
        state.frames_presented() >= 2
    }));

    let store = coordinator.store();
    assert_eq!(store.frames_loaded(), 2);
    assert!(store.is_closed());
    assert_eq!(
        store.try_frame_rate(),
        Some(FrameRate::from_fixed_8_8(24 * 256))
    );

    let frame_a = store.wait_for_frame(0).unwrap();
    let frame_b = store.wait_for_frame(1).unwrap();
    match (&frame_a.ops[0], &frame_b.ops[0]) {
        (FrameOp::Display(a), FrameOp::Display(b)) => {
            assert_eq!(a.data, b"A");
            assert_eq!(b.data, b"B");
        }
        other => panic!("unexpected ops: {:?}", other),
    }

    assert!(!coordinator.is_error());
    coordinator.join();
}

#[test]
fn fully_loaded_movie_loops() {
    let (coordinator, _state) = session(TestSurface::new(64, 64));
    coordinator.play(Cursor::new(two_frame_stream()));

    let playback = coordinator.playback();
    // At 24 fps both frames come around repeatedly; the cursor must
    // visit both positions.
    let mut seen = [false; 2];
    assert!(wait_until(Duration::from_secs(3), || {
        seen[playback.current_frame().min(1)] = true;
        seen[0] && seen[1]
    }));
    coordinator.join();
}

#[test]
fn stop_flag_freezes_the_cursor() {
    let (coordinator, _state) = session(TestSurface::new(64, 64));
    coordinator.play(Cursor::new(two_frame_stream()));
    let playback = coordinator.playback();

    assert!(wait_until(Duration::from_secs(3), || {
        coordinator.store().frames_loaded() == 2
    }));
    playback.stop();
    let held = playback.current_frame();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(playback.current_frame(), held);

    playback.resume();
    assert!(wait_until(Duration::from_secs(3), || {
        playback.current_frame() != held
    }));
    coordinator.join();
}

// ── Failure handling ───────────────────────────────────────────

#[test]
fn foreign_container_raises_the_error_latch() {
    let (coordinator, state) = session(TestSurface::new(64, 64));
    coordinator.play(Cursor::new(b"GIF89a definitely not ours".to_vec()));

    assert!(wait_until(Duration::from_secs(3), || {
        !state.diagnostics().is_empty()
    }));
    assert!(coordinator.is_error());
    assert!(coordinator.store().is_failed());
    // No frame was ever presented, only the diagnostic view.
    assert_eq!(state.frames_presented(), 0);
    coordinator.join();
}

#[test]
fn overlong_stream_fails_with_the_declared_count() {
    let mut bytes = Vec::new();
    encode::header(&mut bytes, 24 * 256, 1, 640, 480);
    encode::display_list(&mut bytes, 1, b"A");
    encode::show_frame(&mut bytes);
    encode::display_list(&mut bytes, 1, b"B");
    encode::show_frame(&mut bytes); // one more than declared
    encode::end(&mut bytes);

    let (coordinator, _state) = session(TestSurface::new(64, 64));
    coordinator.play(Cursor::new(bytes));
    assert!(wait_until(Duration::from_secs(3), || coordinator.is_error()));
    let cause = coordinator.error_cause().unwrap_or_default();
    assert!(cause.contains("declared"), "cause was: {cause}");
    coordinator.join();
}

// ── Coalescing ─────────────────────────────────────────────────

#[test]
fn redraw_burst_collapses_into_one_extra_draw() {
    let surface = TestSurface::new(64, 64).with_present_delay(Duration::from_millis(100));
    let state = surface.state();
    // No periodic render tick: the only draws are the ones requested
    // here. Achieved by never starting playback.
    let coordinator = Coordinator::new(PlayerConfig::default(), surface, Arc::new(NullSink));
    let store = coordinator.store();
    store.set_canvas(flick_core::Rect::new(0.0, 0.0, 64.0, 64.0));
    store.reserve(1).unwrap();
    store.commit(false).unwrap();

    let handle = coordinator.render_handle().unwrap();
    handle.request_draw();
    thread::sleep(Duration::from_millis(30)); // draw now in flight
    for _ in 0..16 {
        handle.request_draw();
    }
    assert!(wait_until(Duration::from_secs(2), || {
        state.frames_presented() >= 2
    }));
    thread::sleep(Duration::from_millis(300));
    assert_eq!(state.frames_presented(), 2);
    coordinator.join();
}
