//! Cross-crate pacing tests: the frame store's event channel driving
//! a scheduler tick directly, with no coordinator in between.

use crossbeam_channel::unbounded;
use flick_core::{FrameRate, Rect};
use flick_player::{FrameStore, PlaybackState, Scheduler, StoreEvent, TickJob};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// ── Helpers ────────────────────────────────────────────────────

struct AdvanceJob {
    store: Arc<FrameStore>,
    playback: Arc<PlaybackState>,
}

impl TickJob for AdvanceJob {
    fn tick(&self) {
        self.playback
            .advance(self.store.frames_loaded(), self.store.total_frames());
    }
}

fn two_frame_store(events: crossbeam_channel::Sender<StoreEvent>) -> Arc<FrameStore> {
    let store = Arc::new(FrameStore::new(Some(events)));
    store.set_canvas(Rect::new(0.0, 0.0, 64.0, 64.0));
    store.reserve(2).unwrap();
    store
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

// ── Store events driving the tick ──────────────────────────────

#[test]
fn store_events_pace_the_frame_advance() {
    let (tx, rx) = unbounded();
    let store = two_frame_store(tx);

    store.set_frame_rate(FrameRate::FPS_60);
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
        StoreEvent::RateKnown(FrameRate::FPS_60)
    );

    store.commit(true).unwrap();
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(1)).unwrap(),
        StoreEvent::FirstFrame
    );
    store.commit(false).unwrap();

    // Start the advance tick only once the rate event arrived, the way
    // the coordinator's wiring does.
    let playback = Arc::new(PlaybackState::new());
    let scheduler = Scheduler::new();
    scheduler.add_tick(
        FrameRate::FPS_60.frame_duration(),
        Arc::new(AdvanceJob {
            store: store.clone(),
            playback: playback.clone(),
        }),
    );

    let mut seen = [false; 2];
    assert!(wait_until(Duration::from_secs(3), || {
        seen[playback.current_frame().min(1)] = true;
        seen[0] && seen[1]
    }));
    scheduler.shutdown();
}

#[test]
fn cancelling_the_tick_freezes_the_cursor() {
    let (tx, _rx) = unbounded();
    let store = two_frame_store(tx);
    store.commit(true).unwrap();
    store.commit(false).unwrap();

    let playback = Arc::new(PlaybackState::new());
    let scheduler = Scheduler::new();
    let id = scheduler.add_tick(
        Duration::from_millis(5),
        Arc::new(AdvanceJob {
            store: store.clone(),
            playback: playback.clone(),
        }),
    );

    assert!(wait_until(Duration::from_secs(3), || {
        playback.current_frame() == 1
    }));
    scheduler.cancel(id);
    thread::sleep(Duration::from_millis(50)); // let an in-flight tick drain
    let held = playback.current_frame();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(playback.current_frame(), held);
    scheduler.shutdown();
}
