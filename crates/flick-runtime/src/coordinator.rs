//! The playback coordinator.
//!
//! Wires one parse job, one render thread, one input thread and the
//! shared scheduler into a playback session. Rate discovery arrives
//! over the store's event channel mid-parse: the render tick starts
//! when the header's rate is known and the frame-advance tick when the
//! first frame is committed. The coordinator owns the error and
//! shutdown latches and is the only component that tears threads down.

use crate::config::PlayerConfig;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use flick_core::FrameRate;
use flick_input::{EventSink, InputDispatcher, InputThread, RawInput};
use flick_parser::{AbortHandle, ParseJob};
use flick_player::{
    FrameStore, JobId, Lifecycle, PlaybackState, Scheduler, StoreEvent, ThreadProfile, TickJob,
};
use flick_render::{RenderContext, RenderHandle, RenderSurface, RenderThread};
use parking_lot::Mutex;
use std::io::Read;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

#[derive(Default)]
struct Ticks {
    frame_advance: Option<JobId>,
    render: Option<JobId>,
}

/// State reachable from failure handlers and tick jobs.
struct Shared {
    lifecycle: Arc<Lifecycle>,
    scheduler: Arc<Scheduler>,
    store: Arc<FrameStore>,
    playback: Arc<PlaybackState>,
    profiles: Mutex<Vec<Arc<ThreadProfile>>>,
    ticks: Mutex<Ticks>,
    render_handle: Mutex<Option<Arc<RenderHandle>>>,
    init_hook: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Shared {
    /// First cause wins. Stops frame advancement and forces one final
    /// redraw so the diagnostic view appears even if no tick ever
    /// fires again.
    fn report_error(&self, cause: &str) {
        if !self.lifecycle.set_error(cause) {
            return;
        }
        error!(cause, "playback failed");
        if let Some(id) = self.ticks.lock().frame_advance.take() {
            self.scheduler.cancel(id);
        }
        if let Some(handle) = self.render_handle.lock().as_ref() {
            handle.request_draw();
        }
    }
}

/// Periodic redraw at the movie's render rate.
struct RenderTickJob {
    handle: Arc<RenderHandle>,
}

impl TickJob for RenderTickJob {
    fn tick(&self) {
        self.handle.request_draw();
    }
}

/// Advances the playback cursor and the profiler timelines once per
/// movie tick.
struct FrameAdvanceJob {
    shared: Arc<Shared>,
}

impl TickJob for FrameAdvanceJob {
    fn tick(&self) {
        self.shared
            .playback
            .advance(self.shared.store.frames_loaded(), self.shared.store.total_frames());
        for profile in self.shared.profiles.lock().iter() {
            profile.tick();
        }
    }
}

/// Lifecycle owner of a playback session.
pub struct Coordinator {
    config: PlayerConfig,
    shared: Arc<Shared>,
    dispatcher: Arc<InputDispatcher>,
    render: Mutex<Option<RenderThread>>,
    input: Mutex<Option<InputThread>>,
    raw_input_tx: Mutex<Option<Sender<RawInput>>>,
    parser: Mutex<Option<thread::JoinHandle<()>>>,
    parse_abort: Mutex<Option<AbortHandle>>,
    wiring: Mutex<Option<thread::JoinHandle<()>>>,
    wiring_quit: Mutex<Option<Sender<()>>>,
}

impl Coordinator {
    /// Build a session: latches and scheduler first, then the render
    /// and input threads over the given surface and event sink.
    pub fn new<S: RenderSurface + 'static>(
        config: PlayerConfig,
        surface: S,
        sink: Arc<dyn EventSink>,
    ) -> Arc<Self> {
        let lifecycle = Arc::new(Lifecycle::new());
        let scheduler = Arc::new(Scheduler::new());
        let (events_tx, events_rx) = unbounded();
        let store = Arc::new(FrameStore::new(Some(events_tx)));
        let playback = Arc::new(PlaybackState::new());
        if config.start_stopped {
            playback.stop();
        }

        let shared = Arc::new(Shared {
            lifecycle: Arc::clone(&lifecycle),
            scheduler,
            store: Arc::clone(&store),
            playback: Arc::clone(&playback),
            profiles: Mutex::new(Vec::new()),
            ticks: Mutex::new(Ticks::default()),
            render_handle: Mutex::new(None),
            init_hook: Mutex::new(None),
        });

        let render_profile = Arc::new(ThreadProfile::new(
            "render",
            config.profile_retention_ticks,
        ));
        render_profile.set_tag("Render");
        shared.profiles.lock().push(Arc::clone(&render_profile));

        let on_error = {
            let shared = Arc::clone(&shared);
            Arc::new(move |cause: String| shared.report_error(&cause))
        };
        let render = RenderThread::spawn(
            surface,
            RenderContext {
                store: Arc::clone(&store),
                playback,
                lifecycle: Arc::clone(&lifecycle),
                profile: render_profile,
                on_error,
            },
        );
        let render_handle = render.handle();
        *shared.render_handle.lock() = Some(Arc::clone(&render_handle));

        let dispatcher = Arc::new(InputDispatcher::new(render_handle, sink));
        let (raw_input_tx, raw_input_rx) = unbounded();
        let input = InputThread::spawn(Arc::clone(&dispatcher), raw_input_rx, lifecycle);

        let (wiring_quit_tx, wiring_quit_rx) = unbounded();
        let wiring = {
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("flick-wiring".to_string())
                .spawn(move || wiring_loop(&shared, &events_rx, &wiring_quit_rx))
                .ok()
        };
        if wiring.is_none() {
            error!("failed to spawn wiring thread");
        }

        Arc::new(Self {
            config,
            shared,
            dispatcher,
            render: Mutex::new(Some(render)),
            input: Mutex::new(Some(input)),
            raw_input_tx: Mutex::new(Some(raw_input_tx)),
            parser: Mutex::new(None),
            parse_abort: Mutex::new(None),
            wiring: Mutex::new(wiring),
            wiring_quit: Mutex::new(Some(wiring_quit_tx)),
        })
    }

    /// Start decoding a stream on the parse thread. Decode failures
    /// mark the store failed and trip the error latch.
    pub fn play<R: Read + Send + 'static>(&self, reader: R) {
        let job = ParseJob::new(reader, Arc::clone(&self.shared.store));
        *self.parse_abort.lock() = Some(job.abort_handle());
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("flick-parse".to_string())
            .spawn(move || {
                let lifecycle = Arc::clone(&shared.lifecycle);
                if let Err(e) = job.run(&lifecycle) {
                    let cause = e.to_string();
                    shared.store.mark_failed(cause.clone());
                    shared.report_error(&cause);
                }
            })
            .ok();
        if handle.is_none() {
            error!("failed to spawn parse thread");
        }
        *self.parser.lock() = handle;
    }

    /// Cooperatively cancel an in-flight parse. Funnels through the
    /// same failed path as a decode error.
    pub fn abort_parse(&self) {
        if let Some(abort) = self.parse_abort.lock().as_ref() {
            abort.abort();
        }
    }

    /// Record a terminal playback error. Only the first cause is kept.
    pub fn report_error(&self, cause: &str) {
        self.shared.report_error(cause);
    }

    /// Request a faster render cadence. The fastest requested rate
    /// wins; slower requests are ignored.
    pub fn set_render_rate(&self, rate: FrameRate) {
        apply_render_rate(&self.shared, rate);
    }

    /// Raise the shutdown latch, wake every blocked waiter and close
    /// the raw input channel. Idempotent and safe from any thread,
    /// including failure handlers.
    pub fn request_shutdown(&self) {
        self.shared.lifecycle.request_shutdown();
        self.shared.store.notify_shutdown();
        if let Some(handle) = self.shared.render_handle.lock().as_ref() {
            handle.request_draw();
        }
        // Closing these channels lets the input and wiring loops see
        // the disconnect and exit.
        self.raw_input_tx.lock().take();
        self.wiring_quit.lock().take();
    }

    /// Block until shutdown has been requested.
    pub fn wait(&self) {
        self.shared.lifecycle.wait_terminated();
    }

    /// Shut down and join every thread. The producer goes first so it
    /// never writes into a store whose consumers are gone.
    pub fn join(&self) {
        self.request_shutdown();
        if let Some(parser) = self.parser.lock().take() {
            if parser.join().is_err() {
                error!("parse thread panicked");
            }
        }
        if let Some(mut render) = self.render.lock().take() {
            render.join();
        }
        if let Some(mut input) = self.input.lock().take() {
            input.join();
        }
        if let Some(wiring) = self.wiring.lock().take() {
            let _ = wiring.join();
        }
        self.shared.scheduler.shutdown();
        info!("playback session torn down");
    }

    /// Register a timing profile that ticks with the movie.
    pub fn allocate_profiler(&self, name: impl Into<String>) -> Arc<ThreadProfile> {
        let profile = Arc::new(ThreadProfile::new(
            name,
            self.config.profile_retention_ticks,
        ));
        self.shared.profiles.lock().push(Arc::clone(&profile));
        profile
    }

    /// Run `hook` once, when the first frame has been committed.
    pub fn set_init_hook(&self, hook: impl FnOnce() + Send + 'static) {
        *self.shared.init_hook.lock() = Some(Box::new(hook));
    }

    /// Sender for raw platform input; `None` once shutdown closed it.
    pub fn raw_input_sender(&self) -> Option<Sender<RawInput>> {
        self.raw_input_tx.lock().clone()
    }

    pub fn dispatcher(&self) -> Arc<InputDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn store(&self) -> Arc<FrameStore> {
        Arc::clone(&self.shared.store)
    }

    pub fn playback(&self) -> Arc<PlaybackState> {
        Arc::clone(&self.shared.playback)
    }

    pub fn render_handle(&self) -> Option<Arc<RenderHandle>> {
        self.shared.render_handle.lock().clone()
    }

    pub fn is_error(&self) -> bool {
        self.shared.lifecycle.is_error()
    }

    pub fn error_cause(&self) -> Option<String> {
        self.shared.lifecycle.error_cause()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.lifecycle.is_shutting_down()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.join();
    }
}

fn wiring_loop(shared: &Arc<Shared>, events: &Receiver<StoreEvent>, quit: &Receiver<()>) {
    info!("wiring thread up");
    loop {
        select! {
            recv(events) -> event => match event {
                Ok(StoreEvent::RateKnown(rate)) => apply_render_rate(shared, rate),
                Ok(StoreEvent::FirstFrame) => on_first_frame(shared),
                Err(_) => break,
            },
            recv(quit) -> _ => break,
        }
    }
    info!("wiring thread down");
}

fn apply_render_rate(shared: &Shared, rate: FrameRate) {
    if rate.is_zero() {
        warn!(%rate, "ignoring zero render rate");
        return;
    }
    let period = rate.frame_duration();
    let mut ticks = shared.ticks.lock();
    match ticks.render {
        Some(id) => {
            if shared.scheduler.reschedule_tick(id, period) {
                info!(%rate, "render tick rescheduled");
            }
        }
        None => {
            let handle = shared.render_handle.lock().clone();
            if let Some(handle) = handle {
                let job = Arc::new(RenderTickJob { handle });
                ticks.render = Some(shared.scheduler.add_tick(period, job));
                info!(%rate, "render tick started");
            }
        }
    }
}

fn on_first_frame(shared: &Arc<Shared>) {
    {
        let mut ticks = shared.ticks.lock();
        if ticks.frame_advance.is_none() {
            if let Some(rate) = shared.store.try_frame_rate() {
                if !rate.is_zero() {
                    let job = Arc::new(FrameAdvanceJob {
                        shared: Arc::clone(shared),
                    });
                    ticks.frame_advance =
                        Some(shared.scheduler.add_tick(rate.frame_duration(), job));
                    info!(%rate, "frame advance started");
                }
            }
        }
    }
    if let Some(hook) = shared.init_hook.lock().take() {
        hook();
    }
}
