//! Time-ordered job scheduling.
//!
//! One background loop owns every periodic tick and one-shot delayed
//! job in the system. It sleeps until the nearest deadline (a condvar
//! wait that new entries interrupt) and fires due jobs in due-time
//! order, ties broken by insertion order.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error};

/// A schedulable unit of work. Implementations keep `tick` cheap; the
/// scheduler loop is shared by every job in the process.
pub trait TickJob: Send + Sync {
    fn tick(&self);
}

/// Handle identifying a scheduled job for `cancel`/`reschedule_tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u64);

struct Entry {
    id: JobId,
    due: Instant,
    period: Option<Duration>,
    seq: u64,
    job: Arc<dyn TickJob>,
}

struct State {
    entries: Vec<Entry>,
    next_id: u64,
    next_seq: u64,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

/// Owner of the scheduling loop thread.
pub struct Scheduler {
    shared: Arc<Shared>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create the scheduler and start its loop thread.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                entries: Vec::new(),
                next_id: 0,
                next_seq: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });
        let loop_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("flick-scheduler".to_string())
            .spawn(move || run_loop(&loop_shared))
            .expect("failed to spawn scheduler thread");
        Self {
            shared,
            thread: Mutex::new(Some(handle)),
        }
    }

    /// Schedule `job` to fire every `period`, starting one period from
    /// now.
    pub fn add_tick(&self, period: Duration, job: Arc<dyn TickJob>) -> JobId {
        self.insert(Instant::now() + period, Some(period), job)
    }

    /// Schedule `job` to fire once after `delay`.
    pub fn add_wait(&self, delay: Duration, job: Arc<dyn TickJob>) -> JobId {
        self.insert(Instant::now() + delay, None, job)
    }

    fn insert(&self, due: Instant, period: Option<Duration>, job: Arc<dyn TickJob>) -> JobId {
        let mut state = self.shared.state.lock();
        let id = JobId(state.next_id);
        state.next_id += 1;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.push(Entry {
            id,
            due,
            period,
            seq,
            job,
        });
        self.shared.cond.notify_all();
        id
    }

    /// Remove a job. Idempotent; returns whether the job was still
    /// scheduled.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut state = self.shared.state.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        let removed = state.entries.len() != before;
        if removed {
            self.shared.cond.notify_all();
        }
        removed
    }

    /// Shorten a periodic job's cadence. The fastest requested rate
    /// wins: a period that is not strictly shorter than the current
    /// one is ignored. Returns whether the reschedule was applied.
    pub fn reschedule_tick(&self, id: JobId, period: Duration) -> bool {
        let mut state = self.shared.state.lock();
        for entry in &mut state.entries {
            if entry.id == id {
                if let Some(current) = entry.period {
                    if period < current {
                        entry.period = Some(period);
                        entry.due = Instant::now() + period;
                        self.shared.cond.notify_all();
                        return true;
                    }
                }
                return false;
            }
        }
        false
    }

    /// Stop the loop and join it. Pending jobs never fire.
    pub fn shutdown(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            self.shared.cond.notify_all();
        }
        if let Some(handle) = self.thread.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_loop(shared: &Shared) {
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            break;
        }
        let next = state
            .entries
            .iter()
            .min_by_key(|e| (e.due, e.seq))
            .map(|e| (e.due, e.id));
        let (due, id) = match next {
            Some(pair) => pair,
            None => {
                shared.cond.wait(&mut state);
                continue;
            }
        };
        let now = Instant::now();
        if due > now {
            shared.cond.wait_until(&mut state, due);
            // Entries may have changed while sleeping; re-evaluate.
            continue;
        }
        fire(shared, &mut state, id, now);
    }
}

fn fire(shared: &Shared, state: &mut MutexGuard<'_, State>, id: JobId, now: Instant) {
    let idx = match state.entries.iter().position(|e| e.id == id) {
        Some(idx) => idx,
        None => return,
    };
    let job = Arc::clone(&state.entries[idx].job);
    match state.entries[idx].period {
        Some(period) => {
            // Fixed-rate pacing; if the loop fell behind, rebase on
            // now instead of firing a burst of catch-up ticks.
            let entry = &mut state.entries[idx];
            entry.due += period;
            if entry.due <= now {
                entry.due = now + period;
            }
        }
        None => {
            state.entries.remove(idx);
        }
    }
    let panicked = MutexGuard::unlocked(state, || {
        catch_unwind(AssertUnwindSafe(|| job.tick())).is_err()
    });
    if panicked {
        error!(?id, "tick job panicked; cancelling it");
        state.entries.retain(|e| e.id != id);
    } else {
        debug!(?id, "tick job fired");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter(AtomicUsize);

    impl TickJob for Counter {
        fn tick(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicker;

    impl TickJob for Panicker {
        fn tick(&self) {
            panic!("boom");
        }
    }

    #[test]
    fn test_periodic_tick_fires_repeatedly() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.add_tick(Duration::from_millis(5), counter.clone());
        thread::sleep(Duration::from_millis(60));
        scheduler.shutdown();
        assert!(counter.0.load(Ordering::SeqCst) >= 3);
    }

    #[test]
    fn test_one_shot_fires_once() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.add_wait(Duration::from_millis(5), counter.clone());
        thread::sleep(Duration::from_millis(50));
        scheduler.shutdown();
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let id = scheduler.add_tick(Duration::from_secs(60), counter);
        assert!(scheduler.cancel(id));
        assert!(!scheduler.cancel(id));
        scheduler.shutdown();
    }

    #[test]
    fn test_reschedule_only_shortens() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let id = scheduler.add_tick(Duration::from_secs(60), counter.clone());
        // Lengthening is refused.
        assert!(!scheduler.reschedule_tick(id, Duration::from_secs(120)));
        // Shortening applies immediately.
        assert!(scheduler.reschedule_tick(id, Duration::from_millis(5)));
        thread::sleep(Duration::from_millis(40));
        scheduler.shutdown();
        assert!(counter.0.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn test_panicking_job_is_cancelled() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        scheduler.add_tick(Duration::from_millis(5), Arc::new(Panicker));
        scheduler.add_tick(Duration::from_millis(5), counter.clone());
        thread::sleep(Duration::from_millis(60));
        scheduler.shutdown();
        // The panicking job died; the healthy one kept running.
        assert!(counter.0.load(Ordering::SeqCst) >= 3);
    }
}
