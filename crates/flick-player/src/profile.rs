//! Per-subsystem timing profiles.
//!
//! Each long-lived thread can account elapsed work time into its own
//! profile. Samples are keyed by a tick index advanced once per movie
//! tick and pruned once older than a fixed retention window, so the
//! ring tracks a sliding timeline. Each profile has its own lock so
//! subsystems record timings independently.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// One timeline slot: accumulated elapsed time for a tick index, with
/// an optional label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSample {
    pub tick_index: u32,
    pub elapsed: Duration,
    pub tag: Option<String>,
}

struct ProfileData {
    samples: VecDeque<ProfileSample>,
    tick_count: u32,
}

/// A per-subsystem timing ring.
pub struct ThreadProfile {
    name: String,
    retention: u32,
    data: Mutex<ProfileData>,
}

impl ThreadProfile {
    /// Create a profile retaining `retention` ticks of samples.
    pub fn new(name: impl Into<String>, retention: u32) -> Self {
        Self {
            name: name.into(),
            retention,
            data: Mutex::new(ProfileData {
                samples: VecDeque::new(),
                tick_count: 0,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Label the newest slot, creating an empty one if none exists.
    pub fn set_tag(&self, tag: impl Into<String>) {
        let mut data = self.data.lock();
        let tick_index = data.tick_count;
        if data.samples.is_empty() {
            data.samples.push_back(ProfileSample {
                tick_index,
                elapsed: Duration::ZERO,
                tag: Some(tag.into()),
            });
        } else if let Some(back) = data.samples.back_mut() {
            back.tag = Some(tag.into());
        }
    }

    /// Account elapsed work time against the current tick index.
    /// Multiple accounts within one tick accumulate into one slot.
    pub fn account_time(&self, elapsed: Duration) {
        let mut data = self.data.lock();
        let tick_index = data.tick_count;
        match data.samples.back_mut() {
            Some(back) if back.tick_index == tick_index => back.elapsed += elapsed,
            _ => data.samples.push_back(ProfileSample {
                tick_index,
                elapsed,
                tag: None,
            }),
        }
    }

    /// Advance the timeline and prune the front sample once the second
    /// one is already older than the retention window. A tag on the
    /// evicted sample migrates forward one slot rather than vanishing.
    pub fn tick(&self) {
        let mut data = self.data.lock();
        data.tick_count += 1;
        if data.samples.len() > 2
            && data.tick_count.wrapping_sub(data.samples[1].tick_index) > self.retention
        {
            if data.samples[0].tag.is_some() && data.samples[1].tag.is_none() {
                let tag = data.samples[0].tag.take();
                data.samples[1].tag = tag;
            }
            data.samples.pop_front();
        }
    }

    /// Snapshot of the current timeline, oldest first.
    pub fn samples(&self) -> Vec<ProfileSample> {
        self.data.lock().samples.iter().cloned().collect()
    }
}
