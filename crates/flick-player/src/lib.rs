//! Flick Player - Concurrency core for frame playback
//!
//! This crate holds the shared state the playback threads coordinate
//! through:
//! - `FrameStore`: append-only committed frames with a published
//!   "frames loaded" watermark
//! - `Scheduler`: periodic ticks and one-shot delayed jobs
//! - `PlaybackState`: the frame cursor advanced by the movie tick
//! - `Lifecycle`: the process-wide error and shutdown latches
//! - `OnceValue`: blocking single-assignment watermarks
//! - `ThreadProfile`: per-subsystem timing rings

pub mod lifecycle;
pub mod playback;
pub mod profile;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use lifecycle::Lifecycle;
pub use playback::PlaybackState;
pub use profile::{ProfileSample, ThreadProfile};
pub use scheduler::{JobId, Scheduler, TickJob};
pub use store::{FrameStore, StoreEvent};
pub use sync::OnceValue;
