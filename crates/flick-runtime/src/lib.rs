//! Flick Runtime - The playback coordinator
//!
//! Owns every long-lived thread of a playback session and the wiring
//! between them: the parse job feeding the frame store, the scheduler
//! pacing frame advancement and redraws, the render thread, the input
//! thread, and the error/shutdown latches they all observe. Components
//! are constructed leaves first and torn down in reverse, with the
//! parser stopped before the store's consumers.

pub mod config;
pub mod coordinator;
pub mod logging;

pub use config::PlayerConfig;
pub use coordinator::Coordinator;
