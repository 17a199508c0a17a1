//! Flick Input - Raw input to logical events
//!
//! Raw pointer and key events come in from the platform backend over a
//! channel. The dispatcher resolves pointer positions to interactive
//! targets through the render thread's hit-test handshake, correlates
//! down/up pairs into clicks, and posts logical events to an external
//! sink it knows nothing about.

pub mod dispatcher;
pub mod events;
pub mod thread;

pub use dispatcher::{HitTester, InputDispatcher, InteractiveTarget, TargetId};
pub use events::{EventKind, EventSink, RawInput};
pub use thread::InputThread;
