//! Raw input and logical event types.

use crate::dispatcher::TargetId;

/// One event as delivered by the platform backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    PointerDown { x: u32, y: u32 },
    PointerUp { x: u32, y: u32 },
    KeyDown { code: u32 },
}

/// Logical event posted for an interactive target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    MouseDown,
    MouseUp,
    Click,
}

/// Destination for logical events. The dispatcher only needs `post`;
/// queueing, bubbling and delivery order are the sink's business.
pub trait EventSink: Send + Sync {
    fn post(&self, target: TargetId, kind: EventKind);
}
