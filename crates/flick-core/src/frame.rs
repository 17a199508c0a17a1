//! Frame records: the atomic units of playable content.
//!
//! A frame is an ordered list of operations collected by the parser and
//! frozen at commit time. The payload bytes stay opaque at this layer;
//! interpreting them is the render surface's business.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// A display-list mutation: placement, removal or update of an object
/// on the stage at a given depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayListOp {
    /// Stage depth the operation applies to.
    pub depth: u16,
    /// Opaque operation payload.
    pub data: Vec<u8>,
}

/// A control operation affecting playback state rather than the display
/// list (e.g. background color, script triggers).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlOp {
    /// Opaque operation payload.
    pub data: Vec<u8>,
}

/// One operation recorded into a frame, in stream order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOp {
    Display(DisplayListOp),
    Control(ControlOp),
}

/// A dictionary resource: defined once, referenced by display-list ops.
/// Has no frame effect of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Resource identifier, unique within a stream.
    pub id: u16,
    /// Opaque resource payload.
    pub data: Vec<u8>,
}

/// An RGB color, used for the stage background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };
}

/// One discrete unit of playable content.
///
/// Frames are assembled op by op while in progress and are immutable
/// once committed to the store. Most frames carry only a handful of
/// operations, hence the inline small-vector storage.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Operations in stream order.
    pub ops: SmallVec<[FrameOp; 8]>,
    /// Optional label naming this frame for seeks.
    pub label: Option<String>,
}

impl Frame {
    /// Create an empty in-progress frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation to the frame.
    pub fn push(&mut self, op: FrameOp) {
        self.ops.push(op);
    }

    /// Whether the frame has received any content. Labels do not count
    /// as content for the trailing-empty-frame check, but the parser
    /// treats a labelled frame as non-empty anyway.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Arc-wrapped committed frame for shared ownership across threads.
pub type SharedFrame = Arc<Frame>;
