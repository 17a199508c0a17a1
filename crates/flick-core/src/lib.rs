//! Flick Core - Foundation types for animation playback
//!
//! This crate provides the fundamental types used throughout Flick:
//! - Frame records and their display/control operations
//! - Frame rate representation (including the container's 8.8 fixed point)
//! - Geometric primitives for the canvas and hit-testing
//! - The shared error taxonomy

pub mod error;
pub mod frame;
pub mod geometry;
pub mod time;

pub use error::{FlickError, Result};
pub use frame::{ControlOp, DictionaryEntry, DisplayListOp, Frame, FrameOp, Rgb, SharedFrame};
pub use geometry::{Rect, Vec2};
pub use time::FrameRate;
