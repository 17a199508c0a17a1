//! Flick Render - Frame presentation
//!
//! The render thread is the single consumer of the frame store. It
//! wakes on redraw requests, collapses redundant wake-ups into one
//! draw, and services synchronous hit-test requests from other threads
//! through a strict request/response handshake. Actual drawing goes
//! through the `RenderSurface` contract; no graphics API leaks in.

pub mod surface;
pub mod thread;

pub use surface::{IdBuffer, RenderSurface, TestSurface, TestSurfaceState};
pub use thread::{RenderContext, RenderHandle, RenderThread, NO_TARGET};
