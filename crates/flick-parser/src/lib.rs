//! Flick Parser - Stream decoding
//!
//! Decodes the flick container: a self-describing header followed by a
//! flat sequence of tags. The single `ParseJob` producer drives the
//! frame store from a background thread.

pub mod header;
pub mod job;
pub mod tag;

pub use header::MovieHeader;
pub use job::{AbortHandle, ParseJob};
pub use tag::{Tag, TagReader};
