//! Integration test crate for Flick.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on multiple flick crates to verify they work together.

#[cfg(test)]
mod input;

#[cfg(test)]
mod pacing;

#[cfg(test)]
mod pipeline;
