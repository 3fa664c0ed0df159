//! Backend implementations for the render module
//!
//! The recording backend is headless: it validates handles, keeps uniform
//! state per program and records every command, which is what tests and the
//! viewer drive frames against.

/// Headless command-recording backend
pub mod recording;

pub use recording::{DrawRecord, RecordedCommand, RecordingBackend};
