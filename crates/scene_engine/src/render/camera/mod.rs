//! Camera system
//!
//! [`Camera`] describes an observer, [`CameraContext`] is the matrices and
//! viewport it produces for one frame, and [`CameraStack`] holds the active
//! contexts during scene traversal.

#[allow(clippy::module_inception)]
mod camera;
mod context;
mod stack;

pub use camera::{Camera, ProjectionKind, ViewType};
pub use context::{CameraContext, Viewport};
pub use stack::{CameraScope, CameraStack};
