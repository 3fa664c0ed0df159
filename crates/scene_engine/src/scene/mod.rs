//! Scene graph system
//!
//! A tree of nodes traversed depth-first each frame. Every node carries a
//! local transform and a [`NodeBehavior`] that draws through render units;
//! the [`SceneRenderer`] runs the two-phase hooks against a camera stack.
//!
//! ## Architecture
//!
//! ```text
//! FrameDriver (push frame camera)
//!      ↓
//! SceneRenderer (depth-first walk, failure policy)
//!      ↓
//! NodeBehavior hooks (uniforms + draws)
//!      ↓
//! RenderBackend
//! ```

mod node;
mod scene_graph;
mod traversal;
pub mod nodes;

pub use node::{InitState, NodeBehavior, NodePhase, RenderArgs, RenderFlags};
pub use scene_graph::{NodeId, SceneError, SceneGraph, SceneNode};
pub use traversal::{FrameReport, SceneRenderer};
