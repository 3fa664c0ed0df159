//! Node capability trait and per-node traversal state
//!
//! Every node kind implements [`NodeBehavior`]. The scene renderer calls
//! its hooks in a fixed order for each frame:
//!
//! ```text
//! initialize (once) -> render_before_children -> children -> render_after_children
//! ```

use std::any::Any;

use bitflags::bitflags;

use crate::foundation::math::Mat4;
use crate::render::api::RenderBackend;
use crate::render::camera::{CameraContext, CameraStack};
use crate::render::{RenderError, RenderUnit};
use super::scene_graph::NodeId;
use super::traversal::FrameReport;

bitflags! {
    /// Traversal phases enabled for a node
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u8 {
        /// Run the pre-children hook
        const BEFORE_CHILDREN = 1 << 0;
        /// Traverse the children (clearing it skips the whole subtree)
        const CHILDREN = 1 << 1;
        /// Run the post-children hook
        const AFTER_CHILDREN = 1 << 2;
    }
}

impl Default for RenderFlags {
    fn default() -> Self {
        Self::all()
    }
}

/// Where a node is in the current frame's traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodePhase {
    /// Not being traversed
    #[default]
    Idle,
    /// Pre-children hook running
    BeforeChildren,
    /// Children being traversed
    Children,
    /// Post-children hook running
    AfterChildren,
}

/// Resource state of a node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum InitState {
    /// Resources not acquired yet
    #[default]
    Uninitialized,
    /// Resources acquired; never goes back
    Initialized,
    /// Acquisition failed; the node is skipped for drawing
    Unrenderable {
        /// Failed attempts so far
        attempts: u32,
        /// Last failure
        reason: String,
    },
}

impl InitState {
    /// Whether resources are in place
    pub fn is_initialized(&self) -> bool {
        matches!(self, Self::Initialized)
    }
}

/// Per-call arguments of the render hooks
///
/// Gives a node read access to the camera stack, the backend to draw on and
/// its accumulated world matrix.
pub struct RenderArgs<'a> {
    camera_stack: &'a CameraStack,
    backend: &'a mut dyn RenderBackend,
    world_matrix: Mat4,
    node: NodeId,
    report: &'a mut FrameReport,
}

impl<'a> RenderArgs<'a> {
    pub(crate) fn new(
        camera_stack: &'a CameraStack,
        backend: &'a mut dyn RenderBackend,
        world_matrix: Mat4,
        node: NodeId,
        report: &'a mut FrameReport,
    ) -> Self {
        Self { camera_stack, backend, world_matrix, node, report }
    }

    /// The active camera
    ///
    /// # Errors
    /// [`RenderError::EmptyCameraStack`] when no camera is active.
    pub fn camera(&self) -> Result<&CameraContext, RenderError> {
        self.camera_stack.peek()
    }

    /// The whole camera stack, read-only
    pub fn camera_stack(&self) -> &CameraStack {
        self.camera_stack
    }

    /// Product of the ancestors' local transforms and the node's own
    pub fn world_matrix(&self) -> &Mat4 {
        &self.world_matrix
    }

    /// Node being rendered
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Backend to issue commands on
    pub fn backend(&mut self) -> &mut dyn RenderBackend {
        &mut *self.backend
    }

    /// Draw a render unit and account for it in the frame report
    ///
    /// # Errors
    /// Whatever [`RenderUnit::render`] returns; rejected uniforms are counted,
    /// not returned.
    pub fn draw(&mut self, unit: &mut RenderUnit) -> Result<(), RenderError> {
        let rejected = unit.render(&mut *self.backend)?;
        self.report.draw_calls += 1;
        self.report.uniform_errors += rejected;
        Ok(())
    }
}

/// Capabilities of a scene node kind
///
/// Hooks return [`RenderError`]s instead of handling them; the scene
/// renderer applies the failure policy.
pub trait NodeBehavior: Any {
    /// Name used in logs and frame reports
    fn name(&self) -> &str;

    /// Acquire GPU-facing resources for the node's render units
    ///
    /// Called lazily before the first draw. Must be idempotent: calling it
    /// again after success allocates nothing.
    fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError>;

    /// Draw the node; runs before its children are traversed
    fn render_before_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError>;

    /// Runs after the children have been traversed
    fn render_after_children(&mut self, _args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    /// Camera to make active for this node and its subtree
    ///
    /// Returning `Some` pushes the context before the pre-children hook and
    /// pops it after the post-children hook. The backend viewport follows the
    /// context's viewport for the same span.
    fn camera_override(&self, _active: &CameraContext) -> Option<CameraContext> {
        None
    }

    /// Upcast for downcasting to the concrete node kind
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete node kind
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_default_to_all_phases() {
        let flags = RenderFlags::default();
        assert!(flags.contains(RenderFlags::BEFORE_CHILDREN | RenderFlags::CHILDREN | RenderFlags::AFTER_CHILDREN));

        let no_children = flags - RenderFlags::CHILDREN;
        assert!(!no_children.contains(RenderFlags::CHILDREN));
        assert!(no_children.contains(RenderFlags::AFTER_CHILDREN));
    }
}
