//! Scene traversal
//!
//! Depth-first walk of a [`SceneGraph`] that runs each node's hooks against
//! the camera stack and applies the failure policy:
//!
//! - an empty camera stack aborts the frame
//! - a node whose resources cannot be acquired is skipped for drawing,
//!   while its children and siblings are still traversed
//! - a draw attempted before initialization triggers one re-initialization
//!   and one retry
//! - rejected uniforms are counted and never stop a draw

use crate::core::config::RendererConfig;
use crate::foundation::math::Mat4;
use crate::render::api::RenderBackend;
use crate::render::camera::CameraStack;
use crate::render::RenderError;
use super::node::{InitState, NodePhase, RenderArgs, RenderFlags};
use super::scene_graph::{NodeId, SceneGraph, SceneNode};

/// What happened during one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Nodes reached by the walk
    pub nodes_visited: usize,
    /// Draws issued
    pub draw_calls: usize,
    /// Uniforms the backend refused
    pub uniform_errors: usize,
    /// Nodes that did not draw, with the reason
    pub skipped: Vec<(NodeId, String)>,
}

impl FrameReport {
    /// Whether every visited node rendered without complaint
    pub fn is_clean(&self) -> bool {
        self.uniform_errors == 0 && self.skipped.is_empty()
    }

    /// Whether a node was skipped this frame
    pub fn was_skipped(&self, node: NodeId) -> bool {
        self.skipped.iter().any(|(id, _)| *id == node)
    }
}

/// Runs the two-phase traversal over a scene graph
#[derive(Debug, Clone)]
pub struct SceneRenderer {
    max_init_attempts: u32,
}

impl Default for SceneRenderer {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

impl SceneRenderer {
    /// Create a renderer with the retry policy from `config`
    pub fn new(config: &RendererConfig) -> Self {
        Self { max_init_attempts: config.max_init_attempts.max(1) }
    }

    /// Initialization attempts allowed per node
    pub fn max_init_attempts(&self) -> u32 {
        self.max_init_attempts
    }

    /// Traverse the whole graph once
    ///
    /// The caller pushes the frame's camera before calling; the stack depth
    /// is the same on return as on entry, on success and on error.
    ///
    /// # Errors
    /// [`RenderError::EmptyCameraStack`] when no camera is active when the
    /// walk starts or when a node asks for one.
    pub fn render(
        &self,
        graph: &mut SceneGraph,
        stack: &mut CameraStack,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameReport, RenderError> {
        stack.peek()?;
        let depth = stack.depth();

        let mut report = FrameReport::default();
        let root = graph.root();
        let result = self.visit(graph, root, &Mat4::identity(), stack, backend, &mut report);

        if stack.depth() != depth {
            log::error!("Camera stack depth changed during traversal: {} -> {}", depth, stack.depth());
        }

        match result {
            Ok(()) => {
                log::trace!(
                    "Frame traversed: {} node(s), {} draw(s), {} skipped",
                    report.nodes_visited,
                    report.draw_calls,
                    report.skipped.len()
                );
                Ok(report)
            }
            Err(err) => {
                log::error!("Traversal aborted: {}", err);
                Err(err)
            }
        }
    }

    fn visit(
        &self,
        graph: &mut SceneGraph,
        id: NodeId,
        parent_world: &Mat4,
        stack: &mut CameraStack,
        backend: &mut dyn RenderBackend,
        report: &mut FrameReport,
    ) -> Result<(), RenderError> {
        let Some(node) = graph.get(id) else {
            return Ok(());
        };
        let world = parent_world * node.transform().to_matrix();

        match node.behavior().camera_override(stack.peek()?) {
            Some(context) => {
                // The subtree renders into the override's viewport for as long
                // as its camera is active, whatever the node's flags say
                let previous = backend.viewport();
                backend.set_viewport(context.viewport);
                let result = {
                    let mut scope = stack.scoped(context);
                    self.visit_node(graph, id, &world, &mut scope, backend, report)
                };
                backend.set_viewport(previous);
                result
            }
            None => self.visit_node(graph, id, &world, stack, backend, report),
        }
    }

    fn visit_node(
        &self,
        graph: &mut SceneGraph,
        id: NodeId,
        world: &Mat4,
        stack: &mut CameraStack,
        backend: &mut dyn RenderBackend,
        report: &mut FrameReport,
    ) -> Result<(), RenderError> {
        report.nodes_visited += 1;

        let Some(node) = graph.get_mut(id) else {
            return Ok(());
        };
        let flags = node.flags();
        let drawable = self.ensure_initialized(node, id, backend, report);

        if drawable && flags.contains(RenderFlags::BEFORE_CHILDREN) {
            node.phase = NodePhase::BeforeChildren;
            let result = self.run_before(node, id, world, stack, backend, report);
            if let Err(err) = result {
                node.phase = NodePhase::Idle;
                return Err(err);
            }
        }

        if flags.contains(RenderFlags::CHILDREN) {
            node.phase = NodePhase::Children;
            let children = node.children().to_vec();
            for child in children {
                if let Err(err) = self.visit(graph, child, world, stack, backend, report) {
                    if let Some(node) = graph.get_mut(id) {
                        node.phase = NodePhase::Idle;
                    }
                    return Err(err);
                }
            }
        }

        let Some(node) = graph.get_mut(id) else {
            return Ok(());
        };
        let mut result = Ok(());
        if drawable && flags.contains(RenderFlags::AFTER_CHILDREN) && node.init_state().is_initialized() {
            node.phase = NodePhase::AfterChildren;
            let mut args = RenderArgs::new(stack, backend, *world, id, report);
            result = match node.behavior_box_mut().render_after_children(&mut args) {
                Err(RenderError::EmptyCameraStack) => Err(RenderError::EmptyCameraStack),
                Err(err) => {
                    log::warn!("Node '{}' after-children hook failed: {}", node.behavior().name(), err);
                    report.skipped.push((id, err.to_string()));
                    Ok(())
                }
                Ok(()) => Ok(()),
            };
        }
        node.phase = NodePhase::Idle;
        result
    }

    /// Pre-children hook with the retry-once policy
    fn run_before(
        &self,
        node: &mut SceneNode,
        id: NodeId,
        world: &Mat4,
        stack: &CameraStack,
        backend: &mut dyn RenderBackend,
        report: &mut FrameReport,
    ) -> Result<(), RenderError> {
        let first = {
            let mut args = RenderArgs::new(stack, &mut *backend, *world, id, report);
            node.behavior_box_mut().render_before_children(&mut args)
        };

        let outcome = match first {
            Err(RenderError::UninitializedResource { resource }) => {
                log::debug!(
                    "Node '{}' drew '{}' before initialization, initializing and retrying",
                    node.behavior().name(),
                    resource
                );
                match node.force_initialize(&mut *backend) {
                    Ok(()) => {
                        let mut args = RenderArgs::new(stack, &mut *backend, *world, id, report);
                        node.behavior_box_mut().render_before_children(&mut args)
                    }
                    Err(err) => Err(err),
                }
            }
            other => other,
        };

        match outcome {
            Ok(()) => Ok(()),
            Err(RenderError::EmptyCameraStack) => Err(RenderError::EmptyCameraStack),
            Err(err) => {
                log::warn!("Node '{}' skipped this frame: {}", node.behavior().name(), err);
                report.skipped.push((id, err.to_string()));
                Ok(())
            }
        }
    }

    /// Lazily initialize a node; `false` means it must not draw
    fn ensure_initialized(
        &self,
        node: &mut SceneNode,
        id: NodeId,
        backend: &mut dyn RenderBackend,
        report: &mut FrameReport,
    ) -> bool {
        match node.init_state() {
            InitState::Initialized => return true,
            InitState::Unrenderable { attempts, reason } if *attempts >= self.max_init_attempts => {
                report.skipped.push((id, reason.clone()));
                return false;
            }
            InitState::Uninitialized | InitState::Unrenderable { .. } => {}
        }

        match node.initialize(backend) {
            Ok(()) => true,
            Err(err) => {
                let attempts = match node.init_state() {
                    InitState::Unrenderable { attempts, .. } => *attempts,
                    _ => 0,
                };
                log::warn!(
                    "Node '{}' is unrenderable (attempt {}/{}): {}",
                    node.behavior().name(),
                    attempts,
                    self.max_init_attempts,
                    err
                );
                report.skipped.push((id, err.to_string()));
                false
            }
        }
    }
}
