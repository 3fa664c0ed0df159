//! Scene graph storage
//!
//! Nodes live in a slot-map arena and refer to each other by [`NodeId`].
//! A parent owns its ordered children: removing it removes the whole
//! subtree. The parent link only serves transform composition.

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{Mat4, Transform};
use crate::render::api::RenderBackend;
use crate::render::RenderError;
use super::node::{InitState, NodeBehavior, NodePhase, RenderFlags};
use super::nodes::GroupNode;

new_key_type! {
    /// Handle of a node in a [`SceneGraph`]
    pub struct NodeId;
}

/// Errors raised by graph editing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The handle does not name a live node
    #[error("Node {0:?} not found")]
    NodeNotFound(NodeId),

    /// The root cannot be removed or reparented
    #[error("The root node cannot be removed")]
    RootRemoval,

    /// The edit would make a node its own ancestor
    #[error("Moving {node:?} under {parent:?} would create a cycle")]
    CycleDetected {
        /// Node being moved
        node: NodeId,
        /// Requested parent
        parent: NodeId,
    },
}

/// One node of the graph
pub struct SceneNode {
    transform: Transform,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    behavior: Box<dyn NodeBehavior>,
    flags: RenderFlags,
    pub(crate) init: InitState,
    pub(crate) phase: NodePhase,
}

impl SceneNode {
    fn new(behavior: Box<dyn NodeBehavior>, transform: Transform, parent: Option<NodeId>) -> Self {
        Self {
            transform,
            parent,
            children: Vec::new(),
            behavior,
            flags: RenderFlags::default(),
            init: InitState::Uninitialized,
            phase: NodePhase::Idle,
        }
    }

    /// Transform relative to the parent
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Parent node, `None` for the root
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in traversal order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Enabled traversal phases
    pub fn flags(&self) -> RenderFlags {
        self.flags
    }

    /// Enable or disable traversal phases
    pub fn set_flags(&mut self, flags: RenderFlags) {
        self.flags = flags;
    }

    /// Resource state
    pub fn init_state(&self) -> &InitState {
        &self.init
    }

    /// Traversal phase; `Idle` outside of a frame
    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    /// Node behavior as a trait object
    pub fn behavior(&self) -> &dyn NodeBehavior {
        self.behavior.as_ref()
    }

    pub(crate) fn behavior_box_mut(&mut self) -> &mut dyn NodeBehavior {
        self.behavior.as_mut()
    }

    /// Acquire the node's resources unless already done
    ///
    /// On failure the node becomes [`InitState::Unrenderable`] with its
    /// attempt count increased.
    ///
    /// # Errors
    /// The error of the behavior's `initialize`.
    pub fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        if self.init.is_initialized() {
            return Ok(());
        }
        self.force_initialize(backend)
    }

    /// Run the behavior's `initialize` regardless of the recorded state
    pub(crate) fn force_initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        match self.behavior.initialize(backend) {
            Ok(()) => {
                log::debug!("Node '{}' initialized", self.behavior.name());
                self.init = InitState::Initialized;
                Ok(())
            }
            Err(err) => {
                let attempts = match &self.init {
                    InitState::Unrenderable { attempts, .. } => attempts + 1,
                    _ => 1,
                };
                self.init = InitState::Unrenderable { attempts, reason: err.to_string() };
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneNode")
            .field("name", &self.behavior.name())
            .field("transform", &self.transform)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("flags", &self.flags)
            .field("init", &self.init)
            .finish()
    }
}

/// Tree of nodes with a fixed root
#[derive(Debug)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(GroupNode::new("root"))
    }
}

impl SceneGraph {
    /// Create a graph whose root has the given behavior and an identity transform
    pub fn new(root: impl NodeBehavior) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(SceneNode::new(Box::new(root), Transform::identity(), None));
        Self { nodes, root }
    }

    /// Root node
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included; never zero
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has no descendants
    pub fn has_only_root(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Whether the handle names a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node by handle
    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Mutable node by handle
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::NodeNotFound(id))
    }

    /// Append a new node as the last child of `parent`
    pub fn add_child(
        &mut self,
        parent: NodeId,
        behavior: impl NodeBehavior,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.add_boxed_child(parent, Box::new(behavior), transform)
    }

    /// [`add_child`](Self::add_child) for an already boxed behavior
    pub fn add_boxed_child(
        &mut self,
        parent: NodeId,
        behavior: Box<dyn NodeBehavior>,
        transform: Transform,
    ) -> Result<NodeId, SceneError> {
        self.node(parent)?;
        let name = behavior.name().to_string();
        let id = self.nodes.insert(SceneNode::new(behavior, transform, Some(parent)));
        self.node_mut(parent)?.children.push(id);
        log::trace!("Added node '{}' {:?} under {:?}", name, id, parent);
        Ok(id)
    }

    /// Remove a node and its whole subtree
    ///
    /// Returns the number of nodes removed.
    pub fn remove(&mut self, id: NodeId) -> Result<usize, SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|child| *child != id);
        }

        let mut pending = vec![id];
        let mut removed = 0;
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(next) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        log::trace!("Removed {} node(s) starting at {:?}", removed, id);
        Ok(removed)
    }

    /// Move a node (with its subtree) to the end of `new_parent`'s children
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RootRemoval);
        }
        self.node(new_parent)?;
        if self.is_ancestor_or_self(id, new_parent)? {
            return Err(SceneError::CycleDetected { node: id, parent: new_parent });
        }

        let old_parent = self.node(id)?.parent;
        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            old.children.retain(|child| *child != id);
        }
        self.node_mut(new_parent)?.children.push(id);
        self.node_mut(id)?.parent = Some(new_parent);
        Ok(())
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> Result<bool, SceneError> {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    /// Children of a node in traversal order
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], SceneError> {
        Ok(&self.node(id)?.children)
    }

    /// Parent of a node, `None` for the root
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, SceneError> {
        Ok(self.node(id)?.parent)
    }

    /// Effective model matrix: ancestors' local matrices in root-to-node order
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut world = Mat4::identity();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id)?;
            world = node.transform.to_matrix() * world;
            current = node.parent;
        }
        Ok(world)
    }

    /// Replace a node's local transform
    pub fn set_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.transform = transform;
        Ok(())
    }

    /// Mutable access to a node's local transform
    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut Transform, SceneError> {
        Ok(&mut self.node_mut(id)?.transform)
    }

    /// Enable or disable traversal phases of a node
    pub fn set_flags(&mut self, id: NodeId, flags: RenderFlags) -> Result<(), SceneError> {
        self.node_mut(id)?.flags = flags;
        Ok(())
    }

    /// Concrete behavior of a node, if it has type `T`
    pub fn behavior<T: NodeBehavior>(&self, id: NodeId) -> Option<&T> {
        self.nodes.get(id)?.behavior.as_any().downcast_ref::<T>()
    }

    /// Mutable concrete behavior of a node, if it has type `T`
    pub fn behavior_mut<T: NodeBehavior>(&mut self, id: NodeId) -> Option<&mut T> {
        self.nodes.get_mut(id)?.behavior.as_any_mut().downcast_mut::<T>()
    }

    /// Acquire one node's resources ahead of its first draw
    ///
    /// # Errors
    /// [`RenderError::Scene`] for an unknown node, otherwise the node's
    /// initialization error.
    pub fn initialize(&mut self, id: NodeId, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        self.node_mut(id)?.initialize(backend)
    }

    /// Node ids in depth-first traversal order
    pub fn iter_depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut pending = vec![self.root];
        while let Some(id) = pending.pop() {
            if let Some(node) = self.nodes.get(id) {
                order.push(id);
                pending.extend(node.children.iter().rev());
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    fn group(name: &str) -> GroupNode {
        GroupNode::new(name)
    }

    #[test]
    fn test_world_matrix_composes_root_to_node() {
        let mut graph = SceneGraph::default();
        let a_local = Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)).with_uniform_scale(2.0);
        let b_local = Transform::from_translation(Vec3::new(0.0, 3.0, 0.0));

        let a = graph.add_child(graph.root(), group("a"), a_local).expect("a");
        let b = graph.add_child(a, group("b"), b_local).expect("b");

        let expected = a_local.to_matrix() * b_local.to_matrix();
        assert_relative_eq!(graph.world_matrix(b).expect("b world"), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut graph = SceneGraph::default();
        let a = graph.add_child(graph.root(), group("a"), Transform::identity()).expect("a");
        let b = graph.add_child(a, group("b"), Transform::identity()).expect("b");
        let c = graph.add_child(graph.root(), group("c"), Transform::identity()).expect("c");

        assert_eq!(graph.remove(a), Ok(2));
        assert!(!graph.contains(b));
        assert_eq!(graph.children(graph.root()).expect("root"), &[c]);
        assert_eq!(graph.remove(graph.root()), Err(SceneError::RootRemoval));
        assert_eq!(graph.world_matrix(b), Err(SceneError::NodeNotFound(b)));
    }

    #[test]
    fn test_node_count_includes_root() {
        let mut graph = SceneGraph::default();
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_only_root());

        let a = graph.add_child(graph.root(), group("a"), Transform::identity()).expect("a");
        assert_eq!(graph.node_count(), 2);
        assert!(!graph.has_only_root());

        graph.remove(a).expect("remove");
        assert_eq!(graph.node_count(), 1);
        assert!(graph.has_only_root());
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let mut graph = SceneGraph::default();
        let a = graph.add_child(graph.root(), group("a"), Transform::identity()).expect("a");
        let b = graph.add_child(a, group("b"), Transform::identity()).expect("b");
        let c = graph.add_child(graph.root(), group("c"), Transform::identity()).expect("c");

        assert_eq!(graph.reparent(a, b), Err(SceneError::CycleDetected { node: a, parent: b }));
        assert_eq!(graph.reparent(a, a), Err(SceneError::CycleDetected { node: a, parent: a }));

        graph.reparent(b, c).expect("move b");
        assert_eq!(graph.parent(b), Ok(Some(c)));
        assert!(graph.children(a).expect("a").is_empty());
    }

    #[test]
    fn test_depth_first_order_follows_insertion() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let a = graph.add_child(root, group("a"), Transform::identity()).expect("a");
        let a1 = graph.add_child(a, group("a1"), Transform::identity()).expect("a1");
        let b = graph.add_child(root, group("b"), Transform::identity()).expect("b");

        assert_eq!(graph.iter_depth_first(), vec![root, a, a1, b]);
        assert!(graph.behavior::<GroupNode>(a1).is_some());
    }
}
