//! Camera stack
//!
//! LIFO stack of camera contexts. The top entry is the active camera for
//! every node traversed while it is on the stack. Nested pushes are expected
//! to be balanced; [`CameraStack::scoped`] makes that automatic.

use std::ops::{Deref, DerefMut};

use crate::render::RenderError;
use super::context::CameraContext;

/// Ordered stack of camera contexts
///
/// Not shared between threads: a render thread owns its own stack.
#[derive(Debug, Default)]
pub struct CameraStack {
    contexts: Vec<CameraContext>,
}

impl CameraStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `context` the active camera until the matching [`pop`](Self::pop)
    pub fn push(&mut self, context: CameraContext) {
        log::trace!("Camera stack push (depth {} -> {})", self.contexts.len(), self.contexts.len() + 1);
        self.contexts.push(context);
    }

    /// Remove and return the active camera
    pub fn pop(&mut self) -> Option<CameraContext> {
        let popped = self.contexts.pop();
        if popped.is_none() {
            log::warn!("Camera stack pop on an empty stack");
        }
        popped
    }

    /// The active camera
    ///
    /// # Errors
    /// [`RenderError::EmptyCameraStack`] when nothing has been pushed.
    pub fn peek(&self) -> Result<&CameraContext, RenderError> {
        self.contexts.last().ok_or(RenderError::EmptyCameraStack)
    }

    /// Number of stacked contexts
    pub fn depth(&self) -> usize {
        self.contexts.len()
    }

    /// Whether no camera is active
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    /// Push `context` and return a guard that pops it when dropped
    ///
    /// The guard dereferences to the stack, so nested scopes can be opened
    /// from it. Dropping the guard restores the depth observed before the
    /// push, on every exit path.
    pub fn scoped(&mut self, context: CameraContext) -> CameraScope<'_> {
        let base_depth = self.contexts.len();
        self.push(context);
        CameraScope { stack: self, base_depth }
    }
}

/// Guard returned by [`CameraStack::scoped`]
#[derive(Debug)]
pub struct CameraScope<'a> {
    stack: &'a mut CameraStack,
    base_depth: usize,
}

impl Deref for CameraScope<'_> {
    type Target = CameraStack;

    fn deref(&self) -> &CameraStack {
        &*self.stack
    }
}

impl DerefMut for CameraScope<'_> {
    fn deref_mut(&mut self) -> &mut CameraStack {
        &mut *self.stack
    }
}

impl Drop for CameraScope<'_> {
    fn drop(&mut self) {
        let depth = self.stack.contexts.len();
        if depth > self.base_depth + 1 {
            log::warn!(
                "Camera scope closing with {} unbalanced push(es), discarding them",
                depth - self.base_depth - 1
            );
        }
        self.stack.contexts.truncate(self.base_depth);
    }
}
