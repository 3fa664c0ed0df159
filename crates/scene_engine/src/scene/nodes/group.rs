//! Group node: carries a transform for its children and draws nothing

use std::any::Any;

use crate::render::api::RenderBackend;
use crate::render::RenderError;
use crate::scene::node::{NodeBehavior, RenderArgs};

/// Node without render units
#[derive(Debug, Clone)]
pub struct GroupNode {
    name: String,
}

impl GroupNode {
    /// Create a named group
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl NodeBehavior for GroupNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        Ok(())
    }

    fn render_before_children(&mut self, _args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
