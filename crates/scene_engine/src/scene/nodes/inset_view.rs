//! Inset (picture-in-picture) view
//!
//! Renders its subtree through its own camera into a sub-rectangle of the
//! render target. The traversal pushes the camera and switches the backend
//! viewport for the subtree, restoring both once the subtree is done.

use std::any::Any;

use crate::render::api::RenderBackend;
use crate::render::camera::{Camera, CameraContext, Viewport};
use crate::render::RenderError;
use crate::scene::node::{NodeBehavior, RenderArgs};

/// Node that gives its subtree a separate camera and viewport
#[derive(Debug, Clone)]
pub struct InsetViewNode {
    name: String,
    camera: Camera,
    viewport: Viewport,
}

impl InsetViewNode {
    /// Create an inset showing `camera` in `viewport`
    pub fn new(name: impl Into<String>, camera: Camera, viewport: Viewport) -> Self {
        Self { name: name.into(), camera, viewport }
    }

    /// Camera used for the subtree
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Mutable camera, e.g. to orbit the inset view
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Target rectangle
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Move or resize the target rectangle
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

impl NodeBehavior for InsetViewNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, _backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        Ok(())
    }

    fn render_before_children(&mut self, _args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    fn camera_override(&self, _active: &CameraContext) -> Option<CameraContext> {
        Some(self.camera.context(self.viewport))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
