//! Camera context: one observer's projection, view and viewport

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Vec2};

/// Pixel rectangle of the render target a camera draws into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge in pixels
    pub x: i32,
    /// Bottom edge in pixels
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a viewport from its four integer components
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Viewport anchored at the origin
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Width / height, or `None` for a degenerate viewport
    pub fn aspect_ratio(&self) -> Option<f32> {
        (self.width > 0 && self.height > 0).then(|| self.width as f32 / self.height as f32)
    }

    /// Size in pixels as a vector, the value shaders receive as screen size
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::from_size(800, 600)
    }
}

/// Projection and view matrices plus the viewport they target
///
/// Contexts are values: the camera stack owns copies, nodes only read them.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraContext {
    /// Projection matrix (column-major, right-handed)
    pub projection: Mat4,
    /// World-to-view matrix
    pub view: Mat4,
    /// Target rectangle in pixels
    pub viewport: Viewport,
}

impl CameraContext {
    /// Create a context from explicit matrices
    pub fn new(projection: Mat4, view: Mat4, viewport: Viewport) -> Self {
        Self { projection, view, viewport }
    }

    /// Combined `projection * view`
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
