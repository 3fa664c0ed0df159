//! Uniform values passed from nodes to shader programs

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use super::render_backend::TextureHandle;

/// Well-known uniform names shared by the built-in node shaders
pub mod names {
    /// Projection matrix of the active camera
    pub const PROJECTION_MATRIX: &str = "projectionMatrix";
    /// View matrix of the active camera
    pub const VIEW_MATRIX: &str = "viewMatrix";
    /// Model matrix of the node being drawn
    pub const MODEL_MATRIX: &str = "modelMatrix";
    /// Viewport size in pixels
    pub const SCREEN_SIZE: &str = "screenSize";
    /// Glyph atlas texture
    pub const GLYPH_TEXTURE: &str = "glyphTexture";
    /// Billboard size in pixels
    pub const BILLBOARD_SIZE: &str = "billboardSize";
    /// Text tint
    pub const TEXT_COLOR: &str = "textColor";
    /// Flat surface color
    pub const COLOR: &str = "color";
}

/// Type tag of a [`UniformValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Single float
    Float,
    /// Two-component vector
    Vec2,
    /// Three-component vector
    Vec3,
    /// Four-component vector
    Vec4,
    /// 4x4 matrix
    Mat4,
    /// Texture sampler
    Texture,
}

/// Current value of one uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Single float
    Float(f32),
    /// Two-component vector
    Vec2(Vec2),
    /// Three-component vector
    Vec3(Vec3),
    /// Four-component vector
    Vec4(Vec4),
    /// 4x4 column-major matrix
    Mat4(Mat4),
    /// Texture bound to a sampler
    Texture(TextureHandle),
}

impl UniformValue {
    /// Type tag of this value
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat4(_) => UniformKind::Mat4,
            Self::Texture(_) => UniformKind::Texture,
        }
    }

    /// Matrix payload, if this is a matrix
    pub fn as_mat4(&self) -> Option<&Mat4> {
        match self {
            Self::Mat4(matrix) => Some(matrix),
            _ => None,
        }
    }

    /// Four-component payload, if this is a `Vec4`
    pub fn as_vec4(&self) -> Option<Vec4> {
        match self {
            Self::Vec4(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Mat4> for UniformValue {
    fn from(value: Mat4) -> Self {
        Self::Mat4(value)
    }
}

impl From<Vec2> for UniformValue {
    fn from(value: Vec2) -> Self {
        Self::Vec2(value)
    }
}

impl From<Vec4> for UniformValue {
    fn from(value: Vec4) -> Self {
        Self::Vec4(value)
    }
}

impl From<TextureHandle> for UniformValue {
    fn from(value: TextureHandle) -> Self {
        Self::Texture(value)
    }
}
