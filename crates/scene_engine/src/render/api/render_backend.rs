//! Backend abstraction traits for the rendering system
//!
//! The scene graph never talks to a graphics API directly. Shader programs,
//! buffers, uniforms and draw submission live behind [`RenderBackend`];
//! everything the core holds is an opaque handle.

use crate::render::camera::Viewport;
use super::blend::BlendState;
use super::uniforms::{UniformKind, UniformValue};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a texture issued by [`RenderBackend::acquire_texture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Errors reported by a backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    /// Shader compilation or linking failed
    #[error("Program '{label}' failed to build: {reason}")]
    ProgramBuild {
        /// Program label from its descriptor
        label: String,
        /// Compiler or linker log
        reason: String,
    },

    /// The linked program does not declare the uniform
    #[error("Uniform '{0}' is not declared by the program")]
    UnknownUniform(String),

    /// The uniform exists with a different type
    #[error("Uniform '{name}' expects {expected:?}, got {actual:?}")]
    UniformTypeMismatch {
        /// Uniform name
        name: String,
        /// Declared type
        expected: UniformKind,
        /// Type of the supplied value
        actual: UniformKind,
    },

    /// A handle that the backend never issued or already released
    #[error("Unknown {kind} handle {id}")]
    InvalidHandle {
        /// Handle kind ("program", "buffer", "texture")
        kind: &'static str,
        /// Raw handle id
        id: u64,
    },

    /// Texture creation failed
    #[error("Texture '{label}' could not be created: {reason}")]
    TextureCreation {
        /// Texture label
        label: String,
        /// Failure reason
        reason: String,
    },

    /// Buffer creation failed
    #[error("Buffer '{label}' could not be created: {reason}")]
    BufferCreation {
        /// Buffer label
        label: String,
        /// Failure reason
        reason: String,
    },

    /// Draw submission failed
    #[error("Draw failed: {0}")]
    Draw(String),
}

/// Maps shader attribute names to model semantics
///
/// `("in_Position", "position")` means the shader input `in_Position` is fed
/// from the model's `position` buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, String)>,
}

impl AttributeMap {
    /// Empty map, for shaders without vertex inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: bind a shader attribute to a model semantic
    pub fn with(mut self, shader_attribute: impl Into<String>, semantic: impl Into<String>) -> Self {
        self.entries.push((shader_attribute.into(), semantic.into()));
        self
    }

    /// Iterate `(shader attribute, semantic)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(attribute, semantic)| (attribute.as_str(), semantic.as_str()))
    }

    /// Number of bound attributes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no attributes are bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a backend needs to build a shader program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDescriptor {
    /// Human readable label, used in logs and errors
    pub label: String,
    /// Vertex stage source
    pub vertex_source: String,
    /// Fragment stage source
    pub fragment_source: String,
    /// Vertex inputs
    pub attributes: AttributeMap,
}

impl ProgramDescriptor {
    /// Create a descriptor for a two-stage program
    pub fn new(
        label: impl Into<String>,
        vertex_source: impl Into<String>,
        fragment_source: impl Into<String>,
        attributes: AttributeMap,
    ) -> Self {
        Self {
            label: label.into(),
            vertex_source: vertex_source.into(),
            fragment_source: fragment_source.into(),
            attributes,
        }
    }
}

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    /// Per-vertex attribute data with `components` floats per vertex
    Vertex {
        /// Floats per vertex
        components: u32,
    },
    /// 32-bit indices
    Index,
}

/// Buffer creation request
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    /// Label for logs (usually the model semantic)
    pub label: &'a str,
    /// Buffer contents kind
    pub usage: BufferUsage,
    /// Initial contents
    pub data: &'a [u8],
}

/// Single-channel texture upload request
///
/// `key` identifies the contents. A backend hands out the same live texture
/// for every request with the same key.
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor<'a> {
    /// Label for logs
    pub label: &'a str,
    /// Content key
    pub key: u64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major coverage, one byte per pixel
    pub pixels: &'a [u8],
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Primitive {
    /// Independent triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Independent lines
    Lines,
}

/// A vertex buffer bound to a shader attribute for a draw
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexBinding {
    /// Shader attribute name
    pub attribute: String,
    /// Source buffer
    pub buffer: BufferHandle,
    /// Floats per vertex
    pub components: u32,
}

/// How vertices are enumerated for a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBinding {
    /// Sequential vertices `0..count`, no index buffer
    Zero {
        /// Number of vertices
        count: u32,
    },
    /// Indices read from a buffer
    Buffer {
        /// Index buffer
        buffer: BufferHandle,
        /// Number of indices
        count: u32,
    },
}

impl IndexBinding {
    /// Number of vertices the draw will emit
    pub fn element_count(&self) -> u32 {
        match self {
            Self::Zero { count } | Self::Buffer { count, .. } => *count,
        }
    }
}

/// One draw submission
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Program to draw with; its uniforms must already be set
    pub program: ProgramHandle,
    /// Label of the issuing render unit
    pub label: &'a str,
    /// Vertex inputs
    pub vertex_buffers: &'a [VertexBinding],
    /// Vertex enumeration
    pub index: IndexBinding,
    /// Primitive assembly mode
    pub primitive: Primitive,
}

/// Main rendering backend trait
///
/// Implemented by the graphics API layer. All calls happen on the render
/// thread during a frame; implementations need no internal locking.
pub trait RenderBackend {
    /// Current viewport of the render target (platform query)
    fn viewport(&self) -> Viewport;

    /// Change the viewport subsequent draws target
    fn set_viewport(&mut self, viewport: Viewport);

    /// Compile and link a shader program
    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> BackendResult<ProgramHandle>;

    /// Create a buffer initialised with `descriptor.data`
    fn create_buffer(&mut self, descriptor: &BufferDescriptor<'_>) -> BackendResult<BufferHandle>;

    /// Replace the contents of an existing buffer
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()>;

    /// Upload a single-channel texture, or return the live one with the same key
    fn acquire_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> BackendResult<TextureHandle>;

    /// Set one uniform of a program
    ///
    /// Texture values must name a texture this backend issued.
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: &UniformValue) -> BackendResult<()>;

    /// Configure blending for subsequent draws; `None` disables blending
    fn set_blend_state(&mut self, blend: Option<BlendState>);

    /// Submit a draw
    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()>;
}
