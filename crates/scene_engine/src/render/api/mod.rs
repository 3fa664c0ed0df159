//! Rendering API abstractions
//!
//! Collaborator interfaces the scene graph renders through: the backend
//! (programs, buffers, uniforms, draws), geometry models, uniform values and
//! blend configuration.

pub mod render_backend;
pub mod geometry;
pub mod uniforms;
pub mod blend;

pub use render_backend::{
    AttributeMap, BackendError, BackendResult, BufferDescriptor, BufferHandle, BufferUsage,
    DrawCall, IndexBinding, Primitive, ProgramDescriptor, ProgramHandle, RenderBackend,
    TextureDescriptor, TextureHandle, VertexBinding,
};
pub use geometry::{GeometryModel, IndexSource, StaticModel, VertexAttribute};
pub use uniforms::{names as uniform_names, UniformKind, UniformValue};
pub use blend::{BlendFactor, BlendState};
