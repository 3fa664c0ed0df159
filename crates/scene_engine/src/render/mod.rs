//! # Rendering System
//!
//! Backend-agnostic rendering layer the scene graph draws through.
//!
//! ## Architecture
//!
//! - **API**: collaborator interfaces ([`RenderBackend`], [`GeometryModel`]),
//!   uniform values and blend configuration
//! - **Camera**: observers, camera contexts and the [`CameraStack`]
//! - **Render Unit**: one program plus its uniforms, owned by a node
//! - **Text**: glyph services and text quad layout for billboards
//! - **Backends**: the headless [`RecordingBackend`](backends::RecordingBackend)
//!
//! Every error raised while drawing is a [`RenderError`]. Only
//! [`RenderError::EmptyCameraStack`] aborts a traversal; the scene renderer
//! recovers from the others per node.

pub mod api;
pub mod camera;
pub mod text;
pub mod backends;

mod render_unit;

pub use api::{
    AttributeMap, BackendError, BlendState, GeometryModel, ProgramDescriptor, RenderBackend,
    StaticModel, UniformValue,
};
pub use camera::{Camera, CameraContext, CameraScope, CameraStack, ViewType, Viewport};
pub use render_unit::RenderUnit;
pub use text::{default_glyph_server, GlyphServer, GlyphService};

/// Errors raised while rendering a frame
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A node asked for the active camera while the stack was empty
    #[error("No active camera: the camera stack is empty")]
    EmptyCameraStack,

    /// A render unit was drawn before its resources were acquired
    #[error("Resource '{resource}' used before initialization")]
    UninitializedResource {
        /// Label of the render unit
        resource: String,
    },

    /// The program refused a uniform value
    #[error("Uniform '{uniform}' rejected: {source}")]
    UniformBinding {
        /// Uniform name
        uniform: String,
        /// Backend rejection
        #[source]
        source: BackendError,
    },

    /// Program or buffer acquisition failed during initialization
    #[error("Failed to acquire '{resource}': {reason}")]
    ResourceAcquisition {
        /// Label of the render unit or node
        resource: String,
        /// What went wrong
        reason: String,
    },

    /// Any other backend failure
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The node being rendered or initialized is not in the graph
    #[error("Scene error: {0}")]
    Scene(#[from] crate::scene::SceneError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
