//! # Scene Engine
//!
//! Hierarchical scene rendering with a camera stack.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-backed node tree with ordered children and TRS transforms
//! - **Two-Phase Traversal**: pre-children and post-children hooks per node
//! - **Camera Stack**: scoped camera contexts for insets and nested views
//! - **Billboards**: text labels of fixed pixel size that always face the viewer
//! - **Backend Agnostic**: everything GPU-facing sits behind [`render::RenderBackend`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut backend = RecordingBackend::new(Viewport::from_size(800, 600));
//!     let mut scene = SceneGraph::default();
//!     let label = TextBillboardNode::new(200, 50, None).with_text("hello");
//!     scene.add_child(scene.root(), label, Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)))?;
//!
//!     let camera = Camera::default();
//!     let mut driver = FrameDriver::default();
//!     let report = driver.render_frame(&mut scene, &camera, &mut backend)?;
//!     assert_eq!(report.draw_calls, 1);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;
pub mod render;
pub mod scene;

mod engine;

pub use engine::FrameDriver;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        FrameDriver,
        core::config::{ApplicationConfig, CameraConfig, Config, EngineConfig, RendererConfig},
        foundation::math::{Mat4, Quat, Transform, Vec2, Vec3, Vec4},
        render::{
            backends::RecordingBackend,
            BlendState, Camera, CameraContext, CameraStack, GlyphServer, GlyphService,
            RenderBackend, RenderError, StaticModel, ViewType, Viewport,
        },
        scene::{
            nodes::{GroupNode, InsetViewNode, MeshNode, TextBillboardNode},
            FrameReport, NodeBehavior, NodeId, RenderArgs, RenderFlags, SceneError, SceneGraph,
            SceneRenderer,
        },
    };
}
