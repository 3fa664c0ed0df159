//! Frame driver
//!
//! Owns the top-level camera stack and runs one traversal per frame:
//! query the platform viewport, push the frame camera, traverse the root,
//! pop the camera.

use crate::core::config::RendererConfig;
use crate::foundation::time::FrameClock;
use crate::render::api::RenderBackend;
use crate::render::camera::{Camera, CameraStack, Viewport};
use crate::render::RenderError;
use crate::scene::{FrameReport, SceneGraph, SceneRenderer};

/// Drives frames over a scene graph
#[derive(Debug)]
pub struct FrameDriver {
    camera_stack: CameraStack,
    renderer: SceneRenderer,
    clock: FrameClock,
    fallback_viewport: Viewport,
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new(&RendererConfig::default())
    }
}

impl FrameDriver {
    /// Create a driver configured from the renderer section
    pub fn new(config: &RendererConfig) -> Self {
        log::info!(
            "Frame driver ready (max init attempts: {}, fallback viewport: {}x{})",
            config.max_init_attempts,
            config.default_viewport.width,
            config.default_viewport.height
        );
        Self {
            camera_stack: CameraStack::new(),
            renderer: SceneRenderer::new(config),
            clock: FrameClock::new(),
            fallback_viewport: config.default_viewport,
        }
    }

    /// Render one frame of `scene` as seen by `camera`
    ///
    /// The viewport comes from the backend; an empty one falls back to the
    /// configured default. The camera stack is back at its previous depth
    /// when this returns, whatever the outcome.
    ///
    /// # Errors
    /// Errors that abort the traversal, see [`SceneRenderer::render`].
    pub fn render_frame(
        &mut self,
        scene: &mut SceneGraph,
        camera: &Camera,
        backend: &mut dyn RenderBackend,
    ) -> Result<FrameReport, RenderError> {
        let started = self.clock.begin_frame();

        let mut viewport = backend.viewport();
        if viewport.aspect_ratio().is_none() {
            log::warn!("Backend reported an empty viewport, using {:?}", self.fallback_viewport);
            viewport = self.fallback_viewport;
            backend.set_viewport(viewport);
        }

        let result = {
            let mut scope = self.camera_stack.scoped(camera.context(viewport));
            self.renderer.render(scene, &mut scope, backend)
        };

        self.clock.end_frame(started);
        if let Ok(report) = &result {
            if !report.is_clean() {
                log::debug!(
                    "Frame {} degraded: {} skipped node(s), {} rejected uniform(s)",
                    self.clock.frame_count(),
                    report.skipped.len(),
                    report.uniform_errors
                );
            }
        }
        result
    }

    /// Camera stack used for frames; empty between frames
    pub fn camera_stack(&self) -> &CameraStack {
        &self.camera_stack
    }

    /// Frame timing
    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Traversal settings
    pub fn renderer(&self) -> &SceneRenderer {
        &self.renderer
    }
}
