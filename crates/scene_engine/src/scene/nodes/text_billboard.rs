//! Text billboard node
//!
//! A label of fixed pixel size that always faces the viewer. Only the
//! translation of the accumulated world matrix is used; ancestor rotation
//! and scale never tilt or stretch the label. Building the screen-space
//! quad around the projected anchor is the vertex shader's job.

use std::any::Any;
use std::sync::Arc;

use crate::foundation::math::{translation_of, Mat4, Vec2, Vec3, Vec4};
use crate::render::api::{
    uniform_names, AttributeMap, BlendState, ProgramDescriptor, RenderBackend, TextureHandle,
};
use crate::render::camera::CameraContext;
use crate::render::text::{default_glyph_service, text_layout, GlyphService, TextModel};
use crate::render::{RenderError, RenderUnit};
use crate::scene::node::{NodeBehavior, RenderArgs};

const VERTEX_SHADER: &str = r#"#version 330 core
in vec3 in_Position;
in vec2 in_Str;

uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
uniform mat4 modelMatrix;
uniform vec2 screenSize;
uniform vec2 billboardSize;

out vec2 passUv;

void main() {
    vec4 anchor = projectionMatrix * viewMatrix * modelMatrix * vec4(0.0, 0.0, 0.0, 1.0);
    vec2 corner = clamp(in_Position.xy, -0.5 * billboardSize, 0.5 * billboardSize);
    vec2 offset = corner * 2.0 / screenSize;
    gl_Position = vec4(anchor.xy + offset * anchor.w, anchor.z, anchor.w);
    passUv = in_Str;
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec2 passUv;

uniform sampler2D glyphTexture;
uniform vec4 textColor;

out vec4 outColor;

void main() {
    float coverage = texture(glyphTexture, passUv).r;
    outColor = vec4(textColor.rgb, textColor.a * coverage);
}
"#;

/// World-space anchor of a billboard: the translation of its world matrix
pub fn billboard_anchor(world: &Mat4) -> Vec3 {
    translation_of(world)
}

/// Text label that always faces the camera
pub struct TextBillboardNode {
    name: String,
    width: u32,
    height: u32,
    text: String,
    color: Vec4,
    glyph_service: Arc<dyn GlyphService>,
    model: TextModel,
    unit: RenderUnit,
    texture: Option<TextureHandle>,
    dirty: bool,
}

impl std::fmt::Debug for TextBillboardNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextBillboardNode")
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("text", &self.text)
            .field("glyph_service", &self.glyph_service)
            .finish()
    }
}

impl TextBillboardNode {
    /// Create a billboard of `width` x `height` pixels
    ///
    /// Without a glyph service the process-wide default is shared. Resources
    /// are acquired on first draw; see [`create`](Self::create) for eager
    /// initialization.
    pub fn new(width: u32, height: u32, glyph_service: Option<Arc<dyn GlyphService>>) -> Self {
        let glyph_service = glyph_service.unwrap_or_else(default_glyph_service);
        let attributes = AttributeMap::new()
            .with("in_Position", text_layout::POSITION)
            .with("in_Str", text_layout::STR);
        let descriptor = ProgramDescriptor::new("text_billboard", VERTEX_SHADER, FRAGMENT_SHADER, attributes);

        Self {
            name: "text_billboard".to_string(),
            width,
            height,
            text: String::new(),
            color: Vec4::new(1.0, 1.0, 1.0, 1.0),
            model: TextModel::default(),
            unit: RenderUnit::new(descriptor, Some(BlendState::source_over())),
            glyph_service,
            texture: None,
            dirty: false,
        }
    }

    /// Create a billboard and acquire its resources immediately
    ///
    /// # Errors
    /// [`RenderError::ResourceAcquisition`] when the program or buffers
    /// cannot be created.
    pub fn create(
        width: u32,
        height: u32,
        glyph_service: Option<Arc<dyn GlyphService>>,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self, RenderError> {
        let mut node = Self::new(width, height, glyph_service);
        node.initialize(backend)?;
        Ok(node)
    }

    /// Builder pattern: set the label shown in logs and reports
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder pattern: set the displayed text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// Builder pattern: set the text color
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Replace the displayed text; buffers are refreshed before the next draw
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.relayout();
    }

    /// Displayed text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Set the text color (RGBA)
    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    /// Text color
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Glyph service in use
    pub fn glyph_service(&self) -> &Arc<dyn GlyphService> {
        &self.glyph_service
    }

    /// Swap the glyph service; `None` selects the process-wide default
    pub fn set_glyph_service(&mut self, glyph_service: Option<Arc<dyn GlyphService>>) {
        self.glyph_service = glyph_service.unwrap_or_else(default_glyph_service);
        self.texture = None;
        self.relayout();
    }

    /// Laid out glyph quads
    pub fn text_model(&self) -> &TextModel {
        &self.model
    }

    /// Glyph atlas texture, once acquired from a backend
    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// The node's only render unit
    pub fn render_unit(&self) -> &RenderUnit {
        &self.unit
    }

    /// Screen rectangle the label covers under a camera, in pixels
    ///
    /// Returns the center relative to the viewport origin and the size, or
    /// `None` when the anchor is behind the camera.
    pub fn screen_rect(&self, camera: &CameraContext, world: &Mat4) -> Option<(Vec2, Vec2)> {
        let model = Mat4::new_translation(&billboard_anchor(world));
        let clip = camera.view_projection() * model * Vec4::new(0.0, 0.0, 0.0, 1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = Vec2::new(clip.x / clip.w, clip.y / clip.w);
        let screen = camera.viewport.size();
        let center = Vec2::new((ndc.x + 1.0) * 0.5 * screen.x, (ndc.y + 1.0) * 0.5 * screen.y);
        Some((center, Vec2::new(self.width as f32, self.height as f32)))
    }

    fn acquire_texture(&self, backend: &mut dyn RenderBackend) -> Result<TextureHandle, RenderError> {
        self.glyph_service
            .acquire_texture(backend)
            .map_err(|e| RenderError::ResourceAcquisition {
                resource: format!("{} glyph atlas", self.name),
                reason: e.to_string(),
            })
    }

    fn relayout(&mut self) {
        self.model = TextModel::layout(
            &self.text,
            self.glyph_service.as_ref(),
            self.width as f32,
            self.height as f32,
        );
        self.dirty = true;
    }
}

impl NodeBehavior for TextBillboardNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        let was_ready = self.unit.is_ready();
        self.unit.initialize(backend, &self.model)?;
        if !was_ready {
            self.dirty = false;
        }
        if self.texture.is_none() {
            self.texture = Some(self.acquire_texture(backend)?);
        }
        Ok(())
    }

    fn render_before_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        let camera = args.camera()?.clone();
        let model = Mat4::new_translation(&billboard_anchor(args.world_matrix()));

        if self.dirty && self.unit.is_ready() {
            self.unit.refresh_buffers(args.backend(), &self.model)?;
            self.dirty = false;
        }

        let texture = match self.texture {
            Some(texture) => texture,
            None => {
                let texture = self.acquire_texture(args.backend())?;
                self.texture = Some(texture);
                texture
            }
        };

        let size = Vec2::new(self.width as f32, self.height as f32);
        self.unit.set_uniform(uniform_names::PROJECTION_MATRIX, camera.projection);
        self.unit.set_uniform(uniform_names::VIEW_MATRIX, camera.view);
        self.unit.set_uniform(uniform_names::MODEL_MATRIX, model);
        self.unit.set_uniform(uniform_names::SCREEN_SIZE, camera.viewport.size());
        self.unit.set_uniform(uniform_names::BILLBOARD_SIZE, size);
        self.unit.set_uniform(uniform_names::TEXT_COLOR, self.color);
        self.unit.set_uniform(uniform_names::GLYPH_TEXTURE, texture);

        args.draw(&mut self.unit)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
