//! Command-recording render backend
//!
//! Implements [`RenderBackend`] without a GPU. Every call is validated the
//! way a real driver would (unknown handles, uniform type changes) and
//! recorded, and each draw snapshots the uniforms its program holds at that
//! moment. Failures can be injected per program label or uniform name.

use std::collections::{HashMap, HashSet};

use crate::foundation::math::Vec4;
use crate::render::api::{
    uniform_names, BackendError, BackendResult, BlendState, BufferDescriptor, BufferHandle,
    BufferUsage, DrawCall, IndexBinding, ProgramDescriptor, ProgramHandle, RenderBackend,
    TextureDescriptor, TextureHandle, UniformValue,
};
use crate::render::camera::Viewport;

/// One backend call, in submission order
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    /// Viewport change
    SetViewport(Viewport),
    /// Program linked
    CreateProgram {
        /// Descriptor label
        label: String,
        /// Issued handle
        program: ProgramHandle,
    },
    /// Buffer created
    CreateBuffer {
        /// Descriptor label
        label: String,
        /// Issued handle
        buffer: BufferHandle,
        /// Initial size in bytes
        bytes: usize,
    },
    /// Texture uploaded
    CreateTexture {
        /// Descriptor label
        label: String,
        /// Issued handle
        texture: TextureHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Buffer contents replaced
    UpdateBuffer {
        /// Target buffer
        buffer: BufferHandle,
        /// New size in bytes
        bytes: usize,
    },
    /// Uniform accepted by a program
    SetUniform {
        /// Target program
        program: ProgramHandle,
        /// Uniform name
        name: String,
    },
    /// Blend state change
    SetBlend(Option<BlendState>),
    /// Draw submitted
    Draw {
        /// Label of the issuing render unit
        label: String,
        /// Program drawn with
        program: ProgramHandle,
    },
}

/// Snapshot of one draw
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Label of the issuing render unit
    pub label: String,
    /// Program drawn with
    pub program: ProgramHandle,
    /// Uniform values the program held at draw time
    pub uniforms: HashMap<String, UniformValue>,
    /// Blend state in effect
    pub blend: Option<BlendState>,
    /// Viewport in effect
    pub viewport: Viewport,
    /// Vertex enumeration
    pub index: IndexBinding,
}

impl DrawRecord {
    /// Uniform value at draw time
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}

#[derive(Debug)]
struct ProgramState {
    label: String,
    uniforms: HashMap<String, UniformValue>,
}

#[derive(Debug)]
struct TextureState {
    label: String,
    width: u32,
    height: u32,
}

#[derive(Debug)]
struct BufferState {
    usage: BufferUsage,
    bytes: usize,
}

/// Headless backend that records commands
#[derive(Debug)]
pub struct RecordingBackend {
    viewport: Viewport,
    blend: Option<BlendState>,
    next_id: u64,
    programs: HashMap<ProgramHandle, ProgramState>,
    buffers: HashMap<BufferHandle, BufferState>,
    textures: HashMap<TextureHandle, TextureState>,
    texture_keys: HashMap<u64, TextureHandle>,
    failing_programs: HashSet<String>,
    rejected_uniforms: HashSet<String>,
    commands: Vec<RecordedCommand>,
    draws: Vec<DrawRecord>,
}

impl RecordingBackend {
    /// Create a backend whose render target has the given viewport
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            blend: None,
            next_id: 1,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            texture_keys: HashMap::new(),
            failing_programs: HashSet::new(),
            rejected_uniforms: HashSet::new(),
            commands: Vec::new(),
            draws: Vec::new(),
        }
    }

    /// Make every future link of a program with this label fail
    pub fn fail_program(&mut self, label: impl Into<String>) {
        self.failing_programs.insert(label.into());
    }

    /// Stop failing programs with this label
    pub fn heal_program(&mut self, label: &str) {
        self.failing_programs.remove(label);
    }

    /// Make every program reject uniforms with this name
    pub fn reject_uniform(&mut self, name: impl Into<String>) {
        self.rejected_uniforms.insert(name.into());
    }

    /// Recorded commands since creation or the last [`clear_frame`](Self::clear_frame)
    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    /// Recorded draws since creation or the last [`clear_frame`](Self::clear_frame)
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Labels of the recorded draws, in order
    pub fn draw_labels(&self) -> Vec<&str> {
        self.draws.iter().map(|draw| draw.label.as_str()).collect()
    }

    /// Forget recorded commands and draws; resources are kept
    pub fn clear_frame(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Number of linked programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    /// Number of live buffers
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live textures
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Label and size a texture was uploaded with
    pub fn texture_info(&self, texture: TextureHandle) -> Option<(&str, u32, u32)> {
        self.textures
            .get(&texture)
            .map(|state| (state.label.as_str(), state.width, state.height))
    }

    /// Current size of a buffer in bytes
    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|state| state.bytes)
    }

    /// Label a program was linked with
    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(&program).map(|state| state.label.as_str())
    }

    /// Resolve one pixel covered by every recorded draw
    ///
    /// Each draw contributes its `color` (or `textColor`) uniform, blended
    /// onto the running result with the draw's blend state. Draws without a
    /// color uniform leave the pixel untouched.
    pub fn composite_pixel(&self, clear: Vec4) -> Vec4 {
        self.draws.iter().fold(clear, |destination, draw| {
            let source = draw
                .uniform(uniform_names::COLOR)
                .or_else(|| draw.uniform(uniform_names::TEXT_COLOR))
                .and_then(UniformValue::as_vec4);
            match (source, draw.blend) {
                (Some(source), Some(blend)) => blend.apply(source, destination),
                (Some(source), None) => source,
                (None, _) => destination,
            }
        })
    }

    fn issue_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(Viewport::default())
    }
}

impl RenderBackend for RecordingBackend {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.commands.push(RecordedCommand::SetViewport(viewport));
    }

    fn create_program(&mut self, descriptor: &ProgramDescriptor) -> BackendResult<ProgramHandle> {
        if self.failing_programs.contains(&descriptor.label) {
            log::debug!("Recording backend: failing program '{}'", descriptor.label);
            return Err(BackendError::ProgramBuild {
                label: descriptor.label.clone(),
                reason: "link failed".to_string(),
            });
        }

        let program = ProgramHandle(self.issue_id());
        self.programs.insert(program, ProgramState {
            label: descriptor.label.clone(),
            uniforms: HashMap::new(),
        });
        self.commands.push(RecordedCommand::CreateProgram {
            label: descriptor.label.clone(),
            program,
        });
        Ok(program)
    }

    fn create_buffer(&mut self, descriptor: &BufferDescriptor<'_>) -> BackendResult<BufferHandle> {
        if let BufferUsage::Vertex { components: 0 } = descriptor.usage {
            return Err(BackendError::BufferCreation {
                label: descriptor.label.to_string(),
                reason: "vertex buffer with zero components".to_string(),
            });
        }

        let buffer = BufferHandle(self.issue_id());
        self.buffers.insert(buffer, BufferState {
            usage: descriptor.usage,
            bytes: descriptor.data.len(),
        });
        self.commands.push(RecordedCommand::CreateBuffer {
            label: descriptor.label.to_string(),
            buffer,
            bytes: descriptor.data.len(),
        });
        Ok(buffer)
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> BackendResult<()> {
        let state = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::InvalidHandle { kind: "buffer", id: buffer.0 })?;
        state.bytes = data.len();
        self.commands.push(RecordedCommand::UpdateBuffer { buffer, bytes: data.len() });
        Ok(())
    }

    fn acquire_texture(&mut self, descriptor: &TextureDescriptor<'_>) -> BackendResult<TextureHandle> {
        if let Some(texture) = self.texture_keys.get(&descriptor.key) {
            return Ok(*texture);
        }

        let expected = descriptor.width as usize * descriptor.height as usize;
        if descriptor.pixels.len() != expected {
            return Err(BackendError::TextureCreation {
                label: descriptor.label.to_string(),
                reason: format!("{} bytes for {}x{} pixels", descriptor.pixels.len(), descriptor.width, descriptor.height),
            });
        }

        let texture = TextureHandle(self.issue_id());
        self.textures.insert(texture, TextureState {
            label: descriptor.label.to_string(),
            width: descriptor.width,
            height: descriptor.height,
        });
        self.texture_keys.insert(descriptor.key, texture);
        self.commands.push(RecordedCommand::CreateTexture {
            label: descriptor.label.to_string(),
            texture,
            width: descriptor.width,
            height: descriptor.height,
        });
        Ok(texture)
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: &UniformValue) -> BackendResult<()> {
        if let UniformValue::Texture(texture) = value {
            if !self.textures.contains_key(texture) {
                return Err(BackendError::InvalidHandle { kind: "texture", id: texture.0 });
            }
        }

        let state = self
            .programs
            .get_mut(&program)
            .ok_or(BackendError::InvalidHandle { kind: "program", id: program.0 })?;

        if self.rejected_uniforms.contains(name) {
            return Err(BackendError::UnknownUniform(name.to_string()));
        }
        if let Some(previous) = state.uniforms.get(name) {
            if previous.kind() != value.kind() {
                return Err(BackendError::UniformTypeMismatch {
                    name: name.to_string(),
                    expected: previous.kind(),
                    actual: value.kind(),
                });
            }
        }

        state.uniforms.insert(name.to_string(), *value);
        self.commands.push(RecordedCommand::SetUniform { program, name: name.to_string() });
        Ok(())
    }

    fn set_blend_state(&mut self, blend: Option<BlendState>) {
        if self.blend != blend {
            self.blend = blend;
            self.commands.push(RecordedCommand::SetBlend(blend));
        }
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> BackendResult<()> {
        let state = self
            .programs
            .get(&call.program)
            .ok_or(BackendError::InvalidHandle { kind: "program", id: call.program.0 })?;

        for binding in call.vertex_buffers {
            match self.buffers.get(&binding.buffer) {
                Some(BufferState { usage: BufferUsage::Vertex { .. }, .. }) => {}
                Some(_) => {
                    return Err(BackendError::Draw(format!(
                        "buffer {} bound to '{}' is not a vertex buffer",
                        binding.buffer.0, binding.attribute
                    )))
                }
                None => return Err(BackendError::InvalidHandle { kind: "buffer", id: binding.buffer.0 }),
            }
        }
        if let IndexBinding::Buffer { buffer, .. } = call.index {
            if !self.buffers.contains_key(&buffer) {
                return Err(BackendError::InvalidHandle { kind: "buffer", id: buffer.0 });
            }
        }

        self.draws.push(DrawRecord {
            label: call.label.to_string(),
            program: call.program,
            uniforms: state.uniforms.clone(),
            blend: self.blend,
            viewport: self.viewport,
            index: call.index,
        });
        self.commands.push(RecordedCommand::Draw {
            label: call.label.to_string(),
            program: call.program,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4;
    use crate::render::api::AttributeMap;
    use approx::assert_relative_eq;

    fn program(backend: &mut RecordingBackend, label: &str) -> ProgramHandle {
        let descriptor = ProgramDescriptor::new(label, "", "", AttributeMap::new());
        backend.create_program(&descriptor).expect("program")
    }

    fn draw(backend: &mut RecordingBackend, program: ProgramHandle, label: &str) {
        let call = DrawCall {
            program,
            label,
            vertex_buffers: &[],
            index: IndexBinding::Zero { count: 3 },
            primitive: Default::default(),
        };
        backend.draw(&call).expect("draw");
    }

    #[test]
    fn test_forced_program_failure() {
        let mut backend = RecordingBackend::default();
        backend.fail_program("broken");

        let descriptor = ProgramDescriptor::new("broken", "", "", AttributeMap::new());
        assert!(matches!(backend.create_program(&descriptor), Err(BackendError::ProgramBuild { .. })));
        assert_eq!(backend.program_count(), 0);

        backend.heal_program("broken");
        assert!(backend.create_program(&descriptor).is_ok());
    }

    #[test]
    fn test_uniform_type_is_fixed_by_first_value() {
        let mut backend = RecordingBackend::default();
        let program = program(&mut backend, "p");

        backend
            .set_uniform(program, "modelMatrix", &UniformValue::Mat4(Mat4::identity()))
            .expect("first value");
        let result = backend.set_uniform(program, "modelMatrix", &UniformValue::Float(1.0));
        assert!(matches!(result, Err(BackendError::UniformTypeMismatch { .. })));
    }

    #[test]
    fn test_draw_snapshots_uniforms() {
        let mut backend = RecordingBackend::default();
        let program = program(&mut backend, "p");

        backend.set_uniform(program, "color", &UniformValue::Float(1.0)).expect("uniform");
        draw(&mut backend, program, "first");
        backend.set_uniform(program, "color", &UniformValue::Float(2.0)).expect("uniform");
        draw(&mut backend, program, "second");

        let values: Vec<_> = backend.draws().iter().map(|d| d.uniform("color").copied()).collect();
        assert_eq!(values, vec![Some(UniformValue::Float(1.0)), Some(UniformValue::Float(2.0))]);
    }

    #[test]
    fn test_unknown_handles_are_rejected() {
        let mut backend = RecordingBackend::default();
        let result = backend.update_buffer(BufferHandle(99), &[0; 4]);
        assert_eq!(result, Err(BackendError::InvalidHandle { kind: "buffer", id: 99 }));
    }

    #[test]
    fn test_composite_uses_each_draw_blend() {
        let mut backend = RecordingBackend::default();
        let a = program(&mut backend, "a");
        let b = program(&mut backend, "b");

        backend.set_uniform(a, "color", &UniformValue::Vec4(Vec4::new(1.0, 0.0, 0.0, 1.0))).expect("a");
        backend.set_blend_state(None);
        draw(&mut backend, a, "a");

        backend.set_uniform(b, "color", &UniformValue::Vec4(Vec4::new(0.0, 0.0, 1.0, 0.5))).expect("b");
        backend.set_blend_state(Some(BlendState::source_over()));
        draw(&mut backend, b, "b");

        let pixel = backend.composite_pixel(Vec4::zeros());
        assert_relative_eq!(pixel.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(pixel.z, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_textures_are_shared_by_key() {
        let mut backend = RecordingBackend::default();
        let pixels = [0u8, 128, 255, 64];
        let descriptor = TextureDescriptor { label: "atlas", key: 7, width: 2, height: 2, pixels: &pixels };

        let first = backend.acquire_texture(&descriptor).expect("upload");
        let second = backend.acquire_texture(&descriptor).expect("reuse");
        assert_eq!(first, second);
        assert_eq!(backend.texture_count(), 1);
        assert_eq!(backend.texture_info(first), Some(("atlas", 2, 2)));

        let other = backend
            .acquire_texture(&TextureDescriptor { key: 8, ..descriptor })
            .expect("second texture");
        assert_ne!(first, other);
        let uploads = backend
            .commands()
            .iter()
            .filter(|command| matches!(command, RecordedCommand::CreateTexture { .. }))
            .count();
        assert_eq!(uploads, 2);
    }

    #[test]
    fn test_texture_size_must_match_pixels() {
        let mut backend = RecordingBackend::default();
        let result = backend.acquire_texture(&TextureDescriptor {
            label: "atlas",
            key: 1,
            width: 4,
            height: 4,
            pixels: &[0; 3],
        });
        assert!(matches!(result, Err(BackendError::TextureCreation { .. })));
        assert_eq!(backend.texture_count(), 0);
    }

    #[test]
    fn test_unissued_texture_uniform_is_rejected() {
        let mut backend = RecordingBackend::default();
        let program = program(&mut backend, "p");

        let result = backend.set_uniform(program, "glyphTexture", &UniformValue::Texture(TextureHandle(42)));
        assert_eq!(result, Err(BackendError::InvalidHandle { kind: "texture", id: 42 }));

        let texture = backend
            .acquire_texture(&TextureDescriptor { label: "t", key: 3, width: 1, height: 1, pixels: &[255] })
            .expect("upload");
        backend
            .set_uniform(program, "glyphTexture", &UniformValue::Texture(texture))
            .expect("issued texture");
    }
}
