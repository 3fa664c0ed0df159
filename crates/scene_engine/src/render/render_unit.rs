//! Render unit: one shader program, its uniform values and one draw
//!
//! A render unit is owned outright by the node that draws it. It starts
//! pending, acquires its program and buffers once in
//! [`RenderUnit::initialize`], and then issues one draw per
//! [`RenderUnit::render`] call.

use crate::render::api::{
    BlendState, BufferDescriptor, BufferHandle, BufferUsage, DrawCall, GeometryModel,
    IndexBinding, IndexSource, Primitive, ProgramDescriptor, ProgramHandle, RenderBackend,
    UniformValue, VertexBinding,
};
use crate::render::RenderError;

/// GPU objects held by an initialized unit
#[derive(Debug, Clone)]
struct GpuBindings {
    program: ProgramHandle,
    vertex_buffers: Vec<VertexBinding>,
    semantics: Vec<String>,
    index: IndexBinding,
    primitive: Primitive,
}

#[derive(Debug, Clone)]
enum UnitState {
    Pending,
    Ready(GpuBindings),
    Failed(String),
}

/// Shader program plus uniform values and blend configuration
#[derive(Debug, Clone)]
pub struct RenderUnit {
    descriptor: ProgramDescriptor,
    blend: Option<BlendState>,
    uniforms: Vec<(String, UniformValue)>,
    state: UnitState,
}

impl RenderUnit {
    /// Create a pending unit; nothing is allocated until [`initialize`](Self::initialize)
    pub fn new(descriptor: ProgramDescriptor, blend: Option<BlendState>) -> Self {
        Self {
            descriptor,
            blend,
            uniforms: Vec::new(),
            state: UnitState::Pending,
        }
    }

    /// Program label
    pub fn label(&self) -> &str {
        &self.descriptor.label
    }

    /// Whether the program and buffers have been acquired
    pub fn is_ready(&self) -> bool {
        matches!(self.state, UnitState::Ready(_))
    }

    /// Reason of the last failed initialization, if any
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            UnitState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Linked program handle once initialized
    pub fn program(&self) -> Option<ProgramHandle> {
        match &self.state {
            UnitState::Ready(bindings) => Some(bindings.program),
            _ => None,
        }
    }

    /// Blend configuration applied before each draw
    pub fn blend(&self) -> Option<BlendState> {
        self.blend
    }

    /// Acquire the program and the buffers named by the attribute map
    ///
    /// A ready unit returns immediately without touching the backend. A
    /// failed unit tries again from scratch.
    ///
    /// # Errors
    /// [`RenderError::ResourceAcquisition`] when the program does not build,
    /// the model lacks a semantic, or a buffer cannot be created.
    pub fn initialize(
        &mut self,
        backend: &mut dyn RenderBackend,
        model: &dyn GeometryModel,
    ) -> Result<(), RenderError> {
        if self.is_ready() {
            return Ok(());
        }

        match self.acquire(backend, model) {
            Ok(bindings) => {
                log::debug!(
                    "Render unit '{}' ready: program {:?}, {} vertex buffer(s)",
                    self.descriptor.label,
                    bindings.program,
                    bindings.vertex_buffers.len()
                );
                self.state = UnitState::Ready(bindings);
                Ok(())
            }
            Err(err) => {
                self.state = UnitState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    fn acquire(
        &self,
        backend: &mut dyn RenderBackend,
        model: &dyn GeometryModel,
    ) -> Result<GpuBindings, RenderError> {
        let label = &self.descriptor.label;
        let acquisition = |reason: String| RenderError::ResourceAcquisition {
            resource: label.clone(),
            reason,
        };

        let program = backend
            .create_program(&self.descriptor)
            .map_err(|e| acquisition(e.to_string()))?;

        let mut vertex_buffers = Vec::with_capacity(self.descriptor.attributes.len());
        let mut semantics = Vec::with_capacity(self.descriptor.attributes.len());
        for (attribute, semantic) in self.descriptor.attributes.iter() {
            let data = model
                .vertex_attribute(semantic)
                .ok_or_else(|| acquisition(format!("model has no '{semantic}' buffer")))?;
            let buffer = backend
                .create_buffer(&BufferDescriptor {
                    label: semantic,
                    usage: BufferUsage::Vertex { components: data.components },
                    data: data.bytes(),
                })
                .map_err(|e| acquisition(e.to_string()))?;

            vertex_buffers.push(VertexBinding {
                attribute: attribute.to_string(),
                buffer,
                components: data.components,
            });
            semantics.push(semantic.to_string());
        }

        let index = match model.index_source() {
            IndexSource::Zero { count } => IndexBinding::Zero { count },
            IndexSource::Indexed(indices) => {
                let buffer = create_index_buffer(backend, label, indices)
                    .map_err(|e| acquisition(e.to_string()))?;
                IndexBinding::Buffer { buffer, count: indices.len() as u32 }
            }
        };

        Ok(GpuBindings {
            program,
            vertex_buffers,
            semantics,
            index,
            primitive: model.primitive(),
        })
    }

    /// Re-upload buffer contents after the model changed
    ///
    /// Cached handles are kept; only their contents and the element count
    /// change.
    ///
    /// # Errors
    /// [`RenderError::UninitializedResource`] before initialization, or the
    /// backend error of a failed upload.
    pub fn refresh_buffers(
        &mut self,
        backend: &mut dyn RenderBackend,
        model: &dyn GeometryModel,
    ) -> Result<(), RenderError> {
        let label = self.descriptor.label.clone();
        let UnitState::Ready(bindings) = &mut self.state else {
            return Err(RenderError::UninitializedResource { resource: label });
        };

        for (binding, semantic) in bindings.vertex_buffers.iter().zip(&bindings.semantics) {
            let data = model.vertex_attribute(semantic).ok_or_else(|| RenderError::ResourceAcquisition {
                resource: label.clone(),
                reason: format!("model no longer has a '{semantic}' buffer"),
            })?;
            backend.update_buffer(binding.buffer, data.bytes())?;
        }

        bindings.index = match (model.index_source(), bindings.index) {
            (IndexSource::Zero { count }, _) => IndexBinding::Zero { count },
            (IndexSource::Indexed(indices), IndexBinding::Buffer { buffer, .. }) => {
                backend.update_buffer(buffer, bytemuck::cast_slice(indices))?;
                IndexBinding::Buffer { buffer, count: indices.len() as u32 }
            }
            (IndexSource::Indexed(indices), IndexBinding::Zero { .. }) => {
                let buffer = create_index_buffer(backend, &label, indices)?;
                IndexBinding::Buffer { buffer, count: indices.len() as u32 }
            }
        };

        log::trace!("Render unit '{}' buffers refreshed", label);
        Ok(())
    }

    /// Set a uniform value; it is sent to the program on the next draw
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        let value = value.into();
        match self.uniforms.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => self.uniforms.push((name.to_string(), value)),
        }
    }

    /// Current value of a uniform
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Push all uniforms, apply the blend state and issue the draw
    ///
    /// Uniforms the program rejects are logged and counted; they never stop
    /// the draw. Returns the number of rejected uniforms.
    ///
    /// # Errors
    /// [`RenderError::UninitializedResource`] when called before a successful
    /// initialization, or [`RenderError::Backend`] when the draw itself fails.
    pub fn render(&mut self, backend: &mut dyn RenderBackend) -> Result<usize, RenderError> {
        let UnitState::Ready(bindings) = &self.state else {
            return Err(RenderError::UninitializedResource {
                resource: self.descriptor.label.clone(),
            });
        };

        let mut rejected = 0;
        for (name, value) in &self.uniforms {
            if let Err(source) = backend.set_uniform(bindings.program, name, value) {
                let err = RenderError::UniformBinding { uniform: name.clone(), source };
                log::warn!("Render unit '{}': {}", self.descriptor.label, err);
                rejected += 1;
            }
        }

        backend.set_blend_state(self.blend);
        backend.draw(&DrawCall {
            program: bindings.program,
            label: &self.descriptor.label,
            vertex_buffers: &bindings.vertex_buffers,
            index: bindings.index,
            primitive: bindings.primitive,
        })?;

        log::trace!(
            "Render unit '{}' drew {} element(s)",
            self.descriptor.label,
            bindings.index.element_count()
        );
        Ok(rejected)
    }
}

fn create_index_buffer(
    backend: &mut dyn RenderBackend,
    label: &str,
    indices: &[u32],
) -> Result<BufferHandle, RenderError> {
    let buffer = backend.create_buffer(&BufferDescriptor {
        label,
        usage: BufferUsage::Index,
        data: bytemuck::cast_slice(indices),
    })?;
    Ok(buffer)
}
