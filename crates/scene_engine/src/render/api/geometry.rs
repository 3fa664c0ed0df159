//! Geometry models: CPU-side vertex data looked up by semantic name

use std::collections::HashMap;

use super::render_backend::Primitive;

/// Per-vertex data for one semantic
#[derive(Debug, Clone, Copy)]
pub struct VertexAttribute<'a> {
    /// Floats per vertex
    pub components: u32,
    /// Tightly packed data, `components` floats per vertex
    pub data: &'a [f32],
}

impl<'a> VertexAttribute<'a> {
    /// Raw bytes for upload
    pub fn bytes(&self) -> &'a [u8] {
        bytemuck::cast_slice(self.data)
    }

    /// Number of vertices described
    pub fn vertex_count(&self) -> usize {
        if self.components == 0 {
            0
        } else {
            self.data.len() / self.components as usize
        }
    }
}

/// How a model enumerates its vertices
#[derive(Debug, Clone, Copy)]
pub enum IndexSource<'a> {
    /// Sequential vertices `0..count`
    Zero {
        /// Number of vertices
        count: u32,
    },
    /// Explicit 32-bit indices
    Indexed(&'a [u32]),
}

/// Source of vertex and index data for a render unit
///
/// Render units query a model once during initialization, create backend
/// buffers from it and cache the handles. Models that change (such as text)
/// are re-read through [`RenderUnit::refresh_buffers`](crate::render::RenderUnit::refresh_buffers).
pub trait GeometryModel {
    /// Data for a semantic such as `"position"`, if the model provides it
    fn vertex_attribute(&self, semantic: &str) -> Option<VertexAttribute<'_>>;

    /// Vertex enumeration
    fn index_source(&self) -> IndexSource<'_>;

    /// Primitive assembly mode
    fn primitive(&self) -> Primitive {
        Primitive::Triangles
    }
}

/// Immutable model built from plain vectors
#[derive(Debug, Clone, Default)]
pub struct StaticModel {
    attributes: HashMap<String, (u32, Vec<f32>)>,
    indices: Option<Vec<u32>>,
    vertex_count: u32,
}

impl StaticModel {
    /// Empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: add vertex data for a semantic
    ///
    /// The vertex count of the model is taken from the first attribute added.
    pub fn with_attribute(mut self, semantic: impl Into<String>, components: u32, data: Vec<f32>) -> Self {
        let attribute = VertexAttribute { components, data: &data };
        if self.attributes.is_empty() {
            self.vertex_count = attribute.vertex_count() as u32;
        }
        self.attributes.insert(semantic.into(), (components, data));
        self
    }

    /// Builder pattern: draw through an index list
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }

    /// Unit quad in the XY plane centered at the origin, with uvs
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        Self::new()
            .with_attribute("position", 3, vec![
                -h, -h, 0.0,
                 h, -h, 0.0,
                 h,  h, 0.0,
                -h,  h, 0.0,
            ])
            .with_attribute("uv", 2, vec![
                0.0, 0.0,
                1.0, 0.0,
                1.0, 1.0,
                0.0, 1.0,
            ])
            .with_indices(vec![0, 1, 2, 0, 2, 3])
    }
}

impl GeometryModel for StaticModel {
    fn vertex_attribute(&self, semantic: &str) -> Option<VertexAttribute<'_>> {
        self.attributes
            .get(semantic)
            .map(|(components, data)| VertexAttribute { components: *components, data })
    }

    fn index_source(&self) -> IndexSource<'_> {
        match &self.indices {
            Some(indices) => IndexSource::Indexed(indices),
            None => IndexSource::Zero { count: self.vertex_count },
        }
    }
}
