//! Mesh node: static geometry drawn with one or more render units

use std::any::Any;

use crate::foundation::math::Vec4;
use crate::render::api::{
    uniform_names, AttributeMap, BlendState, GeometryModel, ProgramDescriptor, RenderBackend,
    StaticModel,
};
use crate::render::{RenderError, RenderUnit};
use crate::scene::node::{NodeBehavior, RenderArgs};

const FLAT_VERTEX_SHADER: &str = r#"#version 330 core
in vec3 in_Position;

uniform mat4 projectionMatrix;
uniform mat4 viewMatrix;
uniform mat4 modelMatrix;

void main() {
    gl_Position = projectionMatrix * viewMatrix * modelMatrix * vec4(in_Position, 1.0);
}
"#;

const FLAT_FRAGMENT_SHADER: &str = r#"#version 330 core
uniform vec4 color;

out vec4 outColor;

void main() {
    outColor = color;
}
"#;

/// Flat-colored program reading only the `position` semantic
pub fn flat_program(label: impl Into<String>) -> ProgramDescriptor {
    ProgramDescriptor::new(
        label,
        FLAT_VERTEX_SHADER,
        FLAT_FRAGMENT_SHADER,
        AttributeMap::new().with("in_Position", "position"),
    )
}

/// Geometry node with per-unit camera, model and color uniforms
#[derive(Debug, Clone)]
pub struct MeshNode {
    name: String,
    model: StaticModel,
    units: Vec<RenderUnit>,
    color: Vec4,
}

impl MeshNode {
    /// Create a mesh drawn once with the flat program, labelled `name`
    pub fn new(name: impl Into<String>, model: StaticModel, color: Vec4, blend: Option<BlendState>) -> Self {
        let name = name.into();
        let unit = RenderUnit::new(flat_program(name.clone()), blend);
        Self { name, model, units: vec![unit], color }
    }

    /// Builder pattern: draw the same geometry again with another program
    pub fn with_unit(mut self, descriptor: ProgramDescriptor, blend: Option<BlendState>) -> Self {
        self.units.push(RenderUnit::new(descriptor, blend));
        self
    }

    /// Set the `color` uniform of every unit
    pub fn set_color(&mut self, color: Vec4) {
        self.color = color;
    }

    /// Current color
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Render units in draw order
    pub fn units(&self) -> &[RenderUnit] {
        &self.units
    }

    /// Geometry source
    pub fn model(&self) -> &dyn GeometryModel {
        &self.model
    }
}

impl NodeBehavior for MeshNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&mut self, backend: &mut dyn RenderBackend) -> Result<(), RenderError> {
        for unit in &mut self.units {
            unit.initialize(backend, &self.model)?;
        }
        Ok(())
    }

    fn render_before_children(&mut self, args: &mut RenderArgs<'_>) -> Result<(), RenderError> {
        let camera = args.camera()?.clone();
        let model = *args.world_matrix();

        for unit in &mut self.units {
            unit.set_uniform(uniform_names::PROJECTION_MATRIX, camera.projection);
            unit.set_uniform(uniform_names::VIEW_MATRIX, camera.view);
            unit.set_uniform(uniform_names::MODEL_MATRIX, model);
            unit.set_uniform(uniform_names::COLOR, self.color);
            args.draw(unit)?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
