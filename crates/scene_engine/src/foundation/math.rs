//! Math utilities and types
//!
//! Provides the vector, matrix and transform types used by the scene graph.
//! All matrices are column-major and right-handed.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Local transform of a scene node: translation, rotation and scale
///
/// Composited in TRS order, so scale is applied first and translation last.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,

    /// Per-axis scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only a translation
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Builder pattern: set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: set rotation
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder pattern: set rotation from an axis and an angle in radians
    pub fn with_rotation_axis_angle(mut self, axis: Vec3, angle: f32) -> Self {
        self.rotation = Quat::from_axis_angle(&Unit::new_normalize(axis), angle);
        self
    }

    /// Builder pattern: set per-axis scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: set uniform scale
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Convert to a model matrix (T * R * S)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Extract the translation column of an affine matrix
///
/// Rotation and scale held in the upper 3x3 block are ignored.
pub fn translation_of(matrix: &Mat4) -> Vec3 {
    Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)])
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }
}

/// Extension trait for Mat4 with camera matrix constructors
pub trait Mat4Ext {
    /// Right-handed perspective projection mapping depth to [-1, 1]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed orthographic projection mapping depth to [-1, 1]
    fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -(2.0 * far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn orthographic(half_width: f32, half_height: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(-half_width, half_width, -half_height, half_height, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }
}
