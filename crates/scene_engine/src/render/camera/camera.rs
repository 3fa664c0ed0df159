//! # 3D Camera
//!
//! Observer description that produces the camera contexts pushed onto the
//! camera stack.
//!
//! ## Coordinate System
//! Right-handed, Y-up world space. The view matrix looks down -Z in view
//! space and projections map depth to [-1, 1].

use serde::{Deserialize, Serialize};

use crate::core::config::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use super::context::{CameraContext, Viewport};

/// Canonical viewing directions a camera can snap to
///
/// `UserView` keeps whatever pose the camera currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewType {
    /// Free pose chosen by the user
    #[default]
    UserView,
    /// Looking down the -Y axis from above
    Top,
    /// Looking up the +Y axis from below
    Bottom,
    /// Looking along +X from the left side
    Left,
    /// Looking along -X from the right side
    Right,
    /// Looking along -Z from the front
    Front,
    /// Looking along +Z from behind
    Back,
}

impl ViewType {
    /// Direction from target to eye and the up vector for this preset
    fn eye_direction_and_up(self) -> Option<(Vec3, Vec3)> {
        let x = Vec3::x();
        let y = Vec3::y();
        let z = Vec3::z();
        match self {
            Self::UserView => None,
            Self::Top => Some((y, -z)),
            Self::Bottom => Some((-y, z)),
            Self::Left => Some((-x, y)),
            Self::Right => Some((x, y)),
            Self::Front => Some((z, y)),
            Self::Back => Some((-z, y)),
        }
    }
}

/// Projection model used by a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionKind {
    /// Perspective projection with a vertical field of view in radians
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
    },
    /// Orthographic projection covering `half_height` world units above and below the center
    Orthographic {
        /// Half of the visible height in world units
        half_height: f32,
    },
}

/// 3D camera for perspective and orthographic projections
///
/// Matrices are computed on demand. The aspect ratio is taken from the
/// viewport when a context is built, so a resized window only needs a new
/// viewport.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Projection model
    pub projection: ProjectionKind,

    /// Aspect ratio used when no viewport is available
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    view_type: ViewType,
}

impl Camera {
    /// Create a new perspective camera looking at the origin
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Fallback aspect ratio (width / height)
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            projection: ProjectionKind::Perspective { fov_y: utils::deg_to_rad(fov_degrees) },
            aspect,
            near,
            far,
            view_type: ViewType::UserView,
        }
    }

    /// Create a new orthographic camera looking at the origin
    pub fn orthographic(position: Vec3, half_height: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            projection: ProjectionKind::Orthographic { half_height },
            ..Self::perspective(position, 45.0, aspect, near, far)
        }
    }

    /// Build a camera from its configuration section
    pub fn from_config(config: &CameraConfig) -> Self {
        let position = Vec3::from(config.position);
        let mut camera = match config.orthographic_half_height {
            Some(half_height) => Self::orthographic(position, half_height, 16.0 / 9.0, config.near, config.far),
            None => Self::perspective(position, config.fov_degrees, 16.0 / 9.0, config.near, config.far),
        };
        camera.target = Vec3::from(config.target);
        camera.set_view_type(config.view_type);
        camera
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.view_type = ViewType::UserView;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Configure camera to look at a specific point with custom up vector
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        self.view_type = ViewType::UserView;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Snap the camera to a canonical view around its current target
    ///
    /// The distance to the target is preserved. `UserView` only records the
    /// view type and leaves the pose untouched.
    pub fn set_view_type(&mut self, view_type: ViewType) {
        if let Some((direction, up)) = view_type.eye_direction_and_up() {
            let distance = (self.position - self.target).norm();
            let distance = if distance > f32::EPSILON { distance } else { 1.0 };
            self.position = self.target + direction * distance;
            self.up = up;
            log::debug!("Camera snapped to {:?} view at distance {:.3}", view_type, distance);
        }
        self.view_type = view_type;
    }

    /// Current view preset
    pub fn view_type(&self) -> ViewType {
        self.view_type
    }

    /// Generate the world-to-view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Generate the projection matrix for a given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        match self.projection {
            ProjectionKind::Perspective { fov_y } => Mat4::perspective(fov_y, aspect, self.near, self.far),
            ProjectionKind::Orthographic { half_height } => {
                Mat4::orthographic(half_height * aspect, half_height, self.near, self.far)
            }
        }
    }

    /// Build the camera context for a viewport
    ///
    /// The aspect ratio comes from the viewport; a degenerate viewport falls
    /// back to the camera's stored aspect.
    pub fn context(&self, viewport: Viewport) -> CameraContext {
        let aspect = viewport.aspect_ratio().unwrap_or(self.aspect);
        CameraContext::new(self.projection_matrix(aspect), self.view_matrix(), viewport)
    }
}

impl Default for Camera {
    /// Perspective camera above and behind the origin, 45 degree FOV
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 3.0),
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            projection: ProjectionKind::Perspective { fov_y: std::f32::consts::FRAC_PI_4 },
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            view_type: ViewType::UserView,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_top_view_looks_straight_down() {
        let mut camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 60.0, 1.0, 0.1, 100.0);
        camera.set_view_type(ViewType::Top);

        assert_relative_eq!(camera.position, Vec3::new(0.0, 5.0, 0.0), epsilon = 1e-5);

        // The target ends up straight ahead on the view axis
        let target_in_view = camera.view_matrix().transform_point(&Point3::origin());
        assert_relative_eq!(target_in_view, Point3::new(0.0, 0.0, -5.0), epsilon = 1e-5);
    }

    #[test]
    fn test_user_view_keeps_pose() {
        let mut camera = Camera::perspective(Vec3::new(1.0, 2.0, 3.0), 60.0, 1.0, 0.1, 100.0);
        camera.set_view_type(ViewType::UserView);
        assert_eq!(camera.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_moving_camera_returns_to_user_view() {
        let mut camera = Camera::default();
        camera.set_view_type(ViewType::Front);
        assert_eq!(camera.view_type(), ViewType::Front);

        camera.set_position(Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(camera.view_type(), ViewType::UserView);
    }

    #[test]
    fn test_context_uses_viewport_aspect() {
        let camera = Camera::perspective(Vec3::new(0.0, 0.0, 5.0), 90.0, 1.0, 0.1, 100.0);
        let context = camera.context(Viewport::from_size(400, 200));

        // With a 90 degree FOV the horizontal scale is 1 / aspect
        assert_relative_eq!(context.projection[(0, 0)], 0.5, epsilon = 1e-5);
        assert_relative_eq!(context.projection[(1, 1)], 1.0, epsilon = 1e-5);
        assert_eq!(context.viewport, Viewport::from_size(400, 200));
    }
}
