//! # Unified Configuration System
//!
//! Configuration structures for the engine, the scene renderer and the
//! initial camera. Every section has defaults, so a partial file only needs
//! to name the values it changes.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging and debug features
//! - **Renderer Config**: default viewport, initialization retry policy, clear color, label font
//! - **Camera Config**: pose and projection of the frame driver's camera

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};
use crate::render::camera::{ViewType, Viewport};

/// # Engine Configuration
///
/// Core engine behavior configuration including logging and debug features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter, overridden by `RUST_LOG`
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable debug mode
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug_mode = enabled;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Renderer Configuration
///
/// Settings of the scene renderer and the frame driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Viewport used when the platform does not report one
    pub default_viewport: Viewport,
    /// How many times a node may try to acquire its resources before it is
    /// skipped for good. `1` means a single failure is permanent.
    pub max_init_attempts: u32,
    /// Framebuffer clear color (RGBA)
    pub clear_color: [f32; 4],
    /// TrueType/OpenType face for labels; the builtin face when absent
    pub font_path: Option<PathBuf>,
    /// Rasterization size of the label face in pixels
    pub font_size: f32,
}

impl RendererConfig {
    /// Set the retry budget for node initialization
    pub fn with_max_init_attempts(mut self, attempts: u32) -> Self {
        self.max_init_attempts = attempts;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_init_attempts == 0 {
            return Err(ConfigError::Invalid("max_init_attempts must be at least 1".to_string()));
        }
        if self.default_viewport.width == 0 || self.default_viewport.height == 0 {
            return Err(ConfigError::Invalid("default_viewport must not be empty".to_string()));
        }
        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(ConfigError::Invalid("clear_color components must be in [0, 1]".to_string()));
        }
        if !(self.font_size > 0.0 && self.font_size.is_finite()) {
            return Err(ConfigError::Invalid(format!("font_size {} must be positive", self.font_size)));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            default_viewport: Viewport::default(),
            max_init_attempts: 1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            font_path: None,
            font_size: 24.0,
        }
    }
}

/// # Camera Configuration
///
/// Initial pose and projection of the frame driver's camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Eye position in world space
    pub position: [f32; 3],
    /// Point the camera looks at
    pub target: [f32; 3],
    /// Vertical field of view in degrees (perspective only)
    pub fov_degrees: f32,
    /// Near clipping plane
    pub near: f32,
    /// Far clipping plane
    pub far: f32,
    /// View preset applied after placing the camera
    pub view_type: ViewType,
    /// Orthographic half height; perspective projection when absent
    pub orthographic_half_height: Option<f32>,
}

impl CameraConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near <= 0.0 || self.far <= self.near {
            return Err(ConfigError::Invalid(format!(
                "camera clip planes must satisfy 0 < near < far (near = {}, far = {})",
                self.near, self.far
            )));
        }
        if self.orthographic_half_height.is_none() && !(1.0..179.0).contains(&self.fov_degrees) {
            return Err(ConfigError::Invalid(format!("fov_degrees {} out of range", self.fov_degrees)));
        }
        if matches!(self.orthographic_half_height, Some(h) if h <= 0.0) {
            return Err(ConfigError::Invalid("orthographic_half_height must be positive".to_string()));
        }
        if self.position == self.target {
            return Err(ConfigError::Invalid("camera position and target coincide".to_string()));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 3.0, 8.0],
            target: [0.0, 0.0, 0.0],
            fov_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
            view_type: ViewType::UserView,
            orthographic_half_height: None,
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Scene renderer configuration
    pub renderer: RendererConfig,
    /// Initial camera
    pub camera: CameraConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()?;
        self.camera.validate()?;
        Ok(())
    }
}

impl Config for ApplicationConfig {}
