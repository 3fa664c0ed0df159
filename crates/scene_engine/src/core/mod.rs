//! # Core Engine Module
//!
//! Shared configuration for the engine subsystems.

pub mod config;

pub use config::{
    ApplicationConfig,
    CameraConfig,
    Config,
    ConfigError,
    EngineConfig,
    RendererConfig,
};
