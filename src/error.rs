//! Error types for arface

use thiserror::Error;

/// Main error type for arface
#[derive(Error, Debug)]
pub enum ArFaceError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors reported by the tracking/camera session collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The device lacks the face-tracking capability
    #[error("Face tracking is not supported on this device: {0}")]
    Unsupported(String),

    /// Camera access was not granted
    #[error("Camera permission denied")]
    PermissionDenied,

    /// The tracking runtime is being installed; retry on the next resume
    #[error("Tracking runtime installation requested")]
    InstallRequested,

    /// Any other session failure, named by its kind
    #[error("AR failure: {0}")]
    Failure(String),

    /// The per-frame update failed
    #[error("Frame update failed: {0}")]
    FrameUpdate(String),
}

/// Per-frame overlay failures (swallowed at frame granularity)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OverlayError {
    #[error("Malformed face mesh: {0}")]
    MalformedMesh(String),

    #[error("Mesh index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u16, vertex_count: usize },

    #[error("Non-finite {0} matrix")]
    NonFinite(&'static str),
}

/// GPU resource errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Shader or pipeline creation failed: {0}")]
    Pipeline(String),

    #[error("GPU resources are not initialized")]
    NotInitialized,

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request GPU device: {0}")]
    Device(String),

    #[error("Frame readback failed: {0}")]
    Readback(String),
}

/// Texture asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),
}

/// Result type alias for arface operations
pub type Result<T> = std::result::Result<T, ArFaceError>;
