//! arface - AR face filter engine
//!
//! Overlays textured content on a tracked face, frame by frame:
//! - Rigid billboards (glasses, a text label, a mask) anchored to facial
//!   landmarks and scaled by the measured face width
//! - Face paint on the tracker's deforming face mesh
//! - A frame driver that isolates per-frame failures and cycles filters
//! - wgpu rendering with an optional native viewer window

pub mod config;
pub mod draw;
pub mod driver;
pub mod error;
pub mod notice;
pub mod overlay;
pub mod render;
pub mod tracking;

#[cfg(feature = "native-ui")]
pub mod ui;

pub use config::Config;
pub use driver::{DriverState, FrameDriver, FrameReport, Viewport};
pub use error::{ArFaceError, Result};
pub use overlay::FilterMode;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
