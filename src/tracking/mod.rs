//! Tracking module
//!
//! The face-tracking and camera collaborator seen by the frame driver:
//! - Per-frame face snapshots (state, landmark region poses, face mesh)
//! - The `ArSession` trait and the frame it produces
//! - A deterministic synthetic session for the viewer, CLI and tests

pub mod face;
pub mod session;
pub mod synthetic;

pub use face::{FaceMesh, Pose, RegionPoses, RegionType, TrackedFace, TrackingState};
pub use session::{ArSession, Camera, CameraImage, DisplayRotation, Frame, BACKGROUND_NDC};
pub use synthetic::SyntheticSession;
