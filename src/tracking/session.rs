//! Session collaborator interface: camera state, per-frame update and the
//! tracked faces it exposes.

use glam::Mat4;

use super::face::TrackedFace;
use crate::error::SessionError;

/// Device display rotation relative to the camera sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayRotation {
    #[default]
    Rotation0,
    Rotation90,
    Rotation180,
    Rotation270,
}

/// NDC corners of the background quad, triangle-strip order.
pub const BACKGROUND_NDC: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

impl DisplayRotation {
    pub fn quarter_turns(self) -> u32 {
        match self {
            Self::Rotation0 => 0,
            Self::Rotation90 => 1,
            Self::Rotation180 => 2,
            Self::Rotation270 => 3,
        }
    }

    /// Texture coordinates for each `BACKGROUND_NDC` corner so that the
    /// camera image appears upright for this display rotation.
    pub fn background_uvs(self) -> [[f32; 2]; 4] {
        BACKGROUND_NDC.map(|[x, y]| {
            let mut uv = [(x + 1.0) * 0.5, (1.0 - y) * 0.5];
            for _ in 0..self.quarter_turns() {
                uv = [uv[1], 1.0 - uv[0]];
            }
            uv
        })
    }
}

/// Camera pose and intrinsics for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// World -> camera
    pub view: Mat4,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Viewport width / height
    pub aspect: f32,
}

impl Camera {
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Right-handed perspective with wgpu's 0..1 depth range.
    pub fn projection_matrix(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, near, far)
    }
}

/// Borrowed RGBA8 camera image
#[derive(Debug, Clone, Copy)]
pub struct CameraImage<'a> {
    pub width: u32,
    pub height: u32,
    pub pixels: &'a [u8],
}

/// Everything the session produced for one update.
///
/// Borrows the session, so nothing in it can be held across the next
/// `update()`.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub camera: Camera,
    pub camera_image: Option<CameraImage<'a>>,
    pub background_uvs: [[f32; 2]; 4],
    /// Faces in tracker enumeration order
    pub faces: Vec<TrackedFace<'a>>,
}

/// Face-tracking and camera session collaborator.
pub trait ArSession {
    /// Check permission, install state and capabilities, configure face
    /// tracking and resume the camera.
    fn start(&mut self) -> Result<(), SessionError>;

    /// Stop producing frames until the next `start`.
    fn pause(&mut self);

    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32);

    /// Advance to the latest camera frame.
    fn update(&mut self) -> Result<Frame<'_>, SessionError>;
}
