//! Model and draw matrix construction for anchored overlays

use glam::{Mat4, Vec3};

use crate::config::OverlayConfig;
use crate::error::OverlayError;
use crate::tracking::{Camera, Pose};

/// `anchor × translate(offset) × scale(fw·wide, fw·size_y, 1)`
pub fn build_model_matrix(anchor: &Pose, config: &OverlayConfig, face_width: f32) -> Mat4 {
    let translation = Mat4::from_translation(Vec3::from_array(config.offset));
    let scale = Mat4::from_scale(Vec3::new(
        face_width * config.wide,
        face_width * config.size_y,
        1.0,
    ));
    anchor.to_mat4() * translation * scale
}

/// The face mesh is expressed in the face's center frame.
pub fn mesh_model_matrix(center_pose: &Pose) -> Mat4 {
    center_pose.to_mat4()
}

/// View and projection for the current frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransforms {
    pub view: Mat4,
    pub projection: Mat4,
}

impl FrameTransforms {
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    pub fn from_camera(camera: &Camera, near: f32, far: f32) -> Result<Self, OverlayError> {
        let transforms = Self::new(camera.view_matrix(), camera.projection_matrix(near, far));
        ensure_finite(&transforms.view, "view")?;
        ensure_finite(&transforms.projection, "projection")?;
        Ok(transforms)
    }

    /// `projection × (view × model)`, matching `mvp * vec4(pos, 1)` in the
    /// vertex shader.
    pub fn draw_matrix(&self, model: &Mat4) -> Mat4 {
        self.projection * (self.view * *model)
    }

    /// Draw matrix for `model`, rejected if any element is non-finite.
    pub fn checked_draw_matrix(&self, model: &Mat4) -> Result<Mat4, OverlayError> {
        ensure_finite(model, "model")?;
        let mvp = self.draw_matrix(model);
        ensure_finite(&mvp, "draw")?;
        Ok(mvp)
    }
}

pub fn ensure_finite(matrix: &Mat4, what: &'static str) -> Result<(), OverlayError> {
    if matrix.is_finite() {
        Ok(())
    } else {
        Err(OverlayError::NonFinite(what))
    }
}
