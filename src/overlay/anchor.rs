//! Anchor resolution: landmark pose lookup and face-width measurement

use crate::tracking::{Pose, RegionType, TrackedFace};

/// Default lower bound for the measured face width
pub const DEFAULT_MIN_FACE_WIDTH: f32 = 0.10;

/// Resolves anchor poses and the face-width scale for a tracked face
#[derive(Debug, Clone, Copy)]
pub struct AnchorResolver {
    min_face_width: f32,
}

impl Default for AnchorResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FACE_WIDTH)
    }
}

impl AnchorResolver {
    pub fn new(min_face_width: f32) -> Self {
        Self { min_face_width }
    }

    pub fn min_face_width(&self) -> f32 {
        self.min_face_width
    }

    /// Pose of `region`, or None when the tracker did not report it this
    /// frame.
    pub fn resolve(&self, face: &TrackedFace<'_>, region: RegionType) -> Option<Pose> {
        face.region_pose(region)
    }

    /// Forehead-to-forehead distance, floored at the minimum face width.
    ///
    /// None only when a forehead region is missing.
    pub fn face_width(&self, face: &TrackedFace<'_>) -> Option<f32> {
        let left = self.resolve(face, RegionType::ForeheadLeft)?;
        let right = self.resolve(face, RegionType::ForeheadRight)?;
        Some(face_width_between(&left, &right, self.min_face_width))
    }
}

/// `max(|a - b|, min_width)`. A NaN distance yields `min_width`.
pub fn face_width_between(a: &Pose, b: &Pose, min_width: f32) -> f32 {
    a.translation.distance(b.translation).max(min_width)
}
