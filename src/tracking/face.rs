//! Tracked face snapshot: tracking state, landmark region poses and the
//! deforming face mesh.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Per-frame availability of a tracked face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingState {
    NotTracking,
    Tracking,
    Paused,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::NotTracking => write!(f, "not tracking"),
            TrackingState::Tracking => write!(f, "tracking"),
            TrackingState::Paused => write!(f, "paused"),
        }
    }
}

/// Named landmark regions reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionType {
    NoseTip,
    ForeheadLeft,
    ForeheadRight,
}

impl RegionType {
    pub const ALL: [RegionType; 3] = [Self::NoseTip, Self::ForeheadLeft, Self::ForeheadRight];

    fn index(self) -> usize {
        match self {
            Self::NoseTip => 0,
            Self::ForeheadLeft => 1,
            Self::ForeheadRight => 2,
        }
    }
}

/// Rigid transform (rotation then translation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Column-major homogeneous matrix of this pose.
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Compose `self` with a pose expressed in `self`'s local frame.
    pub fn compose(&self, local: &Pose) -> Pose {
        Pose {
            translation: self.translation + self.rotation * local.translation,
            rotation: self.rotation * local.rotation,
        }
    }
}

/// One optional pose per `RegionType`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RegionPoses {
    poses: [Option<Pose>; 3],
}

impl RegionPoses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, region: RegionType, pose: Pose) -> Self {
        self.set(region, pose);
        self
    }

    pub fn set(&mut self, region: RegionType, pose: Pose) {
        self.poses[region.index()] = Some(pose);
    }

    pub fn remove(&mut self, region: RegionType) {
        self.poses[region.index()] = None;
    }

    pub fn get(&self, region: RegionType) -> Option<Pose> {
        self.poses[region.index()]
    }
}

/// Borrowed view of the tracker's per-frame mesh buffers.
///
/// Valid only until the next tracker update.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceMesh<'a> {
    /// xyz triples in the face's local frame
    pub vertices: &'a [f32],
    /// uv pairs, parallel to `vertices`
    pub uvs: &'a [f32],
    /// Triangle index triples
    pub indices: &'a [u16],
}

impl<'a> FaceMesh<'a> {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.indices.is_empty()
    }
}

/// Frame-scoped snapshot of one tracked face.
#[derive(Debug, Clone, Copy)]
pub struct TrackedFace<'a> {
    pub state: TrackingState,
    pub center_pose: Pose,
    pub regions: RegionPoses,
    pub mesh: FaceMesh<'a>,
}

impl<'a> TrackedFace<'a> {
    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    pub fn region_pose(&self, region: RegionType) -> Option<Pose> {
        self.regions.get(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_matrix_translation_column() {
        let pose = Pose::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let m = pose.to_mat4();
        assert_eq!(m.w_axis.truncate(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(m.w_axis.w, 1.0);
    }

    #[test]
    fn test_pose_compose_applies_local_offset_in_rotated_frame() {
        let parent = Pose::new(
            Vec3::new(0.0, 0.0, -1.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
        );
        let local = Pose::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let world = parent.compose(&local);
        // +X rotated 90° about Y points to -Z
        assert!((world.translation - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-6);
        let via_matrix = parent.to_mat4() * local.to_mat4();
        assert!(via_matrix.abs_diff_eq(world.to_mat4(), 1e-6));
    }

    #[test]
    fn test_region_poses_lookup() {
        let regions = RegionPoses::new()
            .with(RegionType::NoseTip, Pose::from_translation(Vec3::Z));
        assert!(regions.get(RegionType::NoseTip).is_some());
        assert!(regions.get(RegionType::ForeheadLeft).is_none());
    }

    #[test]
    fn test_mesh_counts() {
        let vertices = [0.0f32; 9];
        let uvs = [0.0f32; 6];
        let indices = [0u16, 1, 2];
        let mesh = FaceMesh {
            vertices: &vertices,
            uvs: &uvs,
            indices: &indices,
        };
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert!(!mesh.is_empty());
        assert!(FaceMesh::default().is_empty());
    }
}
