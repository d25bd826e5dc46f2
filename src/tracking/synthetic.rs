//! Synthetic tracking session
//!
//! A deterministic stand-in for a platform face tracker. Each `update()`
//! advances a step counter and re-populates:
//!   - a head pose swaying in yaw/pitch in front of a camera at the origin
//!   - a grid face mesh in the face's local frame (+Z out of the face) with
//!     an animated mouth deformation
//!   - nose tip / forehead region poses derived from the head pose
//!   - a generated RGBA camera image
//!
//! Capability and permission flags plus a few test hooks make the error
//! paths of the frame driver reachable without a device.

use std::f32::consts::TAU;

use glam::{EulerRot, Mat4, Quat, Vec3};

use super::face::{FaceMesh, Pose, RegionPoses, RegionType, TrackedFace, TrackingState};
use super::session::{ArSession, Camera, CameraImage, DisplayRotation, Frame};
use crate::config::SyntheticConfig;
use crate::error::SessionError;

/// Face half extents of the generated mesh (x, y) and forward bulge (z)
const FACE_HALF_WIDTH: f32 = 0.07;
const FACE_HALF_HEIGHT: f32 = 0.09;
const FACE_BULGE: f32 = 0.04;

/// Maximum downward travel of the lower lip region
const MOUTH_TRAVEL: f32 = 0.012;

/// Region offsets in the face's local frame
const NOSE_TIP_LOCAL: Vec3 = Vec3::new(0.0, -0.005, 0.045);
const FOREHEAD_LEFT_LOCAL: Vec3 = Vec3::new(-0.055, 0.065, 0.015);
const FOREHEAD_RIGHT_LOCAL: Vec3 = Vec3::new(0.055, 0.065, 0.015);

/// Horizontal spacing between additional faces
const EXTRA_FACE_SPACING: f32 = 0.25;

/// Deterministic face-tracking session
pub struct SyntheticSession {
    config: SyntheticConfig,
    started: bool,
    step: u64,
    rotation: DisplayRotation,
    viewport: [u32; 2],
    image: Vec<u8>,
    vertices: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    state_overrides: Vec<Option<TrackingState>>,
    hidden_regions: RegionMask,
    fail_next_update: Option<String>,
    corrupt_next_mesh: bool,
    display_geometry_calls: u32,
}

#[derive(Debug, Clone, Copy, Default)]
struct RegionMask([bool; 3]);

impl RegionMask {
    fn slot(region: RegionType) -> usize {
        match region {
            RegionType::NoseTip => 0,
            RegionType::ForeheadLeft => 1,
            RegionType::ForeheadRight => 2,
        }
    }
}

impl SyntheticSession {
    pub fn new(config: &SyntheticConfig) -> Self {
        let mut session = Self {
            config: config.clone(),
            started: false,
            step: 0,
            rotation: DisplayRotation::Rotation0,
            viewport: [config.image_width, config.image_height],
            image: Vec::new(),
            vertices: Vec::new(),
            uvs: Vec::new(),
            indices: Vec::new(),
            state_overrides: vec![None; config.face_count as usize],
            hidden_regions: RegionMask::default(),
            fail_next_update: None,
            corrupt_next_mesh: false,
            display_geometry_calls: 0,
        };
        session.build_topology();
        session
    }

    /// Steps taken since creation
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Number of `set_display_geometry` calls received
    pub fn display_geometry_calls(&self) -> u32 {
        self.display_geometry_calls
    }

    pub fn display_rotation(&self) -> DisplayRotation {
        self.rotation
    }

    /// Force a face's tracking state (None restores the scripted state).
    pub fn override_state(&mut self, face: usize, state: Option<TrackingState>) {
        if let Some(slot) = self.state_overrides.get_mut(face) {
            *slot = state;
        }
    }

    /// Omit a landmark region from subsequent snapshots.
    pub fn hide_region(&mut self, region: RegionType, hidden: bool) {
        self.hidden_regions.0[RegionMask::slot(region)] = hidden;
    }

    /// Make the next `update()` fail with a frame error.
    pub fn fail_next_update(&mut self, reason: &str) {
        self.fail_next_update = Some(reason.to_string());
    }

    /// Emit an out-of-range triangle index in the next frame's mesh.
    pub fn corrupt_next_mesh(&mut self) {
        self.corrupt_next_mesh = true;
    }

    fn rows(&self) -> usize {
        self.config.mesh_rows.max(2) as usize
    }

    fn cols(&self) -> usize {
        self.config.mesh_cols.max(2) as usize
    }

    /// UVs and triangle indices are fixed for a given grid.
    fn build_topology(&mut self) {
        let (rows, cols) = (self.rows(), self.cols());

        self.uvs.clear();
        for i in 0..rows {
            for j in 0..cols {
                self.uvs.push(j as f32 / (cols - 1) as f32);
                self.uvs.push(i as f32 / (rows - 1) as f32);
            }
        }

        self.indices.clear();
        for i in 0..rows - 1 {
            for j in 0..cols - 1 {
                let a = (i * cols + j) as u16;
                let b = a + 1;
                let c = a + cols as u16;
                let d = c + 1;
                // CCW seen from +Z
                self.indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        self.vertices.resize(rows * cols * 3, 0.0);
    }

    /// Re-populate vertex positions for the current step.
    fn deform_mesh(&mut self, mouth_open: f32) {
        let (rows, cols) = (self.rows(), self.cols());
        for i in 0..rows {
            for j in 0..cols {
                let u = j as f32 / (cols - 1) as f32;
                let v = i as f32 / (rows - 1) as f32;
                let su = 2.0 * u - 1.0;
                let sv = 2.0 * v - 1.0;

                let x = su * FACE_HALF_WIDTH;
                let mut y = -sv * FACE_HALF_HEIGHT;
                let z = FACE_BULGE * (1.0 - su * su) * (1.0 - sv * sv);

                // lower-center band follows the jaw
                if v > 0.65 && su.abs() < 0.4 {
                    let weight = (1.0 - su.abs() / 0.4) * ((v - 0.65) / 0.35);
                    y -= MOUTH_TRAVEL * mouth_open * weight;
                }

                let k = (i * cols + j) * 3;
                self.vertices[k] = x;
                self.vertices[k + 1] = y;
                self.vertices[k + 2] = z;
            }
        }

        if std::mem::take(&mut self.corrupt_next_mesh) {
            if let Some(last) = self.indices.last_mut() {
                *last = u16::MAX;
            }
        } else if let Some(last) = self.indices.last_mut() {
            *last = (rows * cols - 1) as u16;
        }
    }

    fn generate_image(&mut self) {
        let (w, h) = (self.config.image_width.max(1), self.config.image_height.max(1));
        self.image.clear();
        self.image.reserve((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                let fx = x as f32 / w as f32;
                let fy = y as f32 / h as f32;
                self.image.push((40.0 + 60.0 * fx) as u8);
                self.image.push((50.0 + 50.0 * fy) as u8);
                self.image.push(90);
                self.image.push(255);
            }
        }
    }

    fn head_pose(&self, face: usize) -> Pose {
        let period = self.config.period_frames.max(1) as f32;
        let phase = (self.step % self.config.period_frames.max(1) as u64) as f32 / period;
        let yaw = self.config.sway_yaw_degrees.to_radians() * (TAU * phase).sin();
        let pitch = self.config.sway_pitch_degrees.to_radians() * (2.0 * TAU * phase).sin();

        let x = face as f32 * EXTRA_FACE_SPACING;
        Pose::new(
            Vec3::new(x, 0.0, -self.config.face_distance),
            Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0),
        )
    }

    fn scripted_state(&self, face: usize) -> TrackingState {
        if let Some(Some(state)) = self.state_overrides.get(face) {
            return *state;
        }
        let every = self.config.lost_every_frames as u64;
        if every > 0 {
            let duration = self.config.lost_duration_frames as u64;
            if self.step % every >= every - duration.min(every) {
                return TrackingState::NotTracking;
            }
        }
        TrackingState::Tracking
    }

    fn region_poses(&self, head: &Pose) -> RegionPoses {
        let mut regions = RegionPoses::new();
        for (region, local) in [
            (RegionType::NoseTip, NOSE_TIP_LOCAL),
            (RegionType::ForeheadLeft, FOREHEAD_LEFT_LOCAL),
            (RegionType::ForeheadRight, FOREHEAD_RIGHT_LOCAL),
        ] {
            if !self.hidden_regions.0[RegionMask::slot(region)] {
                regions.set(region, head.compose(&Pose::from_translation(local)));
            }
        }
        regions
    }

    fn camera(&self) -> Camera {
        let [w, h] = self.viewport;
        let aspect = if w > 0 && h > 0 {
            w as f32 / h as f32
        } else {
            self.config.image_width.max(1) as f32 / self.config.image_height.max(1) as f32
        };
        Camera {
            view: Mat4::IDENTITY,
            fov_y: self.config.fov_y_degrees.to_radians(),
            aspect,
        }
    }
}

impl ArSession for SyntheticSession {
    fn start(&mut self) -> Result<(), SessionError> {
        if !self.config.camera_permission {
            return Err(SessionError::PermissionDenied);
        }
        if !self.config.supported {
            return Err(SessionError::Unsupported("augmented face mesh".to_string()));
        }
        if self.image.is_empty() {
            self.generate_image();
        }
        self.started = true;
        tracing::debug!("Synthetic session started at step {}", self.step);
        Ok(())
    }

    fn pause(&mut self) {
        self.started = false;
        tracing::debug!("Synthetic session paused at step {}", self.step);
    }

    fn set_display_geometry(&mut self, rotation: DisplayRotation, width: u32, height: u32) {
        self.rotation = rotation;
        self.viewport = [width, height];
        self.display_geometry_calls += 1;
    }

    fn update(&mut self) -> Result<Frame<'_>, SessionError> {
        if !self.started {
            return Err(SessionError::FrameUpdate("session is not running".to_string()));
        }
        if let Some(reason) = self.fail_next_update.take() {
            return Err(SessionError::FrameUpdate(reason));
        }

        self.step += 1;
        let period = self.config.period_frames.max(1) as f32;
        let mouth_open = 0.5 + 0.5 * (TAU * 3.0 * self.step as f32 / period).sin();
        self.deform_mesh(mouth_open);

        let camera = self.camera();
        let background_uvs = self.rotation.background_uvs();

        let faces: Vec<(TrackingState, Pose, RegionPoses)> = (0..self.config.face_count as usize)
            .map(|i| {
                let head = self.head_pose(i);
                (self.scripted_state(i), head, self.region_poses(&head))
            })
            .collect();

        let mesh = FaceMesh {
            vertices: &self.vertices,
            uvs: &self.uvs,
            indices: &self.indices,
        };

        Ok(Frame {
            camera,
            camera_image: Some(CameraImage {
                width: self.config.image_width.max(1),
                height: self.config.image_height.max(1),
                pixels: &self.image,
            }),
            background_uvs,
            faces: faces
                .into_iter()
                .map(|(state, center_pose, regions)| TrackedFace {
                    state,
                    center_pose,
                    regions,
                    mesh,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started_session(config: SyntheticConfig) -> SyntheticSession {
        let mut session = SyntheticSession::new(&config);
        session.start().unwrap();
        session
    }

    #[test]
    fn test_start_requires_permission() {
        let config = SyntheticConfig {
            camera_permission: false,
            ..Default::default()
        };
        let mut session = SyntheticSession::new(&config);
        assert_eq!(session.start(), Err(SessionError::PermissionDenied));
        assert!(!session.is_started());
    }

    #[test]
    fn test_start_unsupported() {
        let config = SyntheticConfig {
            supported: false,
            ..Default::default()
        };
        let mut session = SyntheticSession::new(&config);
        assert!(matches!(session.start(), Err(SessionError::Unsupported(_))));
    }

    #[test]
    fn test_update_before_start_fails() {
        let mut session = SyntheticSession::new(&SyntheticConfig::default());
        assert!(session.update().is_err());
    }

    #[test]
    fn test_mesh_is_consistent() {
        let config = SyntheticConfig::default();
        let mut session = started_session(config.clone());
        let frame = session.update().unwrap();
        let mesh = frame.faces[0].mesh;

        let expected_vertices = (config.mesh_rows * config.mesh_cols) as usize;
        assert_eq!(mesh.vertex_count(), expected_vertices);
        assert_eq!(mesh.uvs.len(), expected_vertices * 2);
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < expected_vertices));
    }

    #[test]
    fn test_face_width_above_floor() {
        let mut session = started_session(SyntheticConfig::default());
        let frame = session.update().unwrap();
        let face = &frame.faces[0];
        let left = face.region_pose(RegionType::ForeheadLeft).unwrap();
        let right = face.region_pose(RegionType::ForeheadRight).unwrap();
        let width = left.translation.distance(right.translation);
        assert!((width - 0.11).abs() < 1e-4);
    }

    #[test]
    fn test_face_in_front_of_camera() {
        let mut session = started_session(SyntheticConfig::default());
        for _ in 0..50 {
            let frame = session.update().unwrap();
            assert!(frame.faces[0].center_pose.translation.z < 0.0);
        }
    }

    #[test]
    fn test_tracking_loss_window() {
        let config = SyntheticConfig {
            lost_every_frames: 10,
            lost_duration_frames: 3,
            ..Default::default()
        };
        let mut session = started_session(config);
        let mut lost = 0;
        for _ in 0..10 {
            let frame = session.update().unwrap();
            if !frame.faces[0].is_tracking() {
                lost += 1;
            }
        }
        assert_eq!(lost, 3);
    }

    #[test]
    fn test_hooks() {
        let mut session = started_session(SyntheticConfig::default());
        session.fail_next_update("camera stalled");
        assert!(session.update().is_err());
        assert!(session.update().is_ok());

        session.hide_region(RegionType::NoseTip, true);
        session.override_state(0, Some(TrackingState::Paused));
        let frame = session.update().unwrap();
        assert!(frame.faces[0].region_pose(RegionType::NoseTip).is_none());
        assert_eq!(frame.faces[0].state, TrackingState::Paused);
    }

    #[test]
    fn test_corrupt_mesh_is_one_shot() {
        let mut session = started_session(SyntheticConfig::default());
        session.corrupt_next_mesh();
        {
            let frame = session.update().unwrap();
            assert_eq!(*frame.faces[0].mesh.indices.last().unwrap(), u16::MAX);
        }
        let frame = session.update().unwrap();
        let count = frame.faces[0].mesh.vertex_count();
        assert!(frame.faces[0].mesh.indices.iter().all(|&i| (i as usize) < count));
    }

    #[test]
    fn test_deterministic() {
        let config = SyntheticConfig::default();
        let mut a = started_session(config.clone());
        let mut b = started_session(config);
        for _ in 0..5 {
            let fa = a.update().unwrap();
            let pa = fa.faces[0].center_pose;
            let va = fa.faces[0].mesh.vertices.to_vec();
            let fb = b.update().unwrap();
            assert_eq!(pa, fb.faces[0].center_pose);
            assert_eq!(va, fb.faces[0].mesh.vertices);
        }
    }
}
