//! Face-paint mesh overlay
//!
//! `MeshArena` holds the CPU copy of the tracker's per-frame mesh. Storage
//! only ever grows; each update overwrites the live range in full and stamps
//! a new frame number, so a handle from an earlier frame no longer resolves.

use crate::draw::{DrawCommand, DrawList};
use crate::error::OverlayError;
use crate::overlay::transform::{mesh_model_matrix, FrameTransforms};
use crate::overlay::TextureSlot;
use crate::tracking::{FaceMesh, TrackedFace};

/// Reference to the geometry written for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeometryHandle {
    frame: u64,
    vertex_count: u32,
    index_count: u32,
}

impl GeometryHandle {
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}

/// Borrowed live range of the arena
#[derive(Debug, Clone, Copy)]
pub struct MeshGeometry<'a> {
    /// xyz triples
    pub positions: &'a [f32],
    /// uv pairs
    pub uvs: &'a [f32],
    pub indices: &'a [u16],
}

/// Growth-only scratch storage for the face mesh
#[derive(Debug, Default)]
pub struct MeshArena {
    positions: Vec<f32>,
    uvs: Vec<f32>,
    indices: Vec<u16>,
    vertex_count: usize,
    index_count: usize,
    frame: u64,
    grow_count: u32,
}

impl MeshArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertices: usize, indices: usize) -> Self {
        let mut arena = Self::default();
        arena.ensure_capacity(vertices, indices);
        arena
    }

    /// Make room for `vertices` vertices and `indices` indices. Returns true
    /// if storage had to grow.
    pub fn ensure_capacity(&mut self, vertices: usize, indices: usize) -> bool {
        let mut grew = false;
        if vertices > self.vertex_capacity() {
            self.positions.resize(vertices * 3, 0.0);
            self.uvs.resize(vertices * 2, 0.0);
            grew = true;
        }
        if indices > self.index_capacity() {
            self.indices.resize(indices, 0);
            grew = true;
        }
        if grew {
            self.grow_count += 1;
            tracing::debug!(
                "Mesh arena grown to {} vertices / {} indices",
                self.vertex_capacity(),
                self.index_capacity()
            );
        }
        grew
    }

    pub fn vertex_capacity(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn index_capacity(&self) -> usize {
        self.indices.len()
    }

    /// Number of times storage has grown
    pub fn grow_count(&self) -> u32 {
        self.grow_count
    }

    /// Frame number of the most recent update
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Validate `mesh` and copy it over the live range.
    ///
    /// On error the arena keeps its previous contents and frame stamp.
    pub fn update_frame_geometry(
        &mut self,
        mesh: &FaceMesh<'_>,
    ) -> Result<GeometryHandle, OverlayError> {
        validate_mesh(mesh)?;

        let vertices = mesh.vertex_count();
        let indices = mesh.indices.len();
        self.ensure_capacity(vertices, indices);

        self.positions[..vertices * 3].copy_from_slice(mesh.vertices);
        self.uvs[..vertices * 2].copy_from_slice(mesh.uvs);
        self.indices[..indices].copy_from_slice(mesh.indices);
        self.vertex_count = vertices;
        self.index_count = indices;
        self.frame += 1;

        Ok(GeometryHandle {
            frame: self.frame,
            vertex_count: vertices as u32,
            index_count: indices as u32,
        })
    }

    /// Live geometry for `handle`, or None if a later update superseded it.
    pub fn geometry(&self, handle: GeometryHandle) -> Option<MeshGeometry<'_>> {
        if handle.frame != self.frame || self.frame == 0 {
            return None;
        }
        Some(MeshGeometry {
            positions: &self.positions[..self.vertex_count * 3],
            uvs: &self.uvs[..self.vertex_count * 2],
            indices: &self.indices[..self.index_count],
        })
    }
}

fn validate_mesh(mesh: &FaceMesh<'_>) -> Result<(), OverlayError> {
    if mesh.vertices.len() % 3 != 0 {
        return Err(OverlayError::MalformedMesh(format!(
            "{} position floats is not a multiple of 3",
            mesh.vertices.len()
        )));
    }
    if mesh.uvs.len() % 2 != 0 {
        return Err(OverlayError::MalformedMesh(format!(
            "{} uv floats is not a multiple of 2",
            mesh.uvs.len()
        )));
    }
    if mesh.indices.len() % 3 != 0 {
        return Err(OverlayError::MalformedMesh(format!(
            "{} indices is not a whole number of triangles",
            mesh.indices.len()
        )));
    }

    let vertex_count = mesh.vertex_count();
    if mesh.uvs.len() / 2 != vertex_count {
        return Err(OverlayError::MalformedMesh(format!(
            "{} uvs for {} vertices",
            mesh.uvs.len() / 2,
            vertex_count
        )));
    }
    if vertex_count > u16::MAX as usize + 1 {
        return Err(OverlayError::MalformedMesh(format!(
            "{} vertices exceed 16-bit indexing",
            vertex_count
        )));
    }
    if let Some(&index) = mesh.indices.iter().find(|&&i| i as usize >= vertex_count) {
        return Err(OverlayError::IndexOutOfRange { index, vertex_count });
    }
    Ok(())
}

/// Draws the tracked face mesh textured with a single slot
#[derive(Debug, Default)]
pub struct MeshOverlay {
    arena: MeshArena,
}

impl MeshOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &MeshArena {
        &self.arena
    }

    /// Copy this frame's mesh and record one draw in the face's center
    /// frame. Returns the number of draws recorded.
    pub fn draw(
        &mut self,
        face: &TrackedFace<'_>,
        transforms: &FrameTransforms,
        slot: TextureSlot,
        list: &mut DrawList,
    ) -> Result<usize, OverlayError> {
        if !face.is_tracking() {
            return Ok(0);
        }

        let mvp = transforms.checked_draw_matrix(&mesh_model_matrix(&face.center_pose))?;
        let geometry = self.arena.update_frame_geometry(&face.mesh)?;
        if geometry.index_count == 0 {
            tracing::trace!("Face mesh is empty, nothing to draw");
            return Ok(0);
        }

        list.push(DrawCommand::FaceMesh { slot, geometry, mvp });
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Pose, RegionPoses, TrackingState};
    use glam::Mat4;

    const QUAD_VERTICES: [f32; 12] = [
        -0.5, -0.5, 0.0, 0.5, -0.5, 0.0, -0.5, 0.5, 0.0, 0.5, 0.5, 0.0,
    ];
    const QUAD_UVS: [f32; 8] = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 1, 3];

    fn quad_mesh() -> FaceMesh<'static> {
        FaceMesh {
            vertices: &QUAD_VERTICES,
            uvs: &QUAD_UVS,
            indices: &QUAD_INDICES,
        }
    }

    fn face(state: TrackingState, mesh: FaceMesh<'static>) -> TrackedFace<'static> {
        TrackedFace {
            state,
            center_pose: Pose::IDENTITY,
            regions: RegionPoses::new(),
            mesh,
        }
    }

    #[test]
    fn test_update_copies_and_stamps() {
        let mut arena = MeshArena::new();
        let handle = arena.update_frame_geometry(&quad_mesh()).unwrap();
        assert_eq!(handle.vertex_count(), 4);
        assert_eq!(handle.index_count(), 6);

        let geometry = arena.geometry(handle).unwrap();
        assert_eq!(geometry.positions, &QUAD_VERTICES);
        assert_eq!(geometry.uvs, &QUAD_UVS);
        assert_eq!(geometry.indices, &QUAD_INDICES);
    }

    #[test]
    fn test_stale_handle() {
        let mut arena = MeshArena::new();
        let first = arena.update_frame_geometry(&quad_mesh()).unwrap();
        let second = arena.update_frame_geometry(&quad_mesh()).unwrap();
        assert!(arena.geometry(first).is_none());
        assert!(arena.geometry(second).is_some());
    }

    #[test]
    fn test_capacity_never_shrinks() {
        let mut arena = MeshArena::with_capacity(100, 300);
        assert_eq!(arena.grow_count(), 1);

        let handle = arena.update_frame_geometry(&quad_mesh()).unwrap();
        assert_eq!(arena.vertex_capacity(), 100);
        assert_eq!(arena.index_capacity(), 300);
        assert_eq!(arena.grow_count(), 1);
        // live range reflects only this frame
        assert_eq!(arena.geometry(handle).unwrap().positions.len(), 12);

        assert!(!arena.ensure_capacity(10, 10));
        assert!(arena.ensure_capacity(101, 10));
        assert_eq!(arena.grow_count(), 2);
    }

    #[test]
    fn test_update_overwrites_live_range() {
        const TRI_VERTICES: [f32; 9] = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9];
        const TRI_UVS: [f32; 6] = [0.25, 0.75, 0.5, 0.5, 0.75, 0.25];
        const TRI_INDICES: [u16; 3] = [2, 0, 1];
        // two quads side by side: 6 vertices, 4 triangles
        const STRIP_VERTICES: [f32; 18] = [
            0.0, 0.0, 0.1, 1.0, 0.0, 0.1, 2.0, 0.0, 0.1, 0.0, 1.0, 0.2, 1.0, 1.0, 0.2, 2.0, 1.0,
            0.2,
        ];
        const STRIP_UVS: [f32; 12] = [0.0, 1.0, 0.5, 1.0, 1.0, 1.0, 0.0, 0.0, 0.5, 0.0, 1.0, 0.0];
        const STRIP_INDICES: [u16; 12] = [0, 1, 3, 3, 1, 4, 1, 2, 4, 4, 2, 5];

        let mut arena = MeshArena::new();
        arena.update_frame_geometry(&quad_mesh()).unwrap();
        assert_eq!(arena.grow_count(), 1);

        // smaller mesh: no growth, and nothing of the quad leaks through
        let triangle = FaceMesh {
            vertices: &TRI_VERTICES,
            uvs: &TRI_UVS,
            indices: &TRI_INDICES,
        };
        let handle = arena.update_frame_geometry(&triangle).unwrap();
        assert_eq!(arena.grow_count(), 1);
        assert_eq!(handle.vertex_count(), 3);
        assert_eq!(handle.index_count(), 3);
        let geometry = arena.geometry(handle).unwrap();
        assert_eq!(geometry.positions, &TRI_VERTICES);
        assert_eq!(geometry.uvs, &TRI_UVS);
        assert_eq!(geometry.indices, &TRI_INDICES);

        // larger than capacity: grows, then holds exactly the new mesh
        let strip = FaceMesh {
            vertices: &STRIP_VERTICES,
            uvs: &STRIP_UVS,
            indices: &STRIP_INDICES,
        };
        let handle = arena.update_frame_geometry(&strip).unwrap();
        assert_eq!(arena.grow_count(), 2);
        assert!(arena.vertex_capacity() >= 6);
        assert!(arena.index_capacity() >= 12);
        let geometry = arena.geometry(handle).unwrap();
        assert_eq!(geometry.positions, &STRIP_VERTICES);
        assert_eq!(geometry.uvs, &STRIP_UVS);
        assert_eq!(geometry.indices, &STRIP_INDICES);
    }

    #[test]
    fn test_rejects_malformed_meshes() {
        let mut arena = MeshArena::new();

        let bad_arity = FaceMesh {
            vertices: &QUAD_VERTICES[..11],
            ..quad_mesh()
        };
        assert!(matches!(
            arena.update_frame_geometry(&bad_arity),
            Err(OverlayError::MalformedMesh(_))
        ));

        let uv_mismatch = FaceMesh {
            uvs: &QUAD_UVS[..6],
            ..quad_mesh()
        };
        assert!(matches!(
            arena.update_frame_geometry(&uv_mismatch),
            Err(OverlayError::MalformedMesh(_))
        ));

        let out_of_range = FaceMesh {
            indices: &[0, 1, 4],
            ..quad_mesh()
        };
        assert_eq!(
            arena.update_frame_geometry(&out_of_range),
            Err(OverlayError::IndexOutOfRange {
                index: 4,
                vertex_count: 4
            })
        );
        assert_eq!(arena.frame(), 0);
    }

    #[test]
    fn test_failed_update_keeps_previous_frame() {
        let mut arena = MeshArena::new();
        let handle = arena.update_frame_geometry(&quad_mesh()).unwrap();
        let broken = FaceMesh {
            indices: &[0, 1, 9],
            ..quad_mesh()
        };
        assert!(arena.update_frame_geometry(&broken).is_err());
        assert!(arena.geometry(handle).is_some());
    }

    #[test]
    fn test_draw_skips_untracked_face() {
        let mut overlay = MeshOverlay::new();
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();

        for state in [TrackingState::NotTracking, TrackingState::Paused] {
            let n = overlay
                .draw(&face(state, quad_mesh()), &transforms, TextureSlot::FacePaint, &mut list)
                .unwrap();
            assert_eq!(n, 0);
        }
        assert!(list.is_empty());
        assert_eq!(overlay.arena().frame(), 0);
    }

    #[test]
    fn test_draw_records_mesh_command() {
        let mut overlay = MeshOverlay::new();
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();

        let n = overlay
            .draw(
                &face(TrackingState::Tracking, quad_mesh()),
                &transforms,
                TextureSlot::FacePaint,
                &mut list,
            )
            .unwrap();
        assert_eq!(n, 1);
        match list.commands() {
            [DrawCommand::FaceMesh { slot, geometry, mvp }] => {
                assert_eq!(*slot, TextureSlot::FacePaint);
                assert_eq!(*mvp, Mat4::IDENTITY);
                assert!(overlay.arena().geometry(*geometry).is_some());
            }
            other => panic!("unexpected commands: {:?}", other),
        }
    }

    #[test]
    fn test_empty_mesh_draws_nothing() {
        let mut overlay = MeshOverlay::new();
        let transforms = FrameTransforms::new(Mat4::IDENTITY, Mat4::IDENTITY);
        let mut list = DrawList::new();
        let n = overlay
            .draw(
                &face(TrackingState::Tracking, FaceMesh::default()),
                &transforms,
                TextureSlot::FacePaint,
                &mut list,
            )
            .unwrap();
        assert_eq!(n, 0);
        assert!(list.is_empty());
    }
}
