//! Unit quad and background quad geometry

use bytemuck::{Pod, Zeroable};

use crate::tracking::BACKGROUND_NDC;

/// Interleaved vertex for the quad pipelines
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl QuadVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Unit quad centered on the origin in the XY plane, triangle-strip order
pub const QUAD_POSITIONS: [[f32; 3]; 4] = [
    [-0.5, -0.5, 0.0],
    [0.5, -0.5, 0.0],
    [-0.5, 0.5, 0.0],
    [0.5, 0.5, 0.0],
];

/// Bitmap rows run top-down, so v is flipped against y
pub const QUAD_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]];

pub fn quad_vertices() -> [QuadVertex; 4] {
    std::array::from_fn(|i| QuadVertex {
        position: QUAD_POSITIONS[i],
        uv: QUAD_UVS[i],
    })
}

/// Full-screen quad in clip space with per-corner texture coordinates.
pub fn background_vertices(uvs: &[[f32; 2]; 4]) -> [QuadVertex; 4] {
    std::array::from_fn(|i| QuadVertex {
        position: [BACKGROUND_NDC[i][0], BACKGROUND_NDC[i][1], 0.0],
        uv: uvs[i],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::DisplayRotation;

    #[test]
    fn test_quad_is_unit_and_centered() {
        let vertices = quad_vertices();
        let sum: f32 = vertices.iter().map(|v| v.position[0] + v.position[1]).sum();
        assert_eq!(sum, 0.0);
        for v in vertices {
            assert_eq!(v.position[0].abs(), 0.5);
            assert_eq!(v.position[1].abs(), 0.5);
        }
        // top-left corner samples the top-left texel
        assert_eq!(vertices[2].position, [-0.5, 0.5, 0.0]);
        assert_eq!(vertices[2].uv, [0.0, 0.0]);
    }

    #[test]
    fn test_background_matches_upright_quad_uvs() {
        let vertices = background_vertices(&DisplayRotation::Rotation0.background_uvs());
        for (v, uv) in vertices.iter().zip(QUAD_UVS) {
            assert_eq!(v.uv, uv);
        }
        assert_eq!(vertices[0].position, [-1.0, -1.0, 0.0]);
    }

    #[test]
    fn test_vertex_stride() {
        assert_eq!(QuadVertex::layout().array_stride, 20);
    }
}
