/// Interleaved vertex used by every scene draw

use bytemuck::{Pod, Zeroable};
use crate::device::{VertexAttribute, VertexFormat, VertexLayout};

/// Scene vertex
///
/// Locations: 0 position, 1 uv, 2 color, 3 normal, 4 tangent.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

impl SceneVertex {
    /// Size of one vertex in bytes
    pub const STRIDE: u32 = std::mem::size_of::<SceneVertex>() as u32;

    /// Vertex input layout matching the struct
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: Self::STRIDE,
            attributes: vec![
                VertexAttribute { location: 0, format: VertexFormat::Float3, offset: 0 },
                VertexAttribute { location: 1, format: VertexFormat::Float2, offset: 12 },
                VertexAttribute { location: 2, format: VertexFormat::Float3, offset: 20 },
                VertexAttribute { location: 3, format: VertexFormat::Float3, offset: 32 },
                VertexAttribute { location: 4, format: VertexFormat::Float3, offset: 44 },
            ],
        }
    }
}

#[cfg(test)]
#[path = "vertex_tests.rs"]
mod tests;
