/// Screen-space quads for the full-screen passes
///
/// Three unit quads laid out on a 2x2 grid: (0,0), (1,0) and (0,1). The
/// normal's z component carries the quad index so the debug shader knows
/// which G-buffer channel to show. The index list starts with the first
/// quad on its own (the full-screen quad), followed by all three quads.

use crate::device::GraphicsDevice;
use crate::error::Result;
use crate::scene::{MeshBuffers, SceneVertex};

/// Number of quads in the grid
pub const QUAD_COUNT: u32 = 3;

/// Indices drawn by the composition pipeline (first quad only)
pub const FULLSCREEN_INDEX_COUNT: u32 = 6;

/// Indices drawn by the debug pipeline (every quad, first one twice)
pub const DEBUG_INDEX_COUNT: u32 = FULLSCREEN_INDEX_COUNT + QUAD_COUNT * 6;

const QUAD_INDICES: [u32; 6] = [0, 1, 2, 2, 3, 0];

/// Vertices and indices of the quad grid
pub fn quad_geometry() -> (Vec<SceneVertex>, Vec<u32>) {
    let mut vertices = Vec::with_capacity(QUAD_COUNT as usize * 4);
    let (mut x, mut y) = (0.0f32, 0.0f32);

    for i in 0..QUAD_COUNT {
        let corners = [
            ([x + 1.0, y + 1.0], [1.0, 1.0]),
            ([x, y + 1.0], [0.0, 1.0]),
            ([x, y], [0.0, 0.0]),
            ([x + 1.0, y], [1.0, 0.0]),
        ];
        for (pos, uv) in corners {
            vertices.push(SceneVertex {
                pos: [pos[0], pos[1], 0.0],
                uv,
                color: [1.0; 3],
                normal: [0.0, 0.0, i as f32],
                tangent: [0.0; 3],
            });
        }

        x += 1.0;
        if x > 1.0 {
            x = 0.0;
            y += 1.0;
        }
    }

    let mut indices = QUAD_INDICES.to_vec();
    for i in 0..QUAD_COUNT {
        indices.extend(QUAD_INDICES.iter().map(|index| i * 4 + index));
    }

    (vertices, indices)
}

/// Upload the quad grid
pub fn create_quads(device: &dyn GraphicsDevice) -> Result<MeshBuffers> {
    let (vertices, indices) = quad_geometry();
    MeshBuffers::upload(device, &vertices, &indices)
}

#[cfg(test)]
#[path = "quads_tests.rs"]
mod tests;
