/// Per-frame uniform blocks
///
/// Every block lives in one small host-visible, coherent buffer that is
/// rewritten in place; there is no double buffering. Layouts follow std140.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec4};
use crate::camera::Camera;
use crate::device::{Buffer, BufferDesc, GraphicsDevice};
use crate::error::Result;
use crate::lights::Light;

/// Projection, model and view matrices plus the viewport size
///
/// Used both for the full-screen passes and for the scene geometry.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MatrixUniforms {
    pub projection: Mat4,
    pub model: Mat4,
    pub view: Mat4,
    pub viewport_dim: Vec2,
    _pad: Vec2,
}

impl MatrixUniforms {
    /// Orthographic projection for the full-screen quads
    ///
    /// In debug display the unit quads fill one quarter of the screen
    /// each, so the projection spans [0, 2].
    pub fn screen(debug_display: bool, width: u32, height: u32) -> Self {
        let extent = if debug_display { 2.0 } else { 1.0 };
        Self {
            projection: Mat4::orthographic_rh(0.0, extent, 0.0, extent, -1.0, 1.0),
            model: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            viewport_dim: Vec2::new(width as f32, height as f32),
            _pad: Vec2::ZERO,
        }
    }

    /// Camera matrices for the G-buffer pass
    pub fn scene(camera: &Camera, width: u32, height: u32) -> Self {
        Self {
            projection: *camera.perspective(),
            model: Mat4::IDENTITY,
            view: *camera.view(),
            viewport_dim: Vec2::new(width as f32, height as f32),
            _pad: Vec2::ZERO,
        }
    }
}

/// Light array plus the camera data the composition shader needs
///
/// The array length is the configured light count, so the block is
/// serialized by hand rather than cast.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneLights {
    pub lights: Vec<Light>,
    pub view_pos: Vec4,
    pub view: Mat4,
    pub model: Mat4,
}

impl SceneLights {
    pub fn new(lights: Vec<Light>) -> Self {
        Self {
            lights,
            view_pos: Vec4::ZERO,
            view: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
        }
    }

    /// Size in bytes of the block for `light_count` lights
    pub fn byte_size(light_count: usize) -> u64 {
        (light_count * std::mem::size_of::<Light>()
            + std::mem::size_of::<Vec4>()
            + 2 * std::mem::size_of::<Mat4>()) as u64
    }

    /// Refresh the camera-dependent fields
    ///
    /// The camera stores the world translation, so the eye position is its
    /// negation.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.view_pos = camera.position().extend(0.0) * -1.0;
        self.view = *camera.view();
        self.model = Mat4::IDENTITY;
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::byte_size(self.lights.len()) as usize);
        bytes.extend_from_slice(bytemuck::cast_slice(&self.lights));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.view_pos));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.view));
        bytes.extend_from_slice(bytemuck::bytes_of(&self.model));
        bytes
    }
}

/// Light-space matrices read by the shadow pass vertex shader
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMatrices {
    pub depth_mvp: Vec<Mat4>,
}

impl ShadowMatrices {
    pub fn from_lights(lights: &[Light]) -> Self {
        Self { depth_mvp: lights.iter().map(|l| l.light_space).collect() }
    }

    pub fn byte_size(light_count: usize) -> u64 {
        (light_count * std::mem::size_of::<Mat4>()) as u64
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.depth_mvp).to_vec()
    }
}

/// The four uniform buffers of the renderer
pub struct UniformBuffers {
    /// `ShadowMatrices`
    pub shadow: Arc<dyn Buffer>,
    /// `MatrixUniforms::screen`
    pub screen: Arc<dyn Buffer>,
    /// `MatrixUniforms::scene`
    pub scene_matrices: Arc<dyn Buffer>,
    /// `SceneLights`
    pub scene_lights: Arc<dyn Buffer>,
}

impl UniformBuffers {
    pub fn new(device: &dyn GraphicsDevice, light_count: usize) -> Result<Self> {
        let matrices_size = std::mem::size_of::<MatrixUniforms>() as u64;
        Ok(Self {
            shadow: device.create_buffer(&BufferDesc::uniform(ShadowMatrices::byte_size(light_count)))?,
            screen: device.create_buffer(&BufferDesc::uniform(matrices_size))?,
            scene_matrices: device.create_buffer(&BufferDesc::uniform(matrices_size))?,
            scene_lights: device.create_buffer(&BufferDesc::uniform(SceneLights::byte_size(light_count)))?,
        })
    }

    pub fn write_screen(&self, uniforms: &MatrixUniforms) -> Result<()> {
        self.screen.update(0, bytemuck::bytes_of(uniforms))
    }

    pub fn write_scene_matrices(&self, uniforms: &MatrixUniforms) -> Result<()> {
        self.scene_matrices.update(0, bytemuck::bytes_of(uniforms))
    }

    pub fn write_scene_lights(&self, lights: &SceneLights) -> Result<()> {
        self.scene_lights.update(0, &lights.to_bytes())
    }

    pub fn write_shadow(&self, matrices: &ShadowMatrices) -> Result<()> {
        self.shadow.update(0, &matrices.to_bytes())
    }
}

#[cfg(test)]
#[path = "uniforms_tests.rs"]
mod tests;
