/// CommandList trait - for recording GPU commands

use std::any::Any;
use std::sync::Arc;
use crate::error::Result;
use crate::device::{
    Buffer, DescriptorSet, Framebuffer, IndexType, Pipeline, PipelineLayout,
    RenderPass, ShaderStages,
};

/// Viewport rectangle and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-surface viewport with depth range [0, 1]
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0.0, y: 0.0, width: width as f32, height: height as f32, min_depth: 0.0, max_depth: 1.0 }
    }
}

/// Integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for one attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// Arguments of an indexed draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawIndexed {
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub vertex_offset: i32,
    pub first_instance: u32,
}

impl DrawIndexed {
    /// One instance of `index_count` indices starting at `first_index`
    pub fn range(first_index: u32, index_count: u32) -> Self {
        Self { index_count, instance_count: 1, first_index, vertex_offset: 0, first_instance: 0 }
    }
}

/// Command list for recording GPU commands
///
/// Recorded once, submitted any number of times through
/// `GraphicsDevice::submit`. Re-recording resets the list.
pub trait CommandList: Send + Sync {
    /// Reset and begin recording
    fn begin(&mut self) -> Result<()>;

    /// Finish recording
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass over the whole framebuffer
    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    fn end_render_pass(&mut self) -> Result<()>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Dynamic depth bias (requires a pipeline built with `dynamic_depth_bias`)
    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()>;

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()>;

    /// Bind a descriptor set at `set_index` for the given layout
    fn bind_descriptor_set(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        set: &Arc<dyn DescriptorSet>,
    ) -> Result<()>;

    /// Push constants
    ///
    /// # Arguments
    ///
    /// * `layout` - Pipeline layout declaring the push constant range
    /// * `stages` - Shader stages that read the constants
    /// * `offset` - Offset in bytes into the range
    /// * `data` - Bytes to push
    fn push_constants(
        &mut self,
        layout: &Arc<dyn PipelineLayout>,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()>;

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, offset: u64, index_type: IndexType) -> Result<()>;

    fn draw_indexed(&mut self, draw: DrawIndexed) -> Result<()>;

    /// Copy `size` bytes from the start of `src` to the start of `dst` (outside render passes)
    fn copy_buffer(&mut self, src: &Arc<dyn Buffer>, dst: &Arc<dyn Buffer>, size: u64) -> Result<()>;

    fn as_any(&self) -> &dyn Any;
}
