/// Pipeline and PipelineLayout - Vulkan implementations of the pipeline traits

use umbra_engine::umbra::device::{
    DescriptorBinding, Pipeline as RendererPipeline, PipelineLayout as RendererPipelineLayout,
};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan pipeline layout implementation
pub struct PipelineLayout {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Bindings of each set, indexed by set number (checked against shader reflection)
    pub(crate) set_bindings: Vec<Vec<DescriptorBinding>>,
    /// Total push constant bytes declared
    pub(crate) push_constant_size: u32,
}

impl PipelineLayout {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline_layout: vk::PipelineLayout,
        set_bindings: Vec<Vec<DescriptorBinding>>,
        push_constant_size: u32,
    ) -> Self {
        Self { ctx, pipeline_layout, set_bindings, push_constant_size }
    }
}

impl RendererPipelineLayout for PipelineLayout {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for PipelineLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}

/// Vulkan pipeline implementation
pub struct Pipeline {
    ctx: Arc<GpuContext>,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Layout the pipeline was built with (kept alive with it)
    _layout: Arc<dyn RendererPipelineLayout>,
}

impl Pipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: vk::Pipeline,
        layout: Arc<dyn RendererPipelineLayout>,
    ) -> Self {
        Self { ctx, pipeline, _layout: layout }
    }
}

impl RendererPipeline for Pipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
