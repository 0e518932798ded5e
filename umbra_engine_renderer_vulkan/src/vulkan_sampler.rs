/// Sampler - Vulkan implementation of the Sampler trait

use umbra_engine::umbra::device::Sampler as RendererSampler;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan sampler implementation
pub struct Sampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
}

impl Sampler {
    pub(crate) fn new(ctx: Arc<GpuContext>, sampler: vk::Sampler) -> Self {
        Self { ctx, sampler }
    }
}

impl RendererSampler for Sampler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
