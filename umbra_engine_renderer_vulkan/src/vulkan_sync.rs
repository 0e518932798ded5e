/// Semaphore - Vulkan implementation of the Semaphore trait

use umbra_engine::umbra::device::Semaphore as RendererSemaphore;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Binary VkSemaphore, destroyed when dropped
pub struct Semaphore {
    ctx: Arc<GpuContext>,
    pub(crate) semaphore: vk::Semaphore,
}

impl Semaphore {
    pub(crate) fn new(ctx: Arc<GpuContext>, semaphore: vk::Semaphore) -> Self {
        Self { ctx, semaphore }
    }
}

impl RendererSemaphore for Semaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_semaphore(self.semaphore, None);
        }
    }
}
