/// Texture - Vulkan implementation of the Texture trait

use umbra_engine::umbra::device::{Texture as RendererTexture, TextureInfo};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Memory backing a texture
pub(crate) enum TextureMemory {
    /// Sub-allocation from the shared allocator (sampled textures)
    Allocator(Allocation),
    /// Dedicated `vkAllocateMemory` block (render targets)
    Dedicated(vk::DeviceMemory),
    /// Image owned by someone else (swapchain images): only the view is ours
    External,
}

/// Vulkan texture implementation
pub struct Texture {
    /// Shared GPU context (for cleanup)
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// Backing memory
    memory: Option<TextureMemory>,
    /// Read-only texture properties
    pub(crate) info: TextureInfo,
}

impl Texture {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        memory: TextureMemory,
        info: TextureInfo,
    ) -> Self {
        Self {
            ctx,
            image,
            view,
            memory: Some(memory),
            info,
        }
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            // Destroy image view
            self.ctx.device.destroy_image_view(self.view, None);

            match self.memory.take() {
                Some(TextureMemory::Allocator(allocation)) => {
                    if let Ok(mut allocator) = self.ctx.allocator.lock() {
                        allocator.free(allocation).ok();
                    }
                    self.ctx.device.destroy_image(self.image, None);
                }
                Some(TextureMemory::Dedicated(memory)) => {
                    self.ctx.device.destroy_image(self.image, None);
                    self.ctx.device.free_memory(memory, None);
                }
                Some(TextureMemory::External) | None => {}
            }
        }
    }
}
