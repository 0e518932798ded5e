/// RenderPass - Vulkan implementation of the RenderPass trait

use umbra_engine::umbra::device::RenderPass as RendererRenderPass;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan render pass implementation
///
/// Simple wrapper around vk::RenderPass
pub struct RenderPass {
    /// Shared GPU context (for cleanup)
    ctx: Arc<GpuContext>,
    /// Vulkan render pass handle
    pub(crate) render_pass: vk::RenderPass,
    color_attachment_count: u32,
}

impl RenderPass {
    pub(crate) fn new(ctx: Arc<GpuContext>, render_pass: vk::RenderPass, color_attachment_count: u32) -> Self {
        Self { ctx, render_pass, color_attachment_count }
    }
}

impl RendererRenderPass for RenderPass {
    fn color_attachment_count(&self) -> u32 {
        self.color_attachment_count
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_render_pass(self.render_pass, None);
        }
    }
}
