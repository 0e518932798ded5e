/// Framebuffer - Vulkan implementation of the Framebuffer trait
///
/// Wraps a VkFramebuffer that groups color and depth/stencil attachments.
/// Holds its attachment textures so their views outlive the framebuffer.

use umbra_engine::umbra::device::{Framebuffer as RendererFramebuffer, Texture as RendererTexture};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan framebuffer implementation
///
/// Wraps a VkFramebuffer. Destroyed when dropped.
pub struct Framebuffer {
    /// Shared GPU context (for cleanup)
    ctx: Arc<GpuContext>,
    /// Vulkan framebuffer handle
    pub(crate) framebuffer: vk::Framebuffer,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
    _attachments: Vec<Arc<dyn RendererTexture>>,
}

impl Framebuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        framebuffer: vk::Framebuffer,
        width: u32,
        height: u32,
        attachments: Vec<Arc<dyn RendererTexture>>,
    ) -> Self {
        Self { ctx, framebuffer, width, height, _attachments: attachments }
    }
}

impl RendererFramebuffer for Framebuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_framebuffer(self.framebuffer, None);
        }
    }
}
