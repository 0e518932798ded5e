/*!
# Umbra Engine - Vulkan Backend

Vulkan implementation of the Umbra deferred renderer's device layer.

This crate implements the `umbra_engine` device traits (`GraphicsDevice`,
`Swapchain`, `CommandList` and the GPU object traits) on top of Ash, with
gpu-allocator for buffer and texture memory. Render targets take dedicated
device-local memory chosen through the engine's memory-type helper.

```no_run
use umbra_engine::umbra::RendererConfig;
use umbra_engine_renderer_vulkan::umbra::VulkanDevice;
# fn run(window: &winit::window::Window) -> umbra_engine::umbra::Result<()> {
let config = RendererConfig::default();
let device = VulkanDevice::new(window, &config)?;
let swapchain = device.create_swapchain(window, config.width, config.height, config.vsync)?;
# Ok(())
# }
```
*/

mod vulkan;
mod vulkan_context;
mod vulkan_buffer;
mod vulkan_texture;
mod vulkan_sampler;
mod vulkan_render_pass;
mod vulkan_frame_buffer;
mod vulkan_pipeline;
mod vulkan_descriptor_set;
mod vulkan_sync;
mod vulkan_command_list;
mod vulkan_swapchain;

#[cfg(feature = "vulkan-validation")]
mod debug;

pub mod umbra {
    pub use crate::vulkan::VulkanDevice;
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;
    pub use crate::vulkan_command_list::CommandList as VulkanCommandList;
    pub use crate::vulkan_buffer::Buffer as VulkanBuffer;
    pub use crate::vulkan_texture::Texture as VulkanTexture;

    #[cfg(feature = "vulkan-validation")]
    pub use crate::debug::{get_validation_stats, print_validation_stats_report, ValidationStats};
}
