/// Swapchain - Vulkan implementation of the Swapchain trait

use umbra_engine::umbra::{Result, Error};
use umbra_engine::umbra::device::{
    ImageAspect, ImageUsage, Semaphore as RendererSemaphore, Swapchain as RendererSwapchain,
    Texture as RendererTexture, TextureFormat, TextureInfo,
};
use umbra_engine::{engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

use crate::vulkan::vk_to_format;
use crate::vulkan_context::{downcast, GpuContext};
use crate::vulkan_sync::Semaphore;
use crate::vulkan_texture::{Texture, TextureMemory};

/// Vulkan swapchain implementation
///
/// Owns the window surface. Presentation goes through the graphics queue,
/// which must support the surface.
pub struct Swapchain {
    /// Shared GPU context (device, queue)
    ctx: Arc<GpuContext>,

    /// Surface
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Swapchain
    swapchain: vk::SwapchainKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    /// Presentable images wrapped as non-owning textures
    images: Vec<Arc<dyn RendererTexture>>,
    swapchain_format: vk::Format,
    swapchain_extent: vk::Extent2D,

    /// FIFO when true, otherwise the lowest-latency mode available
    vsync: bool,
}

impl Swapchain {
    /// Create the window surface and a swapchain of the requested size
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `window` - Window to present to
    /// * `width`, `height` - Requested size (the surface may impose its own)
    /// * `vsync` - Lock presentation to the display refresh
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        ctx: Arc<GpuContext>,
        window: &W,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        unsafe {
            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;

            let surface = ash_window::create_surface(
                &ctx.entry,
                &ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&ctx.entry, &ctx.instance);

            let supported = surface_loader
                .get_physical_device_surface_support(ctx.physical_device, ctx.graphics_queue_family, surface)
                .unwrap_or(false);
            if !supported {
                surface_loader.destroy_surface(surface, None);
                engine_error!("umbra::vulkan", "Graphics queue family cannot present to this surface");
                return Err(Error::InitializationFailed("Graphics queue cannot present".to_string()));
            }

            let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

            let mut swapchain = Self {
                ctx,
                surface,
                surface_loader,
                swapchain: vk::SwapchainKHR::null(),
                swapchain_loader,
                images: Vec::new(),
                swapchain_format: vk::Format::UNDEFINED,
                swapchain_extent: vk::Extent2D { width, height },
                vsync,
            };
            swapchain.build(width, height)?;

            engine_info!("umbra::vulkan", "Swapchain created: {}x{}, {} images, {:?}",
                swapchain.swapchain_extent.width,
                swapchain.swapchain_extent.height,
                swapchain.images.len(),
                swapchain.swapchain_format);

            Ok(swapchain)
        }
    }

    /// Pick the surface format, preferring 8-bit sRGB
    fn choose_surface_format(&self) -> Result<vk::SurfaceFormatKHR> {
        let surface_formats = unsafe {
            self.surface_loader
                .get_physical_device_surface_formats(self.ctx.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?
        };

        let preferred = surface_formats.iter().find(|sf| {
            (sf.format == vk::Format::B8G8R8A8_SRGB || sf.format == vk::Format::R8G8B8A8_SRGB)
                && sf.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        });

        // Only formats the engine can describe are usable as attachments
        preferred
            .or_else(|| surface_formats.iter().find(|sf| vk_to_format(sf.format).is_some()))
            .copied()
            .ok_or_else(|| {
                engine_error!("umbra::vulkan", "No supported surface format among {} offered", surface_formats.len());
                Error::InitializationFailed("No supported surface format".to_string())
            })
    }

    fn choose_present_mode(&self) -> vk::PresentModeKHR {
        if self.vsync {
            return vk::PresentModeKHR::FIFO;
        }

        let modes = unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
                .unwrap_or_default()
        };

        [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
            .into_iter()
            .find(|mode| modes.contains(mode))
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    /// (Re)build the swapchain and its image textures, retiring the old one
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let surface_capabilities = self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get surface capabilities: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface capabilities: {:?}", e))
                })?;

            let surface_format = self.choose_surface_format()?;
            let present_mode = self.choose_present_mode();

            // Choose extent
            let extent = if surface_capabilities.current_extent.width != u32::MAX {
                surface_capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: width.clamp(
                        surface_capabilities.min_image_extent.width,
                        surface_capabilities.max_image_extent.width,
                    ),
                    height: height.clamp(
                        surface_capabilities.min_image_extent.height,
                        surface_capabilities.max_image_extent.height,
                    ),
                }
            };

            let image_count = surface_capabilities.min_image_count + 1;
            let image_count = if surface_capabilities.max_image_count > 0 {
                image_count.min(surface_capabilities.max_image_count)
            } else {
                image_count
            };

            let old_swapchain = self.swapchain;
            let swapchain_create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(image_count)
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(surface_capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self.swapchain_loader
                .create_swapchain(&swapchain_create_info, None)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create swapchain: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create swapchain: {:?}", e))
                })?;

            // Destroy old swapchain
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.swapchain_extent = extent;
            self.swapchain_format = surface_format.format;

            let swapchain_images = self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get swapchain images: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get swapchain images: {:?}", e))
                })?;

            let format = vk_to_format(surface_format.format).unwrap_or(TextureFormat::B8G8R8A8_UNORM);
            let mut images: Vec<Arc<dyn RendererTexture>> = Vec::with_capacity(swapchain_images.len());
            for image in swapchain_images {
                let create_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = self.ctx.device.create_image_view(&create_info, None)
                    .map_err(|e| {
                        engine_error!("umbra::vulkan", "Failed to create swapchain image view: {:?}", e);
                        Error::InitializationFailed(format!("Failed to create image view: {:?}", e))
                    })?;

                images.push(Arc::new(Texture::new(
                    Arc::clone(&self.ctx),
                    image,
                    view,
                    TextureMemory::External,
                    TextureInfo {
                        width: extent.width,
                        height: extent.height,
                        format,
                        usage: ImageUsage::COLOR_ATTACHMENT,
                        aspect: ImageAspect::COLOR,
                    },
                )));
            }
            self.images = images;

            Ok(())
        }
    }
}

impl RendererSwapchain for Swapchain {
    fn acquire_next_image(&mut self, signal: &dyn RendererSemaphore) -> Result<(u32, bool)> {
        let signal = downcast::<Semaphore>(signal.as_any(), "Semaphore")?;

        unsafe {
            match self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                signal.semaphore,
                vk::Fence::null(),
            ) {
                Ok((index, suboptimal)) => Ok((index, suboptimal)),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                    engine_warn!("umbra::vulkan", "Swapchain out of date during acquire");
                    Err(Error::NotReady("Swapchain out of date".to_string()))
                }
                Err(e) => Err(engine_err!("umbra::vulkan", "Failed to acquire swapchain image: {:?}", e)),
            }
        }
    }

    fn present(&mut self, image_index: u32, wait: &dyn RendererSemaphore) -> Result<bool> {
        let wait = downcast::<Semaphore>(wait.as_any(), "Semaphore")?;

        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait.semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let _queue = self.ctx.queue_lock.lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Queue lock poisoned"))?;

        unsafe {
            match self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info) {
                Ok(suboptimal) => Ok(suboptimal),
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(true),
                Err(e) => Err(engine_err!("umbra::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<Arc<dyn RendererTexture>> {
        self.images.get(index).cloned()
    }

    fn extent(&self) -> (u32, u32) {
        (self.swapchain_extent.width, self.swapchain_extent.height)
    }

    fn format(&self) -> TextureFormat {
        vk_to_format(self.swapchain_format).unwrap_or(TextureFormat::B8G8R8A8_UNORM)
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait idle before swapchain recreate: {:?}", e))?;
        }

        self.build(width, height)?;

        engine_info!("umbra::vulkan", "Swapchain recreated: {}x{}",
            self.swapchain_extent.width, self.swapchain_extent.height);

        Ok(())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            // Wait for device to finish
            self.ctx.device.device_wait_idle().ok();

            // Image views go before their swapchain
            self.images.clear();

            self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}
