/// VulkanDevice - Vulkan implementation of the GraphicsDevice trait

use umbra_engine::umbra::{Result, Error, RendererConfig};
use umbra_engine::umbra::device::{
    GraphicsDevice, Submission,
    Buffer as RendererBuffer, BufferDesc, BufferUsage, MemoryLocation,
    Texture as RendererTexture, TextureDesc, TextureInfo, TextureFormat, ImageDesc, ImageUsage, ImageAspect,
    Sampler as RendererSampler, SamplerDesc, Filter, AddressMode, BorderColor,
    RenderPass as RendererRenderPass, RenderPassDesc, AttachmentDesc, LoadOp, StoreOp, ImageLayout,
    SUBPASS_EXTERNAL,
    Framebuffer as RendererFramebuffer, FramebufferDesc,
    DescriptorSetLayout as RendererDescriptorSetLayout, DescriptorSetLayoutDesc, DescriptorType,
    PipelineLayout as RendererPipelineLayout, PipelineLayoutDesc,
    Pipeline as RendererPipeline, PipelineDesc, VertexFormat, CullMode, FrontFace, CompareOp,
    DescriptorPool as RendererDescriptorPool, DescriptorPoolDesc,
    DescriptorSet as RendererDescriptorSet, DescriptorWrite, DescriptorResource,
    Semaphore as RendererSemaphore, CommandList as RendererCommandList,
    PipelineStages, AccessFlags, ShaderStages,
    MemoryProperties, MemoryPropertyFlags, MemoryType,
};
use ash::vk;
use std::path::Path;
use std::sync::Arc;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use umbra_engine::{engine_debug, engine_info, engine_warn, engine_error, engine_bail, engine_bail_warn, engine_err};

use crate::vulkan_buffer::Buffer;
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::{downcast, GpuContext};
use crate::vulkan_descriptor_set::{DescriptorPool, DescriptorSet, DescriptorSetLayout};
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::{Pipeline, PipelineLayout};
use crate::vulkan_render_pass::RenderPass;
use crate::vulkan_sampler::Sampler;
use crate::vulkan_swapchain::Swapchain;
use crate::vulkan_sync::Semaphore;
use crate::vulkan_texture::{Texture, TextureMemory};

/// Depth formats tried in order of preference
const DEPTH_FORMAT_CANDIDATES: [TextureFormat; 4] = [
    TextureFormat::D32_SFLOAT_S8_UINT,
    TextureFormat::D32_SFLOAT,
    TextureFormat::D24_UNORM_S8_UINT,
    TextureFormat::D16_UNORM,
];

/// Vulkan device implementation
///
/// Central object for creating resources and submitting commands.
/// Presentation lives in `Swapchain`, created through `create_swapchain`.
pub struct VulkanDevice {
    /// Memory type table of the physical device
    memory_properties: MemoryProperties,
    /// Best supported depth/stencil attachment format
    depth_format: TextureFormat,
    /// Device limit for sampler anisotropy
    max_sampler_anisotropy: f32,
    /// Shared GPU context for all resources
    /// Owns device, instance and debug messenger destruction
    gpu_context: Arc<GpuContext>,
}

impl VulkanDevice {
    /// Create a new Vulkan device
    ///
    /// # Arguments
    ///
    /// * `window` - Window the device must be able to present to
    /// * `config` - Renderer configuration (application name, validation)
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &RendererConfig,
    ) -> Result<Self> {
        // Validation needs both the runtime flag and the compiled-in callback
        let enable_validation = cfg!(feature = "vulkan-validation") && config.enable_validation;
        if config.enable_validation && !enable_validation {
            engine_warn!("umbra::vulkan",
                "Validation requested but the backend was built without the vulkan-validation feature");
        }

        unsafe {
            // Create Vulkan Entry
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            // Application Info
            let app_name = std::ffi::CString::new(config.app_name.as_str())
                .unwrap_or_else(|_| c"Umbra Application".to_owned());
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, 1, 0, 0))
                .engine_name(c"Umbra")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            // Get required extensions
            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            // Add debug utils extension if validation is enabled
            if enable_validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }

            // Validation layers
            let layer_names = if enable_validation {
                vec![c"VK_LAYER_KHRONOS_validation".as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let (debug_utils_loader, debug_messenger) = if enable_validation {
                Self::create_debug_messenger(&entry, &instance)?
            } else {
                (None, None)
            };

            // Temporary surface, only to pick a queue family that can present
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

            // Pick Physical Device
            let physical_devices = instance
                .enumerate_physical_devices()
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to enumerate physical devices: {:?}", e);
                    Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
                })?;

            let physical_device = physical_devices
                .into_iter()
                .next()
                .ok_or_else(|| {
                    engine_error!("umbra::vulkan", "No Vulkan-capable GPU found");
                    Error::InitializationFailed("No Vulkan-capable GPU found".to_string())
                })?;

            // One queue for graphics, uploads and presentation
            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);

            let graphics_family_index = queue_families
                .iter()
                .enumerate()
                .find(|(i, qf)| {
                    qf.queue_flags.contains(vk::QueueFlags::GRAPHICS)
                        && surface_loader
                            .get_physical_device_surface_support(physical_device, *i as u32, surface)
                            .unwrap_or(false)
                })
                .map(|(i, _)| i as u32)
                .ok_or_else(|| {
                    engine_error!("umbra::vulkan", "No queue family supports both graphics and present");
                    Error::InitializationFailed("No graphics/present queue family found".to_string())
                })?;

            // Destroy temporary surface
            surface_loader.destroy_surface(surface, None);

            // Create Logical Device
            let queue_priorities = [1.0];
            let queue_create_infos = [
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(graphics_family_index)
                    .queue_priorities(&queue_priorities),
            ];

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];

            let supported_features = instance.get_physical_device_features(physical_device);
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(supported_features.sampler_anisotropy == vk::TRUE);

            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(graphics_family_index, 0);

            // Create GPU allocator
            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            // Create upload command pool (TRANSIENT + RESET for reusable one-shot uploads)
            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(graphics_family_index)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let memory_properties = Self::query_memory_properties(&instance, physical_device);
            let depth_format = Self::select_depth_format(&instance, physical_device)?;
            let limits = instance.get_physical_device_properties(physical_device).limits;
            let max_sampler_anisotropy = if supported_features.sampler_anisotropy == vk::TRUE {
                limits.max_sampler_anisotropy
            } else {
                1.0
            };

            let properties = instance.get_physical_device_properties(physical_device);
            let device_name = std::ffi::CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned();
            engine_info!("umbra::vulkan", "Vulkan device created on {} (depth format {:?}, {} memory types)",
                device_name, depth_format, memory_properties.memory_types.len());

            let gpu_context = Arc::new(GpuContext::new(
                entry,
                instance,
                physical_device,
                device,
                allocator,
                graphics_queue,
                graphics_family_index,
                upload_command_pool,
                debug_utils_loader,
                debug_messenger,
            ));

            Ok(Self {
                memory_properties,
                depth_format,
                max_sampler_anisotropy,
                gpu_context,
            })
        }
    }

    #[cfg(feature = "vulkan-validation")]
    unsafe fn create_debug_messenger(
        entry: &ash::Entry,
        instance: &ash::Instance,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        let debug_utils = ash::ext::debug_utils::Instance::new(entry, instance);

        crate::debug::init_debug_config();

        let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(crate::debug::severity_flags())
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE
            )
            .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

        let messenger = debug_utils
            .create_debug_utils_messenger(&debug_info, None)
            .map_err(|e| {
                engine_error!("umbra::vulkan", "Failed to create debug messenger: {:?}", e);
                Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e))
            })?;

        Ok((Some(debug_utils), Some(messenger)))
    }

    #[cfg(not(feature = "vulkan-validation"))]
    unsafe fn create_debug_messenger(
        _entry: &ash::Entry,
        _instance: &ash::Instance,
    ) -> Result<(Option<ash::ext::debug_utils::Instance>, Option<vk::DebugUtilsMessengerEXT>)> {
        Ok((None, None))
    }

    /// Mirror the physical device memory type table
    unsafe fn query_memory_properties(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> MemoryProperties {
        let properties = instance.get_physical_device_memory_properties(physical_device);
        let memory_types = properties.memory_types[..properties.memory_type_count as usize]
            .iter()
            .map(|memory_type| MemoryType {
                property_flags: MemoryPropertyFlags::from_bits_truncate(memory_type.property_flags.as_raw()),
                heap_index: memory_type.heap_index,
            })
            .collect();
        MemoryProperties { memory_types }
    }

    /// First candidate usable as an optimal-tiling depth/stencil attachment
    unsafe fn select_depth_format(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Result<TextureFormat> {
        DEPTH_FORMAT_CANDIDATES
            .into_iter()
            .find(|format| {
                let properties = instance.get_physical_device_format_properties(physical_device, format_to_vk(*format));
                properties
                    .optimal_tiling_features
                    .contains(vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT)
            })
            .ok_or_else(|| {
                engine_error!("umbra::vulkan", "No supported depth attachment format");
                Error::InitializationFailed("No supported depth format".to_string())
            })
    }

    /// Create the presentation swapchain for `window`
    ///
    /// # Arguments
    ///
    /// * `window` - Window to present to (the same one the device was created for)
    /// * `width`, `height` - Requested size
    /// * `vsync` - FIFO presentation when true
    pub fn create_swapchain<W: HasDisplayHandle + HasWindowHandle>(
        &self,
        window: &W,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Swapchain> {
        Swapchain::new(Arc::clone(&self.gpu_context), window, width, height, vsync)
    }

    /// Create a 2D image with one mip level and one layer
    unsafe fn create_vk_image(
        &self,
        width: u32,
        height: u32,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
    ) -> Result<vk::Image> {
        let image_create_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .format(format)
            .extent(vk::Extent3D { width, height, depth: 1 })
            .mip_levels(1)
            .array_layers(1)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        self.gpu_context.device.create_image(&image_create_info, None)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to create {}x{} image: {:?}", width, height, e))
    }

    unsafe fn create_vk_image_view(
        &self,
        image: vk::Image,
        format: vk::Format,
        aspect: vk::ImageAspectFlags,
    ) -> Result<vk::ImageView> {
        let view_create_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: aspect,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        self.gpu_context.device.create_image_view(&view_create_info, None)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to create image view: {:?}", e))
    }

    /// Allocate from the shared allocator, mapping failure to OutOfMemory
    fn allocate(
        &self,
        name: &str,
        requirements: vk::MemoryRequirements,
        location: gpu_allocator::MemoryLocation,
        linear: bool,
    ) -> Result<Allocation> {
        let mut allocator = self.gpu_context.allocator.lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Allocator lock poisoned"))?;
        allocator.allocate(&AllocationCreateDesc {
            name,
            requirements,
            location,
            linear,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        })
        .map_err(|e| {
            let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
            engine_error!("umbra::vulkan", "Out of GPU memory for {} (required: {:.2} MB): {:?}", name, size_mb, e);
            Error::OutOfMemory
        })
    }

    fn free_allocation(&self, allocation: Allocation) {
        if let Ok(mut allocator) = self.gpu_context.allocator.lock() {
            allocator.free(allocation).ok();
        }
    }

    /// Record and run the staging copy into a freshly created image
    ///
    /// Transitions UNDEFINED -> TRANSFER_DST -> SHADER_READ_ONLY around the copy
    /// and blocks until the queue is idle.
    unsafe fn upload_image(&self, image: vk::Image, staging: vk::Buffer, width: u32, height: u32) -> Result<()> {
        let ctx = &self.gpu_context;
        let pool = ctx.upload_command_pool.lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Upload command pool lock poisoned"))?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(*pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let command_buffer = ctx.device.allocate_command_buffers(&alloc_info)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

        let result = (|| -> Result<()> {
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            ctx.device.begin_command_buffer(command_buffer, &begin_info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

            let subresource_range = vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            };

            // UNDEFINED -> TRANSFER_DST
            let to_transfer = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            ctx.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TOP_OF_PIPE,
                vk::PipelineStageFlags::TRANSFER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_transfer],
            );

            let region = vk::BufferImageCopy::default()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D { width, height, depth: 1 });

            ctx.device.cmd_copy_buffer_to_image(
                command_buffer,
                staging,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );

            // TRANSFER_DST -> SHADER_READ_ONLY
            let to_shader_read = vk::ImageMemoryBarrier::default()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(subresource_range)
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            ctx.device.cmd_pipeline_barrier(
                command_buffer,
                vk::PipelineStageFlags::TRANSFER,
                vk::PipelineStageFlags::FRAGMENT_SHADER,
                vk::DependencyFlags::empty(),
                &[],
                &[],
                &[to_shader_read],
            );

            ctx.device.end_command_buffer(command_buffer)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to end upload command buffer: {:?}", e))?;

            let command_buffers = [command_buffer];
            let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
            {
                let _queue = ctx.queue_lock.lock()
                    .map_err(|_| engine_err!("umbra::vulkan", "Queue lock poisoned"))?;
                ctx.device.queue_submit(ctx.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit texture upload: {:?}", e))?;
            }
            ctx.queue_wait_idle()
        })();

        ctx.device.free_command_buffers(*pool, &[command_buffer]);
        result
    }

    /// Read a SPIR-V binary from disk
    fn load_spirv(path: &Path) -> Result<Vec<u32>> {
        let mut file = std::fs::File::open(path).map_err(|e| {
            engine_error!("umbra::vulkan", "Failed to open shader {}: {}", path.display(), e);
            Error::AssetLoad(format!("Failed to open shader {}: {}", path.display(), e))
        })?;
        ash::util::read_spv(&mut file).map_err(|e| {
            engine_error!("umbra::vulkan", "Invalid SPIR-V in {}: {}", path.display(), e);
            Error::AssetLoad(format!("Invalid SPIR-V in {}: {}", path.display(), e))
        })
    }

    /// Warn about shader descriptor bindings the pipeline layout does not declare
    ///
    /// Reflection failures are reported but not fatal: the driver is the
    /// final judge of layout compatibility.
    fn check_shader_bindings(code: &[u32], path: &Path, layout: &PipelineLayout) {
        let entry_points = match spirq::ReflectConfig::new()
            .spv(code)
            .ref_all_rscs(true)
            .reflect()
        {
            Ok(entry_points) => entry_points,
            Err(e) => {
                engine_warn!("umbra::vulkan", "SPIR-V reflection failed for {}: {:?}", path.display(), e);
                return;
            }
        };

        for entry_point in &entry_points {
            for var in entry_point.vars.iter() {
                if let spirq::var::Variable::Descriptor { desc_bind, desc_ty, .. } = var {
                    let (set, binding) = (desc_bind.set(), desc_bind.bind());
                    let declared = layout
                        .set_bindings
                        .get(set as usize)
                        .and_then(|bindings| bindings.iter().find(|b| b.binding == binding));

                    let expected = match desc_ty {
                        spirq::ty::DescriptorType::UniformBuffer() => Some(DescriptorType::UniformBuffer),
                        spirq::ty::DescriptorType::CombinedImageSampler() => Some(DescriptorType::CombinedImageSampler),
                        _ => None,
                    };

                    match declared {
                        None => engine_warn!("umbra::vulkan",
                            "{} uses set {} binding {} which the pipeline layout does not declare",
                            path.display(), set, binding),
                        Some(b) if expected.is_some_and(|t| t != b.descriptor_type) => engine_warn!("umbra::vulkan",
                            "{} set {} binding {} is {:?} in the shader but {:?} in the layout",
                            path.display(), set, binding, desc_ty, b.descriptor_type),
                        Some(_) => {}
                    }
                }
            }
        }
    }

    unsafe fn create_shader_module(&self, code: &[u32], path: &Path) -> Result<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);
        self.gpu_context.device.create_shader_module(&create_info, None)
            .map_err(|e| engine_err!("umbra::vulkan", "Failed to create shader module for {}: {:?}", path.display(), e))
    }
}

impl GraphicsDevice for VulkanDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        if desc.size == 0 {
            engine_bail_warn!("umbra::vulkan", "Cannot create a zero-sized buffer");
        }

        let device = &self.gpu_context.device;
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(desc.size)
                .usage(buffer_usage_to_vk(desc.usage))
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create buffer of size {} bytes: {:?}", desc.size, e))?;

            let requirements = device.get_buffer_memory_requirements(buffer);
            let location = match desc.location {
                MemoryLocation::CpuToGpu => gpu_allocator::MemoryLocation::CpuToGpu,
                MemoryLocation::GpuOnly => gpu_allocator::MemoryLocation::GpuOnly,
            };

            let allocation = match self.allocate("buffer", requirements, location, true) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.free_allocation(allocation);
                device.destroy_buffer(buffer, None);
                engine_bail!("umbra::vulkan", "Failed to bind buffer memory: {:?}", e);
            }

            Ok(Arc::new(Buffer::new(
                Arc::clone(&self.gpu_context),
                buffer,
                allocation,
                desc.size,
            )))
        }
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn RendererTexture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail_warn!("umbra::vulkan", "Cannot create a {}x{} image", desc.width, desc.height);
        }

        let device = &self.gpu_context.device;
        let vk_format = format_to_vk(desc.format);
        unsafe {
            let image = self.create_vk_image(desc.width, desc.height, vk_format, image_usage_to_vk(desc.usage))?;

            // Render targets get their own block of device-local memory
            let requirements = device.get_image_memory_requirements(image);
            let memory_type_index = match self.memory_properties
                .memory_type_index(requirements.memory_type_bits, MemoryPropertyFlags::DEVICE_LOCAL)
            {
                Ok(index) => index,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            let alloc_info = vk::MemoryAllocateInfo::default()
                .allocation_size(requirements.size)
                .memory_type_index(memory_type_index);

            let memory = match device.allocate_memory(&alloc_info, None) {
                Ok(memory) => memory,
                Err(e) => {
                    device.destroy_image(image, None);
                    engine_error!("umbra::vulkan", "Failed to allocate {} bytes for {}x{} {:?} image: {:?}",
                        requirements.size, desc.width, desc.height, desc.format, e);
                    return Err(Error::OutOfMemory);
                }
            };

            let bound = device.bind_image_memory(image, memory, 0)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to bind image memory: {:?}", e))
                .and_then(|_| self.create_vk_image_view(image, vk_format, image_aspect_to_vk(desc.aspect)));

            let view = match bound {
                Ok(view) => view,
                Err(e) => {
                    device.destroy_image(image, None);
                    device.free_memory(memory, None);
                    return Err(e);
                }
            };

            engine_debug!("umbra::vulkan", "Created {}x{} {:?} image ({} bytes, memory type {})",
                desc.width, desc.height, desc.format, requirements.size, memory_type_index);

            Ok(Arc::new(Texture::new(
                Arc::clone(&self.gpu_context),
                image,
                view,
                TextureMemory::Dedicated(memory),
                TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage: desc.usage,
                    aspect: desc.aspect,
                },
            )))
        }
    }

    fn create_texture(&self, desc: &TextureDesc, pixels: &[u8]) -> Result<Arc<dyn RendererTexture>> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail_warn!("umbra::vulkan", "Cannot create a {}x{} texture", desc.width, desc.height);
        }
        if desc.format.is_depth() {
            engine_bail_warn!("umbra::vulkan", "Depth format {:?} cannot be uploaded as a texture", desc.format);
        }
        let expected = desc.width as u64 * desc.height as u64 * desc.format.bytes_per_pixel() as u64;
        if pixels.len() as u64 != expected {
            engine_bail_warn!("umbra::vulkan",
                "Texture data size mismatch: got {} bytes, expected {} ({}x{} {:?})",
                pixels.len(), expected, desc.width, desc.height, desc.format);
        }

        let device = &self.gpu_context.device;
        let vk_format = format_to_vk(desc.format);
        let usage = ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED;

        unsafe {
            let image = self.create_vk_image(desc.width, desc.height, vk_format, image_usage_to_vk(usage))?;
            let requirements = device.get_image_memory_requirements(image);
            let allocation = match self.allocate("texture", requirements, gpu_allocator::MemoryLocation::GpuOnly, false) {
                Ok(allocation) => allocation,
                Err(e) => {
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            if let Err(e) = device.bind_image_memory(image, allocation.memory(), allocation.offset()) {
                self.free_allocation(allocation);
                device.destroy_image(image, None);
                engine_bail!("umbra::vulkan", "Failed to bind texture memory: {:?}", e);
            }

            // Staging buffer holds the pixels for the copy
            let staging = self.create_buffer(&BufferDesc::staging(expected))
                .and_then(|buffer| buffer.update(0, pixels).map(|_| buffer));
            let uploaded = staging.and_then(|staging| {
                let vk_staging = downcast::<Buffer>(staging.as_any(), "Buffer")?;
                self.upload_image(image, vk_staging.buffer, desc.width, desc.height)
            });

            let view = uploaded.and_then(|_| self.create_vk_image_view(image, vk_format, vk::ImageAspectFlags::COLOR));
            let view = match view {
                Ok(view) => view,
                Err(e) => {
                    self.free_allocation(allocation);
                    device.destroy_image(image, None);
                    return Err(e);
                }
            };

            Ok(Arc::new(Texture::new(
                Arc::clone(&self.gpu_context),
                image,
                view,
                TextureMemory::Allocator(allocation),
                TextureInfo {
                    width: desc.width,
                    height: desc.height,
                    format: desc.format,
                    usage,
                    aspect: ImageAspect::COLOR,
                },
            )))
        }
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn RendererSampler>> {
        let address_mode = address_mode_to_vk(desc.address_mode);
        let anisotropy = desc.max_anisotropy.map(|a| a.min(self.max_sampler_anisotropy));
        let sampler_info = vk::SamplerCreateInfo::default()
            .mag_filter(filter_to_vk(desc.mag_filter))
            .min_filter(filter_to_vk(desc.min_filter))
            .mipmap_mode(match desc.mipmap_filter {
                Filter::Nearest => vk::SamplerMipmapMode::NEAREST,
                Filter::Linear => vk::SamplerMipmapMode::LINEAR,
            })
            .address_mode_u(address_mode)
            .address_mode_v(address_mode)
            .address_mode_w(address_mode)
            .mip_lod_bias(0.0)
            .anisotropy_enable(anisotropy.is_some_and(|a| a > 1.0))
            .max_anisotropy(anisotropy.unwrap_or(1.0))
            .compare_enable(false)
            .compare_op(vk::CompareOp::NEVER)
            .min_lod(desc.min_lod)
            .max_lod(desc.max_lod)
            .border_color(border_color_to_vk(desc.border_color))
            .unnormalized_coordinates(false);

        let sampler = unsafe {
            self.gpu_context.device.create_sampler(&sampler_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create sampler: {:?}", e))?
        };

        Ok(Arc::new(Sampler::new(Arc::clone(&self.gpu_context), sampler)))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RendererRenderPass>> {
        if desc.color_attachments.is_empty() && desc.depth_attachment.is_none() {
            engine_bail_warn!("umbra::vulkan", "Render pass needs at least one attachment");
        }

        let attachment_to_vk = |attachment: &AttachmentDesc| {
            vk::AttachmentDescription::default()
                .format(format_to_vk(attachment.format))
                .samples(vk::SampleCountFlags::TYPE_1)
                .load_op(load_op_to_vk(attachment.load_op))
                .store_op(store_op_to_vk(attachment.store_op))
                .stencil_load_op(load_op_to_vk(attachment.stencil_load_op))
                .stencil_store_op(store_op_to_vk(attachment.stencil_store_op))
                .initial_layout(image_layout_to_vk(attachment.initial_layout))
                .final_layout(image_layout_to_vk(attachment.final_layout))
        };

        // Colors first, then depth
        let mut attachments: Vec<vk::AttachmentDescription> =
            desc.color_attachments.iter().map(attachment_to_vk).collect();

        let color_refs: Vec<vk::AttachmentReference> = (0..desc.color_attachments.len() as u32)
            .map(|i| vk::AttachmentReference {
                attachment: i,
                layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            })
            .collect();

        let depth_ref = desc.depth_attachment.as_ref().map(|depth| {
            attachments.push(attachment_to_vk(depth));
            vk::AttachmentReference {
                attachment: desc.color_attachments.len() as u32,
                layout: vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            }
        });

        let mut subpass = vk::SubpassDescription::default()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs);
        if let Some(depth_ref) = depth_ref.as_ref() {
            subpass = subpass.depth_stencil_attachment(depth_ref);
        }

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|dep| {
                vk::SubpassDependency::default()
                    .src_subpass(subpass_index_to_vk(dep.src_subpass))
                    .dst_subpass(subpass_index_to_vk(dep.dst_subpass))
                    .src_stage_mask(pipeline_stages_to_vk(dep.src_stage))
                    .dst_stage_mask(pipeline_stages_to_vk(dep.dst_stage))
                    .src_access_mask(access_flags_to_vk(dep.src_access))
                    .dst_access_mask(access_flags_to_vk(dep.dst_access))
                    .dependency_flags(if dep.by_region {
                        vk::DependencyFlags::BY_REGION
                    } else {
                        vk::DependencyFlags::empty()
                    })
            })
            .collect();

        let subpasses = [subpass];
        let render_pass_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe {
            self.gpu_context.device.create_render_pass(&render_pass_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create render pass: {:?}", e))?
        };

        Ok(Arc::new(RenderPass::new(
            Arc::clone(&self.gpu_context),
            render_pass,
            desc.color_attachments.len() as u32,
        )))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn RendererFramebuffer>> {
        if desc.attachments.is_empty() {
            engine_bail_warn!("umbra::vulkan", "Framebuffer must have at least one attachment");
        }

        let vk_render_pass = downcast::<RenderPass>(desc.render_pass.as_any(), "Render pass")?;

        let mut views = Vec::with_capacity(desc.attachments.len());
        for (i, attachment) in desc.attachments.iter().enumerate() {
            let texture = downcast::<Texture>(attachment.as_any(), "Texture")?;
            if texture.info.width < desc.width || texture.info.height < desc.height {
                engine_bail_warn!("umbra::vulkan",
                    "Framebuffer attachment {} is {}x{}, smaller than the {}x{} framebuffer",
                    i, texture.info.width, texture.info.height, desc.width, desc.height);
            }
            views.push(texture.view);
        }

        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .attachments(&views)
            .width(desc.width)
            .height(desc.height)
            .layers(1);

        let framebuffer = unsafe {
            self.gpu_context.device.create_framebuffer(&framebuffer_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create framebuffer: {:?}", e))?
        };

        Ok(Arc::new(Framebuffer::new(
            Arc::clone(&self.gpu_context),
            framebuffer,
            desc.width,
            desc.height,
            desc.attachments.clone(),
        )))
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn RendererDescriptorSetLayout>> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc
            .bindings
            .iter()
            .map(|binding| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding.binding)
                    .descriptor_type(descriptor_type_to_vk(binding.descriptor_type))
                    .descriptor_count(1)
                    .stage_flags(shader_stages_to_vk(binding.stages))
            })
            .collect();

        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        let layout = unsafe {
            self.gpu_context.device.create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create descriptor set layout: {:?}", e))?
        };

        Ok(Arc::new(DescriptorSetLayout::new(
            Arc::clone(&self.gpu_context),
            layout,
            desc.bindings.clone(),
        )))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn RendererPipelineLayout>> {
        let mut set_layouts = Vec::with_capacity(desc.set_layouts.len());
        let mut set_bindings = Vec::with_capacity(desc.set_layouts.len());
        for set_layout in &desc.set_layouts {
            let vk_layout = downcast::<DescriptorSetLayout>(set_layout.as_any(), "Descriptor set layout")?;
            set_layouts.push(vk_layout.layout);
            set_bindings.push(set_layout.bindings().to_vec());
        }

        let push_constant_ranges: Vec<vk::PushConstantRange> = desc
            .push_constant_ranges
            .iter()
            .map(|range| vk::PushConstantRange {
                stage_flags: shader_stages_to_vk(range.stages),
                offset: range.offset,
                size: range.size,
            })
            .collect();
        let push_constant_size = desc
            .push_constant_ranges
            .iter()
            .map(|range| range.offset + range.size)
            .max()
            .unwrap_or(0);

        let layout_info = vk::PipelineLayoutCreateInfo::default()
            .set_layouts(&set_layouts)
            .push_constant_ranges(&push_constant_ranges);

        let pipeline_layout = unsafe {
            self.gpu_context.device.create_pipeline_layout(&layout_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create pipeline layout: {:?}", e))?
        };

        Ok(Arc::new(PipelineLayout::new(
            Arc::clone(&self.gpu_context),
            pipeline_layout,
            set_bindings,
            push_constant_size,
        )))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        let vk_layout = downcast::<PipelineLayout>(desc.layout.as_any(), "Pipeline layout")?;
        let vk_render_pass = downcast::<RenderPass>(desc.render_pass.as_any(), "Render pass")?;

        if desc.color_blend_attachments.len() as u32 != desc.render_pass.color_attachment_count() {
            engine_bail_warn!("umbra::vulkan",
                "Pipeline has {} blend attachments but the render pass has {} color attachments",
                desc.color_blend_attachments.len(), desc.render_pass.color_attachment_count());
        }

        let vertex_code = Self::load_spirv(&desc.vertex_shader)?;
        let fragment_code = Self::load_spirv(&desc.fragment_shader)?;
        Self::check_shader_bindings(&vertex_code, &desc.vertex_shader, vk_layout);
        Self::check_shader_bindings(&fragment_code, &desc.fragment_shader, vk_layout);

        let device = &self.gpu_context.device;
        unsafe {
            let vertex_module = self.create_shader_module(&vertex_code, &desc.vertex_shader)?;
            let fragment_module = match self.create_shader_module(&fragment_code, &desc.fragment_shader) {
                Ok(module) => module,
                Err(e) => {
                    device.destroy_shader_module(vertex_module, None);
                    return Err(e);
                }
            };

            // Specialization constants are packed as consecutive 4-byte values
            let map_entries: Vec<vk::SpecializationMapEntry> = desc
                .specialization
                .iter()
                .enumerate()
                .map(|(i, constant)| vk::SpecializationMapEntry {
                    constant_id: constant.id,
                    offset: (i * 4) as u32,
                    size: 4,
                })
                .collect();
            let specialization_data: Vec<u8> = desc
                .specialization
                .iter()
                .flat_map(|constant| constant.value.to_bytes())
                .collect();
            let specialization_info = vk::SpecializationInfo::default()
                .map_entries(&map_entries)
                .data(&specialization_data);

            let mut vertex_stage = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vertex_module)
                .name(c"main");
            let mut fragment_stage = vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(fragment_module)
                .name(c"main");
            if !desc.specialization.is_empty() {
                vertex_stage = vertex_stage.specialization_info(&specialization_info);
                fragment_stage = fragment_stage.specialization_info(&specialization_info);
            }
            let shader_stages = [vertex_stage, fragment_stage];

            // Vertex input: one interleaved buffer at binding 0
            let binding_descriptions = [vk::VertexInputBindingDescription {
                binding: 0,
                stride: desc.vertex_layout.stride,
                input_rate: vk::VertexInputRate::VERTEX,
            }];
            let attribute_descriptions: Vec<vk::VertexInputAttributeDescription> = desc
                .vertex_layout
                .attributes
                .iter()
                .map(|attr| vk::VertexInputAttributeDescription {
                    location: attr.location,
                    binding: 0,
                    format: vertex_format_to_vk(attr.format),
                    offset: attr.offset,
                })
                .collect();

            let vertex_input_info = if attribute_descriptions.is_empty() {
                vk::PipelineVertexInputStateCreateInfo::default()
            } else {
                vk::PipelineVertexInputStateCreateInfo::default()
                    .vertex_binding_descriptions(&binding_descriptions)
                    .vertex_attribute_descriptions(&attribute_descriptions)
            };

            let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
                .primitive_restart_enable(false);

            // Viewport and scissor are dynamic
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewport_count(1)
                .scissor_count(1);

            let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(cull_mode_to_vk(desc.cull_mode))
                .front_face(front_face_to_vk(desc.front_face))
                .depth_bias_enable(desc.dynamic_depth_bias);

            let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_test)
                .depth_write_enable(desc.depth_write)
                .depth_compare_op(compare_op_to_vk(desc.depth_compare))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false)
                .back(vk::StencilOpState {
                    compare_op: vk::CompareOp::ALWAYS,
                    ..Default::default()
                });

            let color_blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = desc
                .color_blend_attachments
                .iter()
                .map(|attachment| {
                    vk::PipelineColorBlendAttachmentState::default()
                        .color_write_mask(vk::ColorComponentFlags::RGBA)
                        .blend_enable(attachment.blend_enable)
                        .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
                        .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
                        .color_blend_op(vk::BlendOp::ADD)
                        .src_alpha_blend_factor(vk::BlendFactor::ONE)
                        .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
                        .alpha_blend_op(vk::BlendOp::ADD)
                })
                .collect();

            let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(&color_blend_attachments);

            let mut dynamic_states = vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            if desc.dynamic_depth_bias {
                dynamic_states.push(vk::DynamicState::DEPTH_BIAS);
            }
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
                .dynamic_states(&dynamic_states);

            let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_info)
                .input_assembly_state(&input_assembly)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterizer)
                .multisample_state(&multisampling)
                .depth_stencil_state(&depth_stencil)
                .color_blend_state(&color_blending)
                .dynamic_state(&dynamic_state)
                .layout(vk_layout.pipeline_layout)
                .render_pass(vk_render_pass.render_pass)
                .subpass(0);

            let pipelines = device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None);

            // Modules are no longer needed once the pipeline exists
            device.destroy_shader_module(vertex_module, None);
            device.destroy_shader_module(fragment_module, None);

            let pipeline = pipelines
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create graphics pipeline ({} / {}): {:?}",
                    desc.vertex_shader.display(), desc.fragment_shader.display(), e.1))?[0];

            Ok(Arc::new(Pipeline::new(
                Arc::clone(&self.gpu_context),
                pipeline,
                Arc::clone(&desc.layout),
            )))
        }
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Arc<dyn RendererDescriptorPool>> {
        let mut pool_sizes = Vec::with_capacity(2);
        if desc.uniform_buffers > 0 {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: desc.uniform_buffers,
            });
        }
        if desc.combined_image_samplers > 0 {
            pool_sizes.push(vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: desc.combined_image_samplers,
            });
        }
        if pool_sizes.is_empty() || desc.max_sets == 0 {
            engine_bail_warn!("umbra::vulkan", "Descriptor pool needs descriptors and at least one set");
        }

        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(desc.max_sets);

        let pool = unsafe {
            self.gpu_context.device.create_descriptor_pool(&pool_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create descriptor pool: {:?}", e))?
        };

        Ok(Arc::new(DescriptorPool::new(Arc::clone(&self.gpu_context), pool)))
    }

    fn allocate_descriptor_set(
        &self,
        pool: &Arc<dyn RendererDescriptorPool>,
        layout: &Arc<dyn RendererDescriptorSetLayout>,
    ) -> Result<Arc<dyn RendererDescriptorSet>> {
        let vk_pool = downcast::<DescriptorPool>(pool.as_any(), "Descriptor pool")?;
        let vk_layout = downcast::<DescriptorSetLayout>(layout.as_any(), "Descriptor set layout")?;

        let set_layouts = [vk_layout.layout];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(vk_pool.pool)
            .set_layouts(&set_layouts);

        let sets = unsafe {
            self.gpu_context.device.allocate_descriptor_sets(&alloc_info)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to allocate descriptor set: {:?}", e))?
        };

        Ok(Arc::new(DescriptorSet::new(
            Arc::clone(&self.gpu_context),
            sets[0],
            layout.bindings().to_vec(),
            Arc::clone(pool),
        )))
    }

    fn update_descriptor_set(&self, set: &Arc<dyn RendererDescriptorSet>, writes: &[DescriptorWrite]) -> Result<()> {
        let vk_set = downcast::<DescriptorSet>(set.as_any(), "Descriptor set")?;

        // Info arrays must stay alive until vkUpdateDescriptorSets returns
        enum WriteInfo {
            Buffer([vk::DescriptorBufferInfo; 1]),
            Image([vk::DescriptorImageInfo; 1]),
        }

        let mut infos = Vec::with_capacity(writes.len());
        for write in writes {
            let declared = vk_set.bindings.iter().find(|b| b.binding == write.binding);
            let info = match (&write.resource, declared.map(|b| b.descriptor_type)) {
                (DescriptorResource::UniformBuffer(buffer), Some(DescriptorType::UniformBuffer)) => {
                    let vk_buffer = downcast::<Buffer>(buffer.as_any(), "Buffer")?;
                    WriteInfo::Buffer([vk::DescriptorBufferInfo {
                        buffer: vk_buffer.buffer,
                        offset: 0,
                        range: vk_buffer.size,
                    }])
                }
                (
                    DescriptorResource::CombinedImageSampler { texture, sampler, layout },
                    Some(DescriptorType::CombinedImageSampler),
                ) => {
                    let vk_texture = downcast::<Texture>(texture.as_any(), "Texture")?;
                    let vk_sampler = downcast::<Sampler>(sampler.as_any(), "Sampler")?;
                    WriteInfo::Image([vk::DescriptorImageInfo {
                        sampler: vk_sampler.sampler,
                        image_view: vk_texture.view,
                        image_layout: image_layout_to_vk(*layout),
                    }])
                }
                (_, None) => engine_bail_warn!("umbra::vulkan",
                    "Descriptor set has no binding {}", write.binding),
                (_, Some(declared)) => engine_bail_warn!("umbra::vulkan",
                    "Binding {} is declared as {:?}, wrong resource kind written", write.binding, declared),
            };
            infos.push(info);
        }

        let vk_writes: Vec<vk::WriteDescriptorSet> = writes
            .iter()
            .zip(&infos)
            .map(|(write, info)| {
                let base = vk::WriteDescriptorSet::default()
                    .dst_set(vk_set.descriptor_set)
                    .dst_binding(write.binding)
                    .dst_array_element(0);
                match info {
                    WriteInfo::Buffer(buffer_info) => base
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(buffer_info),
                    WriteInfo::Image(image_info) => base
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(image_info),
                }
            })
            .collect();

        unsafe {
            self.gpu_context.device.update_descriptor_sets(&vk_writes, &[]);
        }

        Ok(())
    }

    fn create_semaphore(&self) -> Result<Arc<dyn RendererSemaphore>> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let semaphore = unsafe {
            self.gpu_context.device.create_semaphore(&semaphore_info, None)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to create semaphore: {:?}", e))?
        };
        Ok(Arc::new(Semaphore::new(Arc::clone(&self.gpu_context), semaphore)))
    }

    fn create_command_list(&self) -> Result<Box<dyn RendererCommandList>> {
        Ok(Box::new(CommandList::new(Arc::clone(&self.gpu_context))?))
    }

    fn submit(&self, submission: &Submission) -> Result<()> {
        let command_list = downcast::<CommandList>(submission.command_list.as_any(), "Command list")?;
        let command_buffers = [command_list.command_buffer()];

        let mut wait_semaphores = Vec::with_capacity(1);
        let mut wait_stages = Vec::with_capacity(1);
        if let Some((semaphore, stage)) = submission.wait {
            wait_semaphores.push(downcast::<Semaphore>(semaphore.as_any(), "Semaphore")?.semaphore);
            wait_stages.push(pipeline_stages_to_vk(stage));
        }

        let mut signal_semaphores = Vec::with_capacity(1);
        if let Some(semaphore) = submission.signal {
            signal_semaphores.push(downcast::<Semaphore>(semaphore.as_any(), "Semaphore")?.semaphore);
        }

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        let _queue = self.gpu_context.queue_lock.lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Queue lock poisoned"))?;

        unsafe {
            self.gpu_context.device
                .queue_submit(self.gpu_context.graphics_queue, &[submit_info], vk::Fence::null())
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to submit commands to GPU queue: {:?}", e))
        }
    }

    fn submit_and_wait(&self, command_list: &dyn RendererCommandList) -> Result<()> {
        self.submit(&Submission { command_list, wait: None, signal: None })?;
        self.gpu_context.queue_wait_idle()
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.gpu_context.device.device_wait_idle()
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn queue_wait_idle(&self) -> Result<()> {
        self.gpu_context.queue_wait_idle()
    }

    fn memory_properties(&self) -> &MemoryProperties {
        &self.memory_properties
    }

    fn depth_format(&self) -> TextureFormat {
        self.depth_format
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        // Device and instance go with the GpuContext once the last object
        // holding it is dropped
        unsafe {
            self.gpu_context.device.device_wait_idle().ok();
        }
    }
}

// ===== CONVERSIONS =====

/// Convert TextureFormat to Vulkan format
pub(crate) fn format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        TextureFormat::D16_UNORM => vk::Format::D16_UNORM,
        TextureFormat::D32_SFLOAT => vk::Format::D32_SFLOAT,
        TextureFormat::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        TextureFormat::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Convert a Vulkan format back to TextureFormat (None if the engine has no equivalent)
pub(crate) fn vk_to_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::R32G32B32A32_SFLOAT => Some(TextureFormat::R32G32B32A32_SFLOAT),
        vk::Format::R32G32B32A32_UINT => Some(TextureFormat::R32G32B32A32_UINT),
        vk::Format::D16_UNORM => Some(TextureFormat::D16_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_SFLOAT),
        vk::Format::D24_UNORM_S8_UINT => Some(TextureFormat::D24_UNORM_S8_UINT),
        vk::Format::D32_SFLOAT_S8_UINT => Some(TextureFormat::D32_SFLOAT_S8_UINT),
        _ => None,
    }
}

pub(crate) fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::Float2 => vk::Format::R32G32_SFLOAT,
        VertexFormat::Float3 => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::Float4 => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Staging => vk::BufferUsageFlags::TRANSFER_SRC,
    }
}

pub(crate) fn image_usage_to_vk(usage: ImageUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(ImageUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    if usage.contains(ImageUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    flags
}

pub(crate) fn image_aspect_to_vk(aspect: ImageAspect) -> vk::ImageAspectFlags {
    let mut flags = vk::ImageAspectFlags::empty();
    if aspect.contains(ImageAspect::COLOR) {
        flags |= vk::ImageAspectFlags::COLOR;
    }
    if aspect.contains(ImageAspect::DEPTH) {
        flags |= vk::ImageAspectFlags::DEPTH;
    }
    if aspect.contains(ImageAspect::STENCIL) {
        flags |= vk::ImageAspectFlags::STENCIL;
    }
    flags
}

pub(crate) fn load_op_to_vk(op: LoadOp) -> vk::AttachmentLoadOp {
    match op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub(crate) fn store_op_to_vk(op: StoreOp) -> vk::AttachmentStoreOp {
    match op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

pub(crate) fn image_layout_to_vk(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        ImageLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

pub(crate) fn subpass_index_to_vk(index: u32) -> u32 {
    if index == SUBPASS_EXTERNAL {
        vk::SUBPASS_EXTERNAL
    } else {
        index
    }
}

pub(crate) fn pipeline_stages_to_vk(stages: PipelineStages) -> vk::PipelineStageFlags {
    let mapping = [
        (PipelineStages::TOP_OF_PIPE, vk::PipelineStageFlags::TOP_OF_PIPE),
        (PipelineStages::VERTEX_SHADER, vk::PipelineStageFlags::VERTEX_SHADER),
        (PipelineStages::FRAGMENT_SHADER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        (PipelineStages::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS),
        (PipelineStages::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags::LATE_FRAGMENT_TESTS),
        (PipelineStages::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStages::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        (PipelineStages::BOTTOM_OF_PIPE, vk::PipelineStageFlags::BOTTOM_OF_PIPE),
    ];
    mapping
        .iter()
        .filter(|(stage, _)| stages.contains(*stage))
        .fold(vk::PipelineStageFlags::empty(), |acc, (_, vk_stage)| acc | *vk_stage)
}

pub(crate) fn access_flags_to_vk(access: AccessFlags) -> vk::AccessFlags {
    let mapping = [
        (AccessFlags::SHADER_READ, vk::AccessFlags::SHADER_READ),
        (AccessFlags::COLOR_ATTACHMENT_READ, vk::AccessFlags::COLOR_ATTACHMENT_READ),
        (AccessFlags::COLOR_ATTACHMENT_WRITE, vk::AccessFlags::COLOR_ATTACHMENT_WRITE),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ),
        (AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE, vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE),
        (AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_WRITE),
        (AccessFlags::MEMORY_READ, vk::AccessFlags::MEMORY_READ),
    ];
    mapping
        .iter()
        .filter(|(flag, _)| access.contains(*flag))
        .fold(vk::AccessFlags::empty(), |acc, (_, vk_flag)| acc | *vk_flag)
}

pub(crate) fn shader_stages_to_vk(stages: ShaderStages) -> vk::ShaderStageFlags {
    let mut flags = vk::ShaderStageFlags::empty();
    if stages.contains(ShaderStages::VERTEX) {
        flags |= vk::ShaderStageFlags::VERTEX;
    }
    if stages.contains(ShaderStages::FRAGMENT) {
        flags |= vk::ShaderStageFlags::FRAGMENT;
    }
    flags
}

pub(crate) fn descriptor_type_to_vk(descriptor_type: DescriptorType) -> vk::DescriptorType {
    match descriptor_type {
        DescriptorType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        DescriptorType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

pub(crate) fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub(crate) fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

pub(crate) fn border_color_to_vk(color: BorderColor) -> vk::BorderColor {
    match color {
        BorderColor::OpaqueWhite => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        BorderColor::OpaqueBlack => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        BorderColor::TransparentBlack => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
