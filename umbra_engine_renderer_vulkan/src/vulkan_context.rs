/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Contains everything a created object needs to release itself:
/// - Device for Vulkan API calls
/// - Allocator for buffer and texture memory
/// - Queue (plus its lock) for submissions and uploads
/// - Command pool for one-shot upload operations
///
/// Every object holds an `Arc<GpuContext>`, so the device and instance are
/// destroyed only once the last object is gone.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use std::any::Any;
use std::mem::ManuallyDrop;
use std::sync::{Arc, Mutex};
use umbra_engine::umbra::Result;
use umbra_engine::engine_err;

/// Shared GPU context for all Vulkan resources.
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    /// GPU memory allocator (shared, requires mutex for thread safety)
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Arc<Mutex<Allocator>>>,

    /// Graphics queue for command submission (also used for presentation)
    pub graphics_queue: vk::Queue,

    /// Graphics queue family index
    pub graphics_queue_family: u32,

    /// Serializes every access to `graphics_queue`
    pub queue_lock: Mutex<()>,

    /// Reusable command pool for one-shot upload operations
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    pub upload_command_pool: Mutex<vk::CommandPool>,

    pub physical_device: vk::PhysicalDevice,

    /// Vulkan instance (destroyed last)
    pub instance: ash::Instance,

    /// Debug utils loader (validation builds only)
    pub(crate) debug_utils_loader: Option<ash::ext::debug_utils::Instance>,

    /// Debug messenger handle
    pub(crate) debug_messenger: Option<vk::DebugUtilsMessengerEXT>,

    /// Loaded Vulkan library, must outlive the instance
    pub entry: ash::Entry,
}

impl GpuContext {
    /// Create a new GPU context
    ///
    /// # Arguments
    ///
    /// * `entry` - Loaded Vulkan library
    /// * `instance` - Vulkan instance
    /// * `physical_device` - Selected physical device
    /// * `device` - Vulkan logical device
    /// * `allocator` - GPU memory allocator
    /// * `graphics_queue` - Graphics queue for command submission
    /// * `graphics_queue_family` - Graphics queue family index
    /// * `upload_command_pool` - Command pool for upload operations
    /// * `debug_utils_loader` - Debug utils loader (if validation enabled)
    /// * `debug_messenger` - Debug messenger handle (if validation enabled)
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entry: ash::Entry,
        instance: ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
        debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    ) -> Self {
        Self {
            device,
            allocator: ManuallyDrop::new(Arc::new(Mutex::new(allocator))),
            graphics_queue,
            graphics_queue_family,
            queue_lock: Mutex::new(()),
            upload_command_pool: Mutex::new(upload_command_pool),
            physical_device,
            instance,
            debug_utils_loader,
            debug_messenger,
            entry,
        }
    }

    /// Block until the graphics queue has drained
    pub fn queue_wait_idle(&self) -> Result<()> {
        let _queue = self.queue_lock.lock()
            .map_err(|_| engine_err!("umbra::vulkan", "Queue lock poisoned"))?;
        unsafe {
            self.device.queue_wait_idle(self.graphics_queue)
                .map_err(|e| engine_err!("umbra::vulkan", "Failed to wait for queue idle: {:?}", e))
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            // 1. Upload command pool
            if let Ok(pool) = self.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // 2. Allocator: frees VkDeviceMemory pages BEFORE the device goes
            ManuallyDrop::drop(&mut self.allocator);

            // 3. Stop routing validation messages, then destroy the messenger
            #[cfg(feature = "vulkan-validation")]
            crate::debug::cleanup_debug_config();

            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils_loader, &self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(*messenger, None);
            }

            // 4. Device and instance
            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Downcast a trait object created by this backend to its Vulkan type
///
/// Fails when the object comes from another device implementation.
pub(crate) fn downcast<'a, T: 'static>(object: &'a dyn Any, kind: &str) -> Result<&'a T> {
    object.downcast_ref::<T>().ok_or_else(|| {
        engine_err!("umbra::vulkan", "{} was not created by the Vulkan device", kind)
    })
}
