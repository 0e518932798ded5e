/// Buffer - Vulkan implementation of the Buffer trait

use umbra_engine::umbra::Result;
use umbra_engine::umbra::device::Buffer as RendererBuffer;
use umbra_engine::{engine_bail, engine_bail_warn};
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
pub struct Buffer {
    /// Shared GPU context (device, allocator, queue, command pool)
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    pub(crate) allocation: Option<Allocation>,
    /// Buffer size
    pub(crate) size: u64,
}

impl Buffer {
    /// Create a new Vulkan buffer
    pub fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
    ) -> Self {
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
        }
    }
}

impl RendererBuffer for Buffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            engine_bail_warn!("umbra::vulkan",
                "Buffer update out of range (offset {} + {} bytes > {} bytes)", offset, data.len(), self.size);
        }

        let Some(allocation) = &self.allocation else {
            engine_bail!("umbra::vulkan", "Buffer update failed: no GPU allocation");
        };

        // GpuOnly buffers have no mapping
        let Some(mapped) = allocation.mapped_ptr() else {
            engine_bail_warn!("umbra::vulkan", "Buffer is not CPU-accessible");
        };

        unsafe {
            let mapped_ptr = mapped.as_ptr() as *mut u8;
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.add(offset as usize),
                data.len(),
            );
        }

        Ok(())
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            // Free GPU memory
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if lock fails - we still need to destroy the buffer
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            // Destroy buffer
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}
