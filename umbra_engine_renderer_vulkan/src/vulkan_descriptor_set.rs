/// Descriptor set layouts, pools and sets - Vulkan implementations

use umbra_engine::umbra::device::{
    DescriptorBinding, DescriptorPool as RendererDescriptorPool,
    DescriptorSet as RendererDescriptorSet, DescriptorSetLayout as RendererDescriptorSetLayout,
};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan descriptor set layout implementation
pub struct DescriptorSetLayout {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::DescriptorSetLayout,
    bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayout {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        layout: vk::DescriptorSetLayout,
        bindings: Vec<DescriptorBinding>,
    ) -> Self {
        Self { ctx, layout, bindings }
    }
}

impl RendererDescriptorSetLayout for DescriptorSetLayout {
    fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Vulkan descriptor pool implementation
///
/// Created with FREE_DESCRIPTOR_SET so each set can return itself.
pub struct DescriptorPool {
    ctx: Arc<GpuContext>,
    pub(crate) pool: vk::DescriptorPool,
}

impl DescriptorPool {
    pub(crate) fn new(ctx: Arc<GpuContext>, pool: vk::DescriptorPool) -> Self {
        Self { ctx, pool }
    }
}

impl RendererDescriptorPool for DescriptorPool {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// Vulkan descriptor set implementation
///
/// Keeps its pool alive and frees itself back into it when dropped.
pub struct DescriptorSet {
    ctx: Arc<GpuContext>,
    pub(crate) descriptor_set: vk::DescriptorSet,
    /// Layout the set was allocated with
    pub(crate) bindings: Vec<DescriptorBinding>,
    pool: Arc<dyn RendererDescriptorPool>,
}

impl DescriptorSet {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        descriptor_set: vk::DescriptorSet,
        bindings: Vec<DescriptorBinding>,
        pool: Arc<dyn RendererDescriptorPool>,
    ) -> Self {
        Self { ctx, descriptor_set, bindings, pool }
    }
}

impl RendererDescriptorSet for DescriptorSet {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.as_any().downcast_ref::<DescriptorPool>() {
            unsafe {
                self.ctx.device.free_descriptor_sets(pool.pool, &[self.descriptor_set]).ok();
            }
        }
    }
}
