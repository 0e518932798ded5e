/// Descriptor pools, descriptor sets and descriptor writes

use std::any::Any;
use std::sync::Arc;
use crate::device::{Buffer, ImageLayout, Sampler, Texture};

/// Pool capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorPoolDesc {
    pub uniform_buffers: u32,
    pub combined_image_samplers: u32,
    pub max_sets: u32,
}

/// Descriptor pool object
///
/// Sets allocated from a pool keep it alive.
pub trait DescriptorPool: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Descriptor set object
///
/// Returned to its pool when dropped.
pub trait DescriptorSet: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Resource written into one binding
pub enum DescriptorResource {
    UniformBuffer(Arc<dyn Buffer>),
    CombinedImageSampler {
        texture: Arc<dyn Texture>,
        sampler: Arc<dyn Sampler>,
        layout: ImageLayout,
    },
}

/// One binding update
pub struct DescriptorWrite {
    pub binding: u32,
    pub resource: DescriptorResource,
}

impl DescriptorWrite {
    pub fn uniform(binding: u32, buffer: &Arc<dyn Buffer>) -> Self {
        Self { binding, resource: DescriptorResource::UniformBuffer(Arc::clone(buffer)) }
    }

    pub fn image(
        binding: u32,
        texture: &Arc<dyn Texture>,
        sampler: &Arc<dyn Sampler>,
        layout: ImageLayout,
    ) -> Self {
        Self {
            binding,
            resource: DescriptorResource::CombinedImageSampler {
                texture: Arc::clone(texture),
                sampler: Arc::clone(sampler),
                layout,
            },
        }
    }
}
