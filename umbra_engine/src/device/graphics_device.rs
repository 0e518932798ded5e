/// GraphicsDevice trait - factory for GPU objects and queue submission

use std::sync::Arc;
use crate::error::Result;
use crate::memory::MemoryProperties;
use crate::device::{
    Buffer, BufferDesc, CommandList, DescriptorPool, DescriptorPoolDesc, DescriptorSet,
    DescriptorSetLayout, DescriptorSetLayoutDesc, DescriptorWrite, Framebuffer,
    FramebufferDesc, ImageDesc, Pipeline, PipelineDesc, PipelineLayout, PipelineLayoutDesc,
    PipelineStages, RenderPass, RenderPassDesc, Sampler, SamplerDesc, Semaphore, Texture,
    TextureDesc, TextureFormat,
};

/// One queue submission: a command list with at most one wait and one signal
pub struct Submission<'a> {
    pub command_list: &'a dyn CommandList,
    /// Semaphore to wait on, and the stage that waits
    pub wait: Option<(&'a dyn Semaphore, PipelineStages)>,
    pub signal: Option<&'a dyn Semaphore>,
}

/// Graphics device
///
/// Every created object is reference counted and released by its own
/// `Drop`. The device must outlive all of them.
pub trait GraphicsDevice: Send + Sync {
    /// Create a buffer (mapped when `MemoryLocation::CpuToGpu`)
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a render-target image with a dedicated device-local allocation
    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Texture>>;

    /// Create a sampled texture from tightly packed pixels (blocking upload)
    fn create_texture(&self, desc: &TextureDesc, pixels: &[u8]) -> Result<Arc<dyn Texture>>;

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>>;

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>>;

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>>;

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>>;

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>>;

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Arc<dyn DescriptorPool>>;

    fn allocate_descriptor_set(
        &self,
        pool: &Arc<dyn DescriptorPool>,
        layout: &Arc<dyn DescriptorSetLayout>,
    ) -> Result<Arc<dyn DescriptorSet>>;

    fn update_descriptor_set(&self, set: &Arc<dyn DescriptorSet>, writes: &[DescriptorWrite]) -> Result<()>;

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>>;

    fn create_command_list(&self) -> Result<Box<dyn CommandList>>;

    /// Submit to the graphics queue without waiting
    fn submit(&self, submission: &Submission) -> Result<()>;

    /// Submit a one-shot command list and block until the queue is idle
    fn submit_and_wait(&self, command_list: &dyn CommandList) -> Result<()>;

    /// Block until the device has finished all work
    fn wait_idle(&self) -> Result<()>;

    /// Block until the graphics queue has finished all work
    fn queue_wait_idle(&self) -> Result<()>;

    /// Memory type table of the physical device
    fn memory_properties(&self) -> &MemoryProperties;

    /// Best supported depth/stencil attachment format
    fn depth_format(&self) -> TextureFormat;
}
