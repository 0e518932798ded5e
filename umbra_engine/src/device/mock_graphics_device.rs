/// Mock graphics device for unit tests (no GPU required)
///
/// Every object gets a unique id. Command lists record one string per
/// command, and submissions, acquires and presents are appended to a shared
/// `MockLog` so tests can check ordering and semaphore wiring.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::device::{
    Buffer, BufferDesc, ClearValue, CommandList, DescriptorBinding, DescriptorPool,
    DescriptorPoolDesc, DescriptorResource, DescriptorSet, DescriptorSetLayout,
    DescriptorSetLayoutDesc, DescriptorWrite, DrawIndexed, Framebuffer, FramebufferDesc,
    GraphicsDevice, ImageAspect, ImageDesc, ImageUsage, IndexType, MemoryLocation, Pipeline,
    PipelineDesc, PipelineLayout, PipelineLayoutDesc, PipelineStages, Rect2D, RenderPass,
    RenderPassDesc, Sampler, SamplerDesc, Semaphore, ShaderStages, SpecializationConstant,
    Submission, Swapchain, Texture, TextureDesc, TextureFormat, TextureInfo, Viewport,
};
use crate::error::{Error, Result};
use crate::memory::{MemoryProperties, MemoryPropertyFlags, MemoryType};

// ============================================================================
// Shared log
// ============================================================================

/// One recorded queue submission
#[derive(Debug, Clone, PartialEq)]
pub struct MockSubmission {
    pub command_list: u64,
    pub wait: Option<u64>,
    pub wait_stage: Option<PipelineStages>,
    pub signal: Option<u64>,
}

/// Events recorded by the mock device and its swapchain
#[derive(Debug, Default)]
pub struct MockLog {
    /// Kind of every created object, in creation order
    pub created: Vec<&'static str>,
    pub submissions: Vec<MockSubmission>,
    /// Command list ids submitted through `submit_and_wait`
    pub one_shot_submissions: Vec<u64>,
    /// (set id, binding, resource id)
    pub descriptor_writes: Vec<(u64, u32, u64)>,
    /// Semaphore id signaled by each acquire
    pub acquires: Vec<u64>,
    /// (image index, waited semaphore id) for each present
    pub presents: Vec<(u32, u64)>,
    pub wait_idle_count: usize,
    pub queue_wait_idle_count: usize,
}

impl MockLog {
    /// Number of created objects of the given kind
    pub fn created_count(&self, kind: &str) -> usize {
        self.created.iter().filter(|k| **k == kind).count()
    }
}

// ============================================================================
// Mock objects
// ============================================================================

pub struct MockBuffer {
    pub id: u64,
    pub desc: BufferDesc,
    pub data: Mutex<Vec<u8>>,
}

impl Buffer for MockBuffer {
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if self.desc.location == MemoryLocation::GpuOnly {
            return Err(Error::BackendError("Buffer is not CPU-accessible".to_string()));
        }
        let end = offset as usize + data.len();
        if end > self.desc.size as usize {
            return Err(Error::InvalidResource(format!(
                "Write of {} bytes at {} exceeds buffer size {}", data.len(), offset, self.desc.size
            )));
        }
        let mut bytes = self.data.lock().unwrap();
        bytes[offset as usize..end].copy_from_slice(data);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.desc.size
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockTexture {
    pub id: u64,
    pub info: TextureInfo,
    pub pixels: Vec<u8>,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSampler {
    pub id: u64,
    pub desc: SamplerDesc,
}

impl Sampler for MockSampler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockRenderPass {
    pub id: u64,
    pub desc: RenderPassDesc,
}

impl RenderPass for MockRenderPass {
    fn color_attachment_count(&self) -> u32 {
        self.desc.color_attachments.len() as u32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockFramebuffer {
    pub id: u64,
    pub render_pass: u64,
    pub attachments: Vec<u64>,
    pub width: u32,
    pub height: u32,
}

impl Framebuffer for MockFramebuffer {
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

pub struct MockDescriptorSetLayout {
    pub id: u64,
    pub bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayout for MockDescriptorSetLayout {
    fn bindings(&self) -> &[DescriptorBinding] {
        &self.bindings
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipelineLayout {
    pub id: u64,
    pub set_layouts: Vec<u64>,
}

impl PipelineLayout for MockPipelineLayout {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockPipeline {
    pub id: u64,
    pub vertex_shader: String,
    pub fragment_shader: String,
    pub render_pass: u64,
    pub depth_write: bool,
    pub dynamic_depth_bias: bool,
    pub color_blend_count: usize,
    pub specialization: Vec<SpecializationConstant>,
}

impl Pipeline for MockPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockDescriptorPool {
    pub id: u64,
    pub desc: DescriptorPoolDesc,
    pub allocated: Mutex<u32>,
}

impl DescriptorPool for MockDescriptorPool {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockDescriptorSet {
    pub id: u64,
    pub pool: u64,
    pub layout: u64,
}

impl DescriptorSet for MockDescriptorSet {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct MockSemaphore {
    pub id: u64,
}

impl Semaphore for MockSemaphore {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    pub id: u64,
    pub commands: Vec<String>,
    pub recording: bool,
}

impl MockCommandList {
    /// Recorded draw_indexed commands only
    pub fn draws(&self) -> Vec<&String> {
        self.commands.iter().filter(|c| c.starts_with("draw_indexed")).collect()
    }
}

impl CommandList for MockCommandList {
    fn begin(&mut self) -> Result<()> {
        self.commands.clear();
        self.recording = true;
        self.commands.push("begin".to_string());
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.recording {
            return Err(Error::BackendError("end() without begin()".to_string()));
        }
        self.recording = false;
        self.commands.push("end".to_string());
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RenderPass>,
        framebuffer: &Arc<dyn Framebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.commands.push(format!(
            "begin_render_pass({}, {}, {})",
            id_of(render_pass.as_any()),
            id_of(framebuffer.as_any()),
            clear_values.len()
        ));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.commands.push("end_render_pass".to_string());
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.commands.push(format!(
            "set_viewport({}, {}, {}, {})",
            viewport.x, viewport.y, viewport.width, viewport.height
        ));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.commands.push(format!("set_scissor({}, {})", scissor.width, scissor.height));
        Ok(())
    }

    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()> {
        self.commands.push(format!("set_depth_bias({}, {}, {})", constant_factor, clamp, slope_factor));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.commands.push(format!("bind_pipeline({})", id_of(pipeline.as_any())));
        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        _layout: &Arc<dyn PipelineLayout>,
        set_index: u32,
        set: &Arc<dyn DescriptorSet>,
    ) -> Result<()> {
        self.commands.push(format!("bind_descriptor_set({}, {})", set_index, id_of(set.as_any())));
        Ok(())
    }

    fn push_constants(
        &mut self,
        _layout: &Arc<dyn PipelineLayout>,
        _stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.commands.push(format!("push_constants({}, {:?})", offset, data));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.commands.push(format!("bind_vertex_buffer({})", id_of(buffer.as_any())));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.commands.push(format!("bind_index_buffer({}, {:?})", id_of(buffer.as_any()), index_type));
        Ok(())
    }

    fn draw_indexed(&mut self, draw: DrawIndexed) -> Result<()> {
        self.commands.push(format!(
            "draw_indexed({}, {}, {}, {}, {})",
            draw.index_count, draw.instance_count, draw.first_index, draw.vertex_offset, draw.first_instance
        ));
        Ok(())
    }

    fn copy_buffer(&mut self, src: &Arc<dyn Buffer>, dst: &Arc<dyn Buffer>, size: u64) -> Result<()> {
        // Copies eagerly so tests can inspect device-local contents
        if let (Some(src), Some(dst)) = (
            src.as_any().downcast_ref::<MockBuffer>(),
            dst.as_any().downcast_ref::<MockBuffer>(),
        ) {
            let bytes = src.data.lock().unwrap()[..size as usize].to_vec();
            dst.data.lock().unwrap()[..size as usize].copy_from_slice(&bytes);
        }
        self.commands.push(format!("copy_buffer({}, {}, {})", id_of(src.as_any()), id_of(dst.as_any()), size));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ============================================================================
// Id helpers
// ============================================================================

/// Id of any mock object (0 if the object is not a mock)
pub fn id_of(object: &dyn Any) -> u64 {
    if let Some(o) = object.downcast_ref::<MockBuffer>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockTexture>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockSampler>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockRenderPass>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockFramebuffer>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockDescriptorSetLayout>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockPipelineLayout>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockPipeline>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockDescriptorPool>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockDescriptorSet>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockSemaphore>() { return o.id; }
    if let Some(o) = object.downcast_ref::<MockCommandList>() { return o.id; }
    0
}

/// Downcast a command list to the mock to read its recorded commands
pub fn mock_commands(command_list: &dyn CommandList) -> &MockCommandList {
    command_list
        .as_any()
        .downcast_ref::<MockCommandList>()
        .expect("not a MockCommandList")
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

pub struct MockGraphicsDevice {
    next_id: AtomicU64,
    pub log: Arc<Mutex<MockLog>>,
    memory_properties: MemoryProperties,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            log: Arc::new(Mutex::new(MockLog::default())),
            memory_properties: MemoryProperties {
                memory_types: vec![
                    MemoryType { property_flags: MemoryPropertyFlags::DEVICE_LOCAL, heap_index: 0 },
                    MemoryType {
                        property_flags: MemoryPropertyFlags::HOST_VISIBLE | MemoryPropertyFlags::HOST_COHERENT,
                        heap_index: 1,
                    },
                ],
            },
        }
    }

    fn next(&self, kind: &'static str) -> u64 {
        self.log.lock().unwrap().created.push(kind);
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Create a swapchain sharing this device's log
    pub fn create_swapchain(&self, width: u32, height: u32, image_count: usize) -> MockSwapchain {
        let images = (0..image_count)
            .map(|_| {
                Arc::new(MockTexture {
                    id: self.next("swapchain_image"),
                    info: TextureInfo {
                        width,
                        height,
                        format: TextureFormat::B8G8R8A8_UNORM,
                        usage: ImageUsage::COLOR_ATTACHMENT,
                        aspect: ImageAspect::COLOR,
                    },
                    pixels: Vec::new(),
                }) as Arc<dyn Texture>
            })
            .collect();
        MockSwapchain {
            log: Arc::clone(&self.log),
            images,
            extent: (width, height),
            next_image: 0,
        }
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&self, desc: &BufferDesc) -> Result<Arc<dyn Buffer>> {
        Ok(Arc::new(MockBuffer {
            id: self.next("buffer"),
            desc: desc.clone(),
            data: Mutex::new(vec![0; desc.size as usize]),
        }))
    }

    fn create_image(&self, desc: &ImageDesc) -> Result<Arc<dyn Texture>> {
        // Same selection rule as the Vulkan backend
        self.memory_properties.memory_type_index(u32::MAX, MemoryPropertyFlags::DEVICE_LOCAL)?;
        Ok(Arc::new(MockTexture {
            id: self.next("image"),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
                aspect: desc.aspect,
            },
            pixels: Vec::new(),
        }))
    }

    fn create_texture(&self, desc: &TextureDesc, pixels: &[u8]) -> Result<Arc<dyn Texture>> {
        let expected = (desc.width * desc.height * desc.format.bytes_per_pixel()) as usize;
        if pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "Texture data is {} bytes, expected {}", pixels.len(), expected
            )));
        }
        Ok(Arc::new(MockTexture {
            id: self.next("texture"),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
                aspect: ImageAspect::COLOR,
            },
            pixels: pixels.to_vec(),
        }))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<Arc<dyn Sampler>> {
        Ok(Arc::new(MockSampler { id: self.next("sampler"), desc: desc.clone() }))
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<dyn RenderPass>> {
        Ok(Arc::new(MockRenderPass { id: self.next("render_pass"), desc: desc.clone() }))
    }

    fn create_framebuffer(&self, desc: &FramebufferDesc) -> Result<Arc<dyn Framebuffer>> {
        Ok(Arc::new(MockFramebuffer {
            id: self.next("framebuffer"),
            render_pass: id_of(desc.render_pass.as_any()),
            attachments: desc.attachments.iter().map(|a| id_of(a.as_any())).collect(),
            width: desc.width,
            height: desc.height,
        }))
    }

    fn create_descriptor_set_layout(&self, desc: &DescriptorSetLayoutDesc) -> Result<Arc<dyn DescriptorSetLayout>> {
        Ok(Arc::new(MockDescriptorSetLayout {
            id: self.next("descriptor_set_layout"),
            bindings: desc.bindings.clone(),
        }))
    }

    fn create_pipeline_layout(&self, desc: &PipelineLayoutDesc) -> Result<Arc<dyn PipelineLayout>> {
        Ok(Arc::new(MockPipelineLayout {
            id: self.next("pipeline_layout"),
            set_layouts: desc.set_layouts.iter().map(|l| id_of(l.as_any())).collect(),
        }))
    }

    fn create_pipeline(&self, desc: &PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        let file_name = |p: &std::path::Path| {
            p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
        };
        Ok(Arc::new(MockPipeline {
            id: self.next("pipeline"),
            vertex_shader: file_name(&desc.vertex_shader),
            fragment_shader: file_name(&desc.fragment_shader),
            render_pass: id_of(desc.render_pass.as_any()),
            depth_write: desc.depth_write,
            dynamic_depth_bias: desc.dynamic_depth_bias,
            color_blend_count: desc.color_blend_attachments.len(),
            specialization: desc.specialization.clone(),
        }))
    }

    fn create_descriptor_pool(&self, desc: &DescriptorPoolDesc) -> Result<Arc<dyn DescriptorPool>> {
        Ok(Arc::new(MockDescriptorPool {
            id: self.next("descriptor_pool"),
            desc: *desc,
            allocated: Mutex::new(0),
        }))
    }

    fn allocate_descriptor_set(
        &self,
        pool: &Arc<dyn DescriptorPool>,
        layout: &Arc<dyn DescriptorSetLayout>,
    ) -> Result<Arc<dyn DescriptorSet>> {
        let mock_pool = pool
            .as_any()
            .downcast_ref::<MockDescriptorPool>()
            .ok_or_else(|| Error::InvalidResource("not a mock pool".to_string()))?;
        let mut allocated = mock_pool.allocated.lock().unwrap();
        if *allocated >= mock_pool.desc.max_sets {
            return Err(Error::OutOfMemory);
        }
        *allocated += 1;
        Ok(Arc::new(MockDescriptorSet {
            id: self.next("descriptor_set"),
            pool: mock_pool.id,
            layout: id_of(layout.as_any()),
        }))
    }

    fn update_descriptor_set(&self, set: &Arc<dyn DescriptorSet>, writes: &[DescriptorWrite]) -> Result<()> {
        let set_id = id_of(set.as_any());
        let mut log = self.log.lock().unwrap();
        for write in writes {
            let resource = match &write.resource {
                DescriptorResource::UniformBuffer(buffer) => id_of(buffer.as_any()),
                DescriptorResource::CombinedImageSampler { texture, .. } => id_of(texture.as_any()),
            };
            log.descriptor_writes.push((set_id, write.binding, resource));
        }
        Ok(())
    }

    fn create_semaphore(&self) -> Result<Arc<dyn Semaphore>> {
        Ok(Arc::new(MockSemaphore { id: self.next("semaphore") }))
    }

    fn create_command_list(&self) -> Result<Box<dyn CommandList>> {
        Ok(Box::new(MockCommandList {
            id: self.next("command_list"),
            commands: Vec::new(),
            recording: false,
        }))
    }

    fn submit(&self, submission: &Submission) -> Result<()> {
        self.log.lock().unwrap().submissions.push(MockSubmission {
            command_list: id_of(submission.command_list.as_any()),
            wait: submission.wait.map(|(s, _)| id_of(s.as_any())),
            wait_stage: submission.wait.map(|(_, stage)| stage),
            signal: submission.signal.map(|s| id_of(s.as_any())),
        });
        Ok(())
    }

    fn submit_and_wait(&self, command_list: &dyn CommandList) -> Result<()> {
        self.log.lock().unwrap().one_shot_submissions.push(id_of(command_list.as_any()));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.log.lock().unwrap().wait_idle_count += 1;
        Ok(())
    }

    fn queue_wait_idle(&self) -> Result<()> {
        self.log.lock().unwrap().queue_wait_idle_count += 1;
        Ok(())
    }

    fn memory_properties(&self) -> &MemoryProperties {
        &self.memory_properties
    }

    fn depth_format(&self) -> TextureFormat {
        TextureFormat::D32_SFLOAT_S8_UINT
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

pub struct MockSwapchain {
    log: Arc<Mutex<MockLog>>,
    images: Vec<Arc<dyn Texture>>,
    extent: (u32, u32),
    next_image: u32,
}

impl Swapchain for MockSwapchain {
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<(u32, bool)> {
        self.log.lock().unwrap().acquires.push(id_of(signal.as_any()));
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.images.len() as u32;
        Ok((index, false))
    }

    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<bool> {
        self.log.lock().unwrap().presents.push((image_index, id_of(wait.as_any())));
        Ok(false)
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<Arc<dyn Texture>> {
        self.images.get(index).cloned()
    }

    fn extent(&self) -> (u32, u32) {
        self.extent
    }

    fn format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_UNORM
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.extent = (width, height);
        self.next_image = 0;
        Ok(())
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
