/// Shadow map passes (one per light)
///
/// Every light gets its own depth target, framebuffer, command list and
/// completion semaphore. All of them share one render pass; the light index
/// is pushed as a constant so the vertex shader picks its light-space matrix.

use std::sync::Arc;
use crate::device::{
    AccessFlags, AttachmentDesc, ClearValue, CommandList, DrawIndexed, Framebuffer,
    FramebufferDesc, GraphicsDevice, ImageLayout, ImageUsage, IndexType, PipelineStages, Rect2D,
    RenderPass, RenderPassDesc, Sampler, SamplerDesc, Semaphore, ShaderStages, SubpassDependency,
    TextureFormat, Viewport, SUBPASS_EXTERNAL,
};
use crate::error::{Error, Result};
use crate::registry::{LayoutId, PipelineId, RenderResources};
use crate::render_graph::{create_attachment, FrameBufferAttachment, PassState};
use crate::scene::Scene;
use crate::{engine_debug, engine_info};

/// Depth format of every shadow map
pub const SHADOW_MAP_FORMAT: TextureFormat = TextureFormat::D16_UNORM;

/// Depth bias applied while rendering shadow maps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant_factor: f32,
    pub clamp: f32,
    pub slope_factor: f32,
}

impl DepthBias {
    pub fn new(constant_factor: f32, slope_factor: f32) -> Self {
        Self { constant_factor, clamp: 0.0, slope_factor }
    }
}

/// Shared render pass of the shadow maps
///
/// The depth target ends in `DepthStencilReadOnly`. Fragment-shader reads of
/// the previous frame finish before the depth tests write, and depth
/// writes are visible to the composition pass's fragment shader.
pub fn shadow_render_pass_desc() -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: Vec::new(),
        depth_attachment: Some(AttachmentDesc::clear_store(SHADOW_MAP_FORMAT, ImageLayout::DepthStencilReadOnly)),
        dependencies: vec![
            SubpassDependency {
                src_subpass: SUBPASS_EXTERNAL,
                dst_subpass: 0,
                src_stage: PipelineStages::FRAGMENT_SHADER,
                dst_stage: PipelineStages::LATE_FRAGMENT_TESTS,
                src_access: AccessFlags::SHADER_READ,
                dst_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                by_region: true,
            },
            SubpassDependency {
                src_subpass: 0,
                dst_subpass: SUBPASS_EXTERNAL,
                src_stage: PipelineStages::LATE_FRAGMENT_TESTS,
                dst_stage: PipelineStages::FRAGMENT_SHADER,
                src_access: AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ | AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                dst_access: AccessFlags::SHADER_READ,
                by_region: true,
            },
        ],
    }
}

/// Per-light shadow state
pub struct ShadowPass {
    pub depth: FrameBufferAttachment,
    pub framebuffer: Arc<dyn Framebuffer>,
    pub sampler: Arc<dyn Sampler>,
    pub command_list: Box<dyn CommandList>,
    /// Signaled when this light's shadow map is complete
    pub semaphore: Arc<dyn Semaphore>,
    state: PassState,
}

impl ShadowPass {
    pub fn state(&self) -> PassState {
        self.state
    }
}

/// Every shadow pass plus their shared render pass
pub struct ShadowPasses {
    render_pass: Arc<dyn RenderPass>,
    passes: Vec<ShadowPass>,
    size: u32,
}

impl ShadowPasses {
    /// Create `light_count` square shadow maps of `size` texels
    pub fn new(device: &dyn GraphicsDevice, light_count: usize, size: u32) -> Result<Self> {
        if light_count == 0 {
            return Err(Error::InvalidResource("At least one shadow-casting light is required".to_string()));
        }

        let render_pass = device.create_render_pass(&shadow_render_pass_desc())?;
        let mut passes = Vec::with_capacity(light_count);

        for _ in 0..light_count {
            let depth = create_attachment(device, SHADOW_MAP_FORMAT, ImageUsage::DEPTH_STENCIL_ATTACHMENT, size, size)?;
            let framebuffer = device.create_framebuffer(&FramebufferDesc {
                render_pass: &render_pass,
                attachments: vec![Arc::clone(&depth.texture)],
                width: size,
                height: size,
            })?;
            let sampler = device.create_sampler(&SamplerDesc::linear_clamp())?;

            let mut state = PassState::default();
            state.framebuffer_built();

            passes.push(ShadowPass {
                depth,
                framebuffer,
                sampler,
                command_list: device.create_command_list()?,
                semaphore: device.create_semaphore()?,
                state,
            });
        }

        engine_info!("umbra::ShadowPasses", "Created {} shadow maps of {}x{}", light_count, size, size);

        Ok(Self { render_pass, passes, size })
    }

    /// Record every light's command list
    ///
    /// Only opaque meshes cast shadows. A scene without geometry records
    /// empty passes that still clear the depth targets.
    pub fn record(&mut self, resources: &RenderResources, scene: &Scene, bias: DepthBias) -> Result<()> {
        let (pipeline, layout) = resources.pipeline(PipelineId::Shadowmap)?;
        let set = resources.descriptor_sets.require(LayoutId::Shadowmap)?;
        let clear_values = [ClearValue::DepthStencil { depth: 1.0, stencil: 0 }];

        for (light_index, pass) in self.passes.iter_mut().enumerate() {
            pass.state.begin_recording(&format!("shadow[{}]", light_index))?;

            let cmd = pass.command_list.as_mut();
            cmd.begin()?;
            cmd.set_viewport(Viewport::full(self.size, self.size))?;
            cmd.set_scissor(Rect2D::full(self.size, self.size))?;
            cmd.set_depth_bias(bias.constant_factor, bias.clamp, bias.slope_factor)?;

            cmd.begin_render_pass(&self.render_pass, &pass.framebuffer, &clear_values)?;
            cmd.bind_pipeline(pipeline)?;
            cmd.bind_descriptor_set(layout, 0, set)?;
            cmd.push_constants(layout, ShaderStages::VERTEX, 0, &(light_index as i32).to_ne_bytes())?;

            if let Some((vertex_buffer, index_buffer)) = scene.buffers() {
                cmd.bind_vertex_buffer(vertex_buffer, 0)?;
                cmd.bind_index_buffer(index_buffer, 0, IndexType::U32)?;
                for mesh in scene.opaque_meshes() {
                    cmd.draw_indexed(DrawIndexed::range(mesh.index_base, mesh.index_count))?;
                }
            }

            cmd.end_render_pass()?;
            cmd.end()?;
            pass.state.recorded();
        }

        engine_debug!("umbra::ShadowPasses", "Recorded {} shadow command lists", self.passes.len());
        Ok(())
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn passes(&self) -> &[ShadowPass] {
        &self.passes
    }

    pub fn get(&self, light_index: usize) -> Option<&ShadowPass> {
        self.passes.get(light_index)
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Width and height of every shadow map
    pub fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
#[path = "shadow_pass_tests.rs"]
mod tests;
