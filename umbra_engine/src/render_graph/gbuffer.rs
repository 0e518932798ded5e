/// Offscreen G-buffer
///
/// Three color targets written as MRT in one subpass, plus depth. The
/// color targets end the pass in `ShaderReadOnly` so the composition pass
/// can sample them without an explicit barrier.

use std::sync::Arc;
use crate::device::{
    AccessFlags, AttachmentDesc, ClearValue, Framebuffer, FramebufferDesc, GraphicsDevice,
    ImageLayout, ImageUsage, PipelineStages, RenderPass, RenderPassDesc, Sampler, SamplerDesc,
    SubpassDependency, TextureFormat, SUBPASS_EXTERNAL,
};
use crate::error::Result;
use crate::render_graph::{create_attachment, FrameBufferAttachment};
use crate::engine_debug;

/// World-space position
pub const POSITION_FORMAT: TextureFormat = TextureFormat::R32G32B32A32_SFLOAT;
/// World-space normal
pub const NORMAL_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;
/// Albedo, roughness and metalness packed into integer channels
pub const ALBEDO_FORMAT: TextureFormat = TextureFormat::R32G32B32A32_UINT;

/// The two by-region dependencies of a single-subpass color pass
///
/// Incoming: earlier reads finish before color output. Outgoing: color
/// writes are visible to whatever reads the targets next.
pub fn color_pass_dependencies() -> Vec<SubpassDependency> {
    vec![
        SubpassDependency {
            src_subpass: SUBPASS_EXTERNAL,
            dst_subpass: 0,
            src_stage: PipelineStages::BOTTOM_OF_PIPE,
            dst_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            src_access: AccessFlags::MEMORY_READ,
            dst_access: AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            by_region: true,
        },
        SubpassDependency {
            src_subpass: 0,
            dst_subpass: SUBPASS_EXTERNAL,
            src_stage: PipelineStages::COLOR_ATTACHMENT_OUTPUT,
            dst_stage: PipelineStages::BOTTOM_OF_PIPE,
            src_access: AccessFlags::COLOR_ATTACHMENT_READ | AccessFlags::COLOR_ATTACHMENT_WRITE,
            dst_access: AccessFlags::MEMORY_READ,
            by_region: true,
        },
    ]
}

/// Render pass of the G-buffer
pub fn gbuffer_render_pass_desc(depth_format: TextureFormat) -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: [POSITION_FORMAT, NORMAL_FORMAT, ALBEDO_FORMAT]
            .into_iter()
            .map(|format| AttachmentDesc::clear_store(format, ImageLayout::ShaderReadOnly))
            .collect(),
        depth_attachment: Some(AttachmentDesc::clear_store(depth_format, ImageLayout::DepthStencilAttachment)),
        dependencies: color_pass_dependencies(),
    }
}

/// G-buffer targets, render pass, framebuffer and sampler
pub struct GBuffer {
    pub position: FrameBufferAttachment,
    pub normal: FrameBufferAttachment,
    pub albedo: FrameBufferAttachment,
    pub depth: FrameBufferAttachment,
    render_pass: Arc<dyn RenderPass>,
    framebuffer: Arc<dyn Framebuffer>,
    /// Sampler used by the composition pass to read the color targets
    sampler: Arc<dyn Sampler>,
    width: u32,
    height: u32,
}

impl GBuffer {
    pub fn new(device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<Self> {
        let depth_format = device.depth_format();
        let render_pass = device.create_render_pass(&gbuffer_render_pass_desc(depth_format))?;
        let sampler = device.create_sampler(&SamplerDesc::linear_clamp())?;
        let targets = Targets::create(device, &render_pass, depth_format, width, height)?;

        engine_debug!("umbra::GBuffer", "Created G-buffer {}x{} (depth {:?})", width, height, depth_format);

        Ok(Self {
            position: targets.position,
            normal: targets.normal,
            albedo: targets.albedo,
            depth: targets.depth,
            render_pass,
            framebuffer: targets.framebuffer,
            sampler,
            width,
            height,
        })
    }

    /// Recreate the targets and framebuffer at a new size
    ///
    /// The render pass is kept, so pipelines built against it stay valid.
    /// The caller must wait for the device to be idle first.
    pub fn resize(&mut self, device: &dyn GraphicsDevice, width: u32, height: u32) -> Result<()> {
        let targets = Targets::create(device, &self.render_pass, self.depth.format, width, height)?;
        self.position = targets.position;
        self.normal = targets.normal;
        self.albedo = targets.albedo;
        self.depth = targets.depth;
        self.framebuffer = targets.framebuffer;
        self.width = width;
        self.height = height;

        engine_debug!("umbra::GBuffer", "Resized G-buffer to {}x{}", width, height);
        Ok(())
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    pub fn framebuffer(&self) -> &Arc<dyn Framebuffer> {
        &self.framebuffer
    }

    pub fn sampler(&self) -> &Arc<dyn Sampler> {
        &self.sampler
    }

    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Color targets in binding order (position, normal, albedo)
    pub fn color_attachments(&self) -> [&FrameBufferAttachment; 3] {
        [&self.position, &self.normal, &self.albedo]
    }

    /// Clear values in attachment order
    pub fn clear_values() -> [ClearValue; 4] {
        [
            ClearValue::Color([0.0; 4]),
            ClearValue::Color([0.0; 4]),
            ClearValue::Color([0.0; 4]),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ]
    }
}

/// Size-dependent part of the G-buffer
struct Targets {
    position: FrameBufferAttachment,
    normal: FrameBufferAttachment,
    albedo: FrameBufferAttachment,
    depth: FrameBufferAttachment,
    framebuffer: Arc<dyn Framebuffer>,
}

impl Targets {
    fn create(
        device: &dyn GraphicsDevice,
        render_pass: &Arc<dyn RenderPass>,
        depth_format: TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let color = |format| create_attachment(device, format, ImageUsage::COLOR_ATTACHMENT, width, height);
        let position = color(POSITION_FORMAT)?;
        let normal = color(NORMAL_FORMAT)?;
        let albedo = color(ALBEDO_FORMAT)?;
        let depth = create_attachment(device, depth_format, ImageUsage::DEPTH_STENCIL_ATTACHMENT, width, height)?;

        let framebuffer = device.create_framebuffer(&FramebufferDesc {
            render_pass,
            attachments: vec![
                Arc::clone(&position.texture),
                Arc::clone(&normal.texture),
                Arc::clone(&albedo.texture),
                Arc::clone(&depth.texture),
            ],
            width,
            height,
        })?;

        Ok(Self { position, normal, albedo, depth, framebuffer })
    }
}

#[cfg(test)]
#[path = "gbuffer_tests.rs"]
mod tests;
