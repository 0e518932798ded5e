/// Final lighting pass into the swapchain
///
/// One command list per swapchain image. The composition pipeline draws
/// the full-screen quad, sampling the G-buffer and every shadow map. In
/// debug display the raw G-buffer channels are drawn first into three
/// quadrants and the lit image is moved to the fourth.

use std::sync::Arc;
use crate::device::{
    AttachmentDesc, ClearValue, CommandList, DrawIndexed, Framebuffer, FramebufferDesc,
    GraphicsDevice, ImageLayout, ImageUsage, IndexType, Rect2D, RenderPass, RenderPassDesc,
    Swapchain, TextureFormat, Viewport,
};
use crate::error::{Error, Result};
use crate::registry::{LayoutId, PipelineId, RenderResources};
use crate::render_graph::{
    color_pass_dependencies, create_attachment, FrameBufferAttachment, PassState,
    DEBUG_INDEX_COUNT, FULLSCREEN_INDEX_COUNT,
};
use crate::scene::MeshBuffers;
use crate::{engine_debug, engine_info};

/// Background color behind the lit image
pub const COMPOSITION_CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.2, 0.0];

/// Render pass writing the swapchain image (plus a depth target)
pub fn swapchain_render_pass_desc(color_format: TextureFormat, depth_format: TextureFormat) -> RenderPassDesc {
    RenderPassDesc {
        color_attachments: vec![AttachmentDesc::clear_store(color_format, ImageLayout::PresentSrc)],
        depth_attachment: Some(AttachmentDesc::clear_store(depth_format, ImageLayout::DepthStencilAttachment)),
        dependencies: color_pass_dependencies(),
    }
}

pub struct CompositionPass {
    render_pass: Arc<dyn RenderPass>,
    depth: FrameBufferAttachment,
    framebuffers: Vec<Arc<dyn Framebuffer>>,
    command_lists: Vec<Box<dyn CommandList>>,
    extent: (u32, u32),
    state: PassState,
}

impl CompositionPass {
    pub fn new(device: &dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<Self> {
        let render_pass = device.create_render_pass(&swapchain_render_pass_desc(swapchain.format(), device.depth_format()))?;
        let (depth, framebuffers) = create_targets(device, &render_pass, swapchain)?;
        let command_lists = (0..framebuffers.len())
            .map(|_| device.create_command_list())
            .collect::<Result<Vec<_>>>()?;

        let mut state = PassState::default();
        state.framebuffer_built();

        engine_info!("umbra::CompositionPass", "Created {} swapchain framebuffers", framebuffers.len());

        Ok(Self {
            render_pass,
            depth,
            framebuffers,
            command_lists,
            extent: swapchain.extent(),
            state,
        })
    }

    /// Recreate the depth target and framebuffers after a swapchain resize
    ///
    /// The command lists must be re-recorded afterwards.
    pub fn rebuild_framebuffers(&mut self, device: &dyn GraphicsDevice, swapchain: &dyn Swapchain) -> Result<()> {
        let (depth, framebuffers) = create_targets(device, &self.render_pass, swapchain)?;
        while self.command_lists.len() < framebuffers.len() {
            self.command_lists.push(device.create_command_list()?);
        }
        self.command_lists.truncate(framebuffers.len());

        self.depth = depth;
        self.framebuffers = framebuffers;
        self.extent = swapchain.extent();
        self.state.framebuffer_built();
        Ok(())
    }

    /// Record one command list per swapchain image
    pub fn record(&mut self, resources: &RenderResources, quads: &MeshBuffers, debug_display: bool) -> Result<()> {
        self.state.begin_recording("composition")?;

        let (composition, layout) = resources.pipeline(PipelineId::Composition)?;
        let (debug, _) = resources.pipeline(PipelineId::DebugDisplay)?;
        let set = resources.descriptor_sets.require(LayoutId::Composition)?;
        let (width, height) = self.extent;
        let clear_values = Self::clear_values();

        for (cmd, framebuffer) in self.command_lists.iter_mut().zip(&self.framebuffers) {
            cmd.begin()?;
            cmd.begin_render_pass(&self.render_pass, framebuffer, &clear_values)?;
            cmd.set_viewport(Viewport::full(width, height))?;
            cmd.set_scissor(Rect2D::full(width, height))?;
            cmd.bind_descriptor_set(layout, 0, set)?;

            if debug_display {
                cmd.bind_pipeline(debug)?;
                cmd.bind_vertex_buffer(&quads.vertex_buffer, 0)?;
                cmd.bind_index_buffer(&quads.index_buffer, 0, IndexType::U32)?;
                cmd.draw_indexed(DrawIndexed {
                    index_count: DEBUG_INDEX_COUNT,
                    instance_count: 1,
                    first_index: 0,
                    vertex_offset: 0,
                    first_instance: 1,
                })?;
                // Lit image goes to the remaining quadrant
                cmd.set_viewport(Viewport {
                    x: width as f32 * 0.5,
                    y: height as f32 * 0.5,
                    ..Viewport::full(width, height)
                })?;
            }

            cmd.bind_pipeline(composition)?;
            cmd.bind_vertex_buffer(&quads.vertex_buffer, 0)?;
            cmd.bind_index_buffer(&quads.index_buffer, 0, IndexType::U32)?;
            cmd.draw_indexed(DrawIndexed {
                index_count: FULLSCREEN_INDEX_COUNT,
                instance_count: 1,
                first_index: 0,
                vertex_offset: 0,
                first_instance: 1,
            })?;

            cmd.end_render_pass()?;
            cmd.end()?;
        }

        self.state.recorded();
        engine_debug!("umbra::CompositionPass", "Recorded {} composition command lists (debug display {})",
            self.command_lists.len(), debug_display);
        Ok(())
    }

    /// Command list of swapchain image `image_index`
    pub fn command_list(&self, image_index: u32) -> Result<&dyn CommandList> {
        self.command_lists
            .get(image_index as usize)
            .map(|cmd| cmd.as_ref())
            .ok_or_else(|| Error::InvalidResource(format!(
                "No composition command list for swapchain image {}", image_index
            )))
    }

    pub fn render_pass(&self) -> &Arc<dyn RenderPass> {
        &self.render_pass
    }

    /// Depth target shared by every framebuffer
    pub fn depth(&self) -> &FrameBufferAttachment {
        &self.depth
    }

    pub fn image_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn extent(&self) -> (u32, u32) {
        self.extent
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    pub fn clear_values() -> [ClearValue; 2] {
        [
            ClearValue::Color(COMPOSITION_CLEAR_COLOR),
            ClearValue::DepthStencil { depth: 1.0, stencil: 0 },
        ]
    }
}

/// Depth target plus one framebuffer per swapchain image
fn create_targets(
    device: &dyn GraphicsDevice,
    render_pass: &Arc<dyn RenderPass>,
    swapchain: &dyn Swapchain,
) -> Result<(FrameBufferAttachment, Vec<Arc<dyn Framebuffer>>)> {
    let (width, height) = swapchain.extent();
    let depth = create_attachment(device, device.depth_format(), ImageUsage::DEPTH_STENCIL_ATTACHMENT, width, height)?;

    let framebuffers = (0..swapchain.image_count())
        .map(|index| {
            let image = swapchain.image(index).ok_or_else(|| {
                Error::InvalidResource(format!("Swapchain image {} missing", index))
            })?;
            device.create_framebuffer(&FramebufferDesc {
                render_pass,
                attachments: vec![image, Arc::clone(&depth.texture)],
                width,
                height,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((depth, framebuffers))
}

#[cfg(test)]
#[path = "composition_pass_tests.rs"]
mod tests;
