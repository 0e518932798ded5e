/// CommandList - Vulkan implementation of the CommandList trait

use umbra_engine::umbra::{Result, Error};
use umbra_engine::umbra::device::{
    CommandList as RendererCommandList,
    RenderPass as RendererRenderPass,
    Framebuffer as RendererFramebuffer,
    Pipeline as RendererPipeline,
    PipelineLayout as RendererPipelineLayout,
    Buffer as RendererBuffer,
    DescriptorSet as RendererDescriptorSet,
    Viewport, Rect2D, ClearValue, DrawIndexed, IndexType, ShaderStages,
};
use umbra_engine::engine_error;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan::shader_stages_to_vk;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::{downcast, GpuContext};
use crate::vulkan_descriptor_set::DescriptorSet;
use crate::vulkan_frame_buffer::Framebuffer;
use crate::vulkan_pipeline::{Pipeline, PipelineLayout};
use crate::vulkan_render_pass::RenderPass;

/// Vulkan command list implementation
///
/// Records commands once; the recording can be submitted any number of
/// times until the next `begin`.
pub struct CommandList {
    /// Shared GPU context (device, queue family)
    ctx: Arc<GpuContext>,
    /// Command pool for allocating command buffers
    command_pool: vk::CommandPool,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
    /// Whether we're inside a render pass
    in_render_pass: bool,
}

impl CommandList {
    /// Create a new command list with its own resettable pool
    pub fn new(ctx: Arc<GpuContext>) -> Result<Self> {
        unsafe {
            // Create command pool
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("umbra::vulkan", "Failed to create command pool: {:?}", e);
                    Error::BackendError(format!("Failed to create command pool: {:?}", e))
                })?;

            // Allocate command buffer
            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffers = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers,
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    engine_error!("umbra::vulkan", "Failed to allocate command buffer: {:?}", e);
                    return Err(Error::BackendError(format!("Failed to allocate command buffers: {:?}", e)));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer: command_buffers[0],
                is_recording: false,
                in_render_pass: false,
            })
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    fn check_recording(&self) -> Result<()> {
        if !self.is_recording {
            return Err(Error::BackendError("Command list not recording".to_string()));
        }
        Ok(())
    }

    fn check_in_render_pass(&self) -> Result<()> {
        self.check_recording()?;
        if !self.in_render_pass {
            return Err(Error::BackendError("Not inside a render pass".to_string()));
        }
        Ok(())
    }
}

impl RendererCommandList for CommandList {
    fn begin(&mut self) -> Result<()> {
        if self.in_render_pass {
            return Err(Error::BackendError("Render pass still open while restarting the command list".to_string()));
        }

        unsafe {
            // Reset command buffer (discards a previous or unfinished recording)
            self.ctx.device
                .reset_command_buffer(
                    self.command_buffer,
                    vk::CommandBufferResetFlags::empty(),
                )
                .map_err(|e| Error::BackendError(format!("Failed to reset command buffer: {:?}", e)))?;

            // Recorded once, submitted every frame
            let begin_info = vk::CommandBufferBeginInfo::default();

            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| Error::BackendError(format!("Failed to begin command buffer: {:?}", e)))?;

            self.is_recording = true;
            self.in_render_pass = false;

            Ok(())
        }
    }

    fn end(&mut self) -> Result<()> {
        self.check_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Render pass not ended before ending command list".to_string()));
        }

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| Error::BackendError(format!("Failed to end command buffer: {:?}", e)))?;

            self.is_recording = false;

            Ok(())
        }
    }

    fn begin_render_pass(
        &mut self,
        render_pass: &Arc<dyn RendererRenderPass>,
        framebuffer: &Arc<dyn RendererFramebuffer>,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        self.check_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Already inside a render pass".to_string()));
        }

        let vk_render_pass = downcast::<RenderPass>(render_pass.as_any(), "Render pass")?;
        let vk_framebuffer = downcast::<Framebuffer>(framebuffer.as_any(), "Framebuffer")?;

        // Convert clear values
        let vk_clear_values: Vec<vk::ClearValue> = clear_values
            .iter()
            .map(|cv| match cv {
                ClearValue::Color(color) => vk::ClearValue {
                    color: vk::ClearColorValue {
                        float32: *color,
                    },
                },
                ClearValue::DepthStencil { depth, stencil } => vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: *depth,
                        stencil: *stencil,
                    },
                },
            })
            .collect();

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(vk_render_pass.render_pass)
            .framebuffer(vk_framebuffer.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: framebuffer.width(),
                    height: framebuffer.height(),
                },
            })
            .clear_values(&vk_clear_values);

        unsafe {
            self.ctx.device.cmd_begin_render_pass(
                self.command_buffer,
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }

        self.in_render_pass = true;

        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_end_render_pass(self.command_buffer);
        }
        self.in_render_pass = false;

        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.check_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }

        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.check_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }

        Ok(())
    }

    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()> {
        self.check_recording()?;

        unsafe {
            self.ctx.device.cmd_set_depth_bias(self.command_buffer, constant_factor, clamp, slope_factor);
        }

        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.check_recording()?;

        let vk_pipeline = downcast::<Pipeline>(pipeline.as_any(), "Pipeline")?;

        unsafe {
            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }

        Ok(())
    }

    fn bind_descriptor_set(
        &mut self,
        layout: &Arc<dyn RendererPipelineLayout>,
        set_index: u32,
        set: &Arc<dyn RendererDescriptorSet>,
    ) -> Result<()> {
        self.check_recording()?;

        let vk_layout = downcast::<PipelineLayout>(layout.as_any(), "Pipeline layout")?;
        let vk_set = downcast::<DescriptorSet>(set.as_any(), "Descriptor set")?;

        if set_index as usize >= vk_layout.set_bindings.len() {
            return Err(Error::BackendError(format!(
                "Set index {} out of range for a layout with {} sets",
                set_index,
                vk_layout.set_bindings.len()
            )));
        }

        unsafe {
            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_layout.pipeline_layout,
                set_index,
                &[vk_set.descriptor_set],
                &[], // dynamic_offsets
            );
        }

        Ok(())
    }

    fn push_constants(
        &mut self,
        layout: &Arc<dyn RendererPipelineLayout>,
        stages: ShaderStages,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.check_recording()?;

        let vk_layout = downcast::<PipelineLayout>(layout.as_any(), "Pipeline layout")?;

        if offset + data.len() as u32 > vk_layout.push_constant_size {
            return Err(Error::BackendError(format!(
                "Push constants out of range ({} + {} bytes > {} bytes)",
                offset,
                data.len(),
                vk_layout.push_constant_size
            )));
        }

        unsafe {
            self.ctx.device.cmd_push_constants(
                self.command_buffer,
                vk_layout.pipeline_layout,
                shader_stages_to_vk(stages),
                offset,
                data,
            );
        }

        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.check_recording()?;

        let vk_buffer = downcast::<Buffer>(buffer.as_any(), "Buffer")?;

        unsafe {
            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
        }

        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.check_recording()?;

        let vk_buffer = downcast::<Buffer>(buffer.as_any(), "Buffer")?;
        let vk_index_type = match index_type {
            IndexType::U16 => vk::IndexType::UINT16,
            IndexType::U32 => vk::IndexType::UINT32,
        };

        unsafe {
            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                vk_index_type,
            );
        }

        Ok(())
    }

    fn draw_indexed(&mut self, draw: DrawIndexed) -> Result<()> {
        self.check_in_render_pass()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                draw.index_count,
                draw.instance_count,
                draw.first_index,
                draw.vertex_offset,
                draw.first_instance,
            );
        }

        Ok(())
    }

    fn copy_buffer(&mut self, src: &Arc<dyn RendererBuffer>, dst: &Arc<dyn RendererBuffer>, size: u64) -> Result<()> {
        self.check_recording()?;

        if self.in_render_pass {
            return Err(Error::BackendError("Buffer copies are not allowed inside a render pass".to_string()));
        }

        let vk_src = downcast::<Buffer>(src.as_any(), "Buffer")?;
        let vk_dst = downcast::<Buffer>(dst.as_any(), "Buffer")?;
        let region = vk::BufferCopy::default().size(size);

        unsafe {
            self.ctx.device.cmd_copy_buffer(self.command_buffer, vk_src.buffer, vk_dst.buffer, &[region]);
        }

        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for CommandList {
    fn drop(&mut self) {
        unsafe {
            // Command buffer is freed with its pool
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
