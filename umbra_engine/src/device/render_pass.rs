/// Render pass and framebuffer descriptors
///
/// A render pass here always has exactly one subpass. Layout transitions
/// between passes are expressed with explicit subpass dependencies.

use std::any::Any;
use std::sync::Arc;
use crate::device::{AccessFlags, PipelineStages, Texture, TextureFormat};

/// Sentinel subpass index for work outside the render pass
pub const SUBPASS_EXTERNAL: u32 = u32::MAX;

/// What to do with an attachment at the start of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// What to do with an attachment at the end of the pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferDst,
    PresentSrc,
}

/// One attachment of a render pass
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentDesc {
    pub format: TextureFormat,
    pub load_op: LoadOp,
    pub store_op: StoreOp,
    pub stencil_load_op: LoadOp,
    pub stencil_store_op: StoreOp,
    pub initial_layout: ImageLayout,
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Clear on load, store on end, stencil ignored
    pub fn clear_store(format: TextureFormat, final_layout: ImageLayout) -> Self {
        Self {
            format,
            load_op: LoadOp::Clear,
            store_op: StoreOp::Store,
            stencil_load_op: LoadOp::DontCare,
            stencil_store_op: StoreOp::DontCare,
            initial_layout: ImageLayout::Undefined,
            final_layout,
        }
    }
}

/// Execution/memory dependency between the subpass and outside work
#[derive(Debug, Clone, PartialEq)]
pub struct SubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage: PipelineStages,
    pub dst_stage: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub by_region: bool,
}

/// Single-subpass render pass description
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub color_attachments: Vec<AttachmentDesc>,
    pub depth_attachment: Option<AttachmentDesc>,
    pub dependencies: Vec<SubpassDependency>,
}

/// Render pass object
pub trait RenderPass: Send + Sync {
    /// Number of color attachments
    fn color_attachment_count(&self) -> u32;

    fn as_any(&self) -> &dyn Any;
}

/// Descriptor for creating a framebuffer
///
/// Attachments are listed in render pass order: colors first, then depth.
pub struct FramebufferDesc<'a> {
    pub render_pass: &'a Arc<dyn RenderPass>,
    pub attachments: Vec<Arc<dyn Texture>>,
    pub width: u32,
    pub height: u32,
}

/// Framebuffer object
pub trait Framebuffer: Send + Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn as_any(&self) -> &dyn Any;
}
