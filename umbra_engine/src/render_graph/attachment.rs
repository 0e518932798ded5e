/// Frame buffer attachments
///
/// A render target image, its view and its dedicated device-local memory,
/// owned as one `Texture`. Layout transitions are never recorded by hand:
/// every render pass declares them through its attachments and subpass
/// dependencies.

use std::sync::Arc;
use crate::device::{GraphicsDevice, ImageAspect, ImageDesc, ImageUsage, Texture, TextureFormat};
use crate::error::Result;
use crate::engine_trace;

/// One render target
#[derive(Clone)]
pub struct FrameBufferAttachment {
    pub texture: Arc<dyn Texture>,
    pub format: TextureFormat,
}

impl FrameBufferAttachment {
    pub fn width(&self) -> u32 {
        self.texture.info().width
    }

    pub fn height(&self) -> u32 {
        self.texture.info().height
    }
}

/// View aspect for an attachment of the given usage and format
///
/// Color attachments get the color aspect. Depth attachments get depth,
/// plus stencil when the format carries one (a `D16_UNORM` shadow map has
/// no stencil aspect to view).
pub fn aspect_for_usage(usage: ImageUsage, format: TextureFormat) -> ImageAspect {
    let mut aspect = ImageAspect::empty();
    if usage.contains(ImageUsage::COLOR_ATTACHMENT) {
        aspect |= ImageAspect::COLOR;
    }
    if usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT) {
        aspect |= ImageAspect::DEPTH;
        if format.has_stencil() {
            aspect |= ImageAspect::STENCIL;
        }
    }
    aspect
}

/// Create a sampled render target
///
/// `usage` is augmented with `SAMPLED` so later passes can read the
/// attachment. The backend binds device-local memory chosen through
/// `memory::find_memory_type_index`.
pub fn create_attachment(
    device: &dyn GraphicsDevice,
    format: TextureFormat,
    usage: ImageUsage,
    width: u32,
    height: u32,
) -> Result<FrameBufferAttachment> {
    let usage = usage | ImageUsage::SAMPLED;
    let desc = ImageDesc {
        width,
        height,
        format,
        usage,
        aspect: aspect_for_usage(usage, format),
    };
    let texture = device.create_image(&desc)?;

    engine_trace!("umbra::attachment", "Created {:?} attachment {}x{} ({:?})",
        format, width, height, desc.aspect);

    Ok(FrameBufferAttachment { texture, format })
}

#[cfg(test)]
#[path = "attachment_tests.rs"]
mod tests;
