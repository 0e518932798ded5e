/// Swapchain trait - presentation surface images

use std::sync::Arc;
use crate::error::Result;
use crate::device::{Semaphore, Texture, TextureFormat};

/// Presentation engine images
///
/// Images are exposed as non-owning textures so they can be used as
/// framebuffer attachments.
pub trait Swapchain: Send {
    /// Acquire the next image, signaling `signal` when it is ready for rendering
    ///
    /// Returns `(image_index, suboptimal)`.
    fn acquire_next_image(&mut self, signal: &dyn Semaphore) -> Result<(u32, bool)>;

    /// Queue `image_index` for presentation once `wait` is signaled
    ///
    /// Returns true if the swapchain should be recreated.
    fn present(&mut self, image_index: u32, wait: &dyn Semaphore) -> Result<bool>;

    /// Number of images
    fn image_count(&self) -> usize;

    /// Image `index` as a texture
    fn image(&self, index: usize) -> Option<Arc<dyn Texture>>;

    /// Current extent (width, height)
    fn extent(&self) -> (u32, u32);

    fn format(&self) -> TextureFormat;

    /// Recreate for a new surface size
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;
}
