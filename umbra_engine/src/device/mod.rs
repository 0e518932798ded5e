/// Graphics device module - GPU object traits and descriptors

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod render_pass;
pub mod pipeline;
pub mod descriptor;
pub mod command_list;
pub mod swapchain;
pub mod sync;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use render_pass::*;
pub use pipeline::*;
pub use descriptor::*;
pub use command_list::*;
pub use swapchain::*;
pub use sync::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
