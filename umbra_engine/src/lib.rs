/*!
# Umbra Engine

Multi-pass deferred renderer with shadow-mapped spot lights.

The crate is backend-agnostic: GPU objects are reached through the traits
in `device`, implemented by a backend crate such as
`umbra_engine_renderer_vulkan`.

## Frame structure

- **Shadow passes**: one depth-only pass per light into its own shadow map
- **G-buffer pass**: sky sphere, opaque meshes, then alpha-tested meshes into
  position, normal and albedo targets
- **Composition pass**: full-screen lighting into the swapchain image, or the
  four-quadrant debug view

Submissions are chained with semaphores so each pass waits on the previous
one, starting from the image acquisition and ending at presentation.
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod memory;
pub mod device;
pub mod registry;
pub mod scene;
pub mod camera;
pub mod lights;
pub mod uniforms;
pub mod render_graph;
pub mod scheduler;
pub mod renderer;

// Main umbra namespace module
pub mod umbra {
    // Error types
    pub use crate::error::{Error, Result};

    // Process-wide logger facade
    pub use crate::engine::Engine;

    // Renderer entry points
    pub use crate::config::{CameraConfig, RendererConfig};
    pub use crate::renderer::{DeferredRenderer, OverlayLabel, TextAlign};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
        // Note: engine_* macros are exported at the crate root
    }

    // Device abstraction implemented by the backends
    pub mod device {
        pub use crate::device::*;
        pub use crate::memory::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::camera::*;
        pub use crate::lights::*;
        pub use crate::scene::*;
    }

    // Render graph sub-module
    pub mod render {
        pub use crate::registry::*;
        pub use crate::render_graph::*;
        pub use crate::scheduler::*;
        pub use crate::uniforms::*;
    }
}

// Re-export math library at crate root
pub use glam;
