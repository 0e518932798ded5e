/// Render graph module - the fixed shadow, G-buffer and composition passes
///
/// Each pass owns its render pass, framebuffers and command lists. Passes
/// are recorded once and re-recorded only when a toggle or the surface
/// size changes.

pub mod pass_state;
pub mod attachment;
pub mod quads;
pub mod gbuffer;
pub mod shadow_pass;
pub mod geometry_pass;
pub mod composition_pass;
pub mod layouts;
pub mod pipelines;

pub use pass_state::*;
pub use attachment::*;
pub use quads::*;
pub use gbuffer::*;
pub use shadow_pass::*;
pub use geometry_pass::*;
pub use composition_pass::*;
pub use layouts::*;
pub use pipelines::*;

// Mock-device fixture shared by the pass tests
#[cfg(test)]
pub(crate) mod test_fixture;
