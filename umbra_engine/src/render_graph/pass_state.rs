/// Lifecycle of one pass instance
///
/// `Uninitialized -> FramebufferBuilt -> Recorded`, with `Recorded`
/// re-entered every time the command list is re-recorded. Rebuilding the
/// framebuffer (resize) drops back to `FramebufferBuilt`.

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Uninitialized,
    FramebufferBuilt,
    Recorded,
}

impl PassState {
    /// Framebuffer (re)created; any recorded commands are stale
    pub fn framebuffer_built(&mut self) {
        *self = PassState::FramebufferBuilt;
    }

    /// Check that recording may start
    pub fn begin_recording(&self, pass: &str) -> Result<()> {
        match self {
            PassState::Uninitialized => Err(Error::NotReady(format!(
                "Pass '{}' has no framebuffer to record into", pass
            ))),
            PassState::FramebufferBuilt | PassState::Recorded => Ok(()),
        }
    }

    /// Command list recorded
    pub fn recorded(&mut self) {
        *self = PassState::Recorded;
    }

    pub fn is_recorded(&self) -> bool {
        *self == PassState::Recorded
    }
}

#[cfg(test)]
#[path = "pass_state_tests.rs"]
mod tests;
