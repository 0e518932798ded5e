/// Synchronization primitives and pipeline stage / access masks

use std::any::Any;
use bitflags::bitflags;

bitflags! {
    /// Pipeline stages (subset used by the render graph)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStages: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const VERTEX_SHADER = 1 << 1;
        const FRAGMENT_SHADER = 1 << 2;
        const EARLY_FRAGMENT_TESTS = 1 << 3;
        const LATE_FRAGMENT_TESTS = 1 << 4;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 5;
        const TRANSFER = 1 << 6;
        const BOTTOM_OF_PIPE = 1 << 7;
    }
}

bitflags! {
    /// Memory access types used in subpass dependencies
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const COLOR_ATTACHMENT_READ = 1 << 1;
        const COLOR_ATTACHMENT_WRITE = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT_READ = 1 << 3;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 4;
        const TRANSFER_WRITE = 1 << 5;
        const MEMORY_READ = 1 << 6;
    }
}

/// GPU-side semaphore (binary)
///
/// Destroyed when the last reference is dropped.
pub trait Semaphore: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
