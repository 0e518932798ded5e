/// Buffer trait and buffer descriptor

use std::any::Any;
use crate::error::Result;

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
    /// Host-visible transfer source
    Staging,
}

/// Where the buffer memory lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryLocation {
    /// Host-visible, coherent and persistently mapped
    CpuToGpu,
    /// Device-local, filled through a staging copy
    GpuOnly,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    /// Size in bytes
    pub size: u64,
    pub usage: BufferUsage,
    pub location: MemoryLocation,
}

impl BufferDesc {
    /// Host-visible uniform buffer
    pub fn uniform(size: u64) -> Self {
        Self { size, usage: BufferUsage::Uniform, location: MemoryLocation::CpuToGpu }
    }

    /// Host-visible staging buffer
    pub fn staging(size: u64) -> Self {
        Self { size, usage: BufferUsage::Staging, location: MemoryLocation::CpuToGpu }
    }

    /// Device-local buffer of the given usage
    pub fn device_local(size: u64, usage: BufferUsage) -> Self {
        Self { size, usage, location: MemoryLocation::GpuOnly }
    }
}

/// Index element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U16,
    U32,
}

/// Buffer resource trait
///
/// Implemented by backend-specific buffer types (e.g. the Vulkan `Buffer`).
/// The buffer is destroyed when the last reference is dropped.
pub trait Buffer: Send + Sync {
    /// Write `data` at `offset` into mapped memory
    ///
    /// Fails for `MemoryLocation::GpuOnly` buffers.
    fn update(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Size in bytes
    fn size(&self) -> u64;

    fn as_any(&self) -> &dyn Any;
}
