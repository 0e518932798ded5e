/// Device memory type selection
///
/// Mirrors the device's memory type table so the selection rule can run
/// (and be tested) without a GPU. The Vulkan backend fills `MemoryProperties`
/// from `vkGetPhysicalDeviceMemoryProperties`.

use bitflags::bitflags;
use crate::error::Result;
use crate::engine_bail;

bitflags! {
    /// Memory property flags (bit values match `VkMemoryPropertyFlagBits`)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemoryPropertyFlags: u32 {
        const DEVICE_LOCAL = 0x1;
        const HOST_VISIBLE = 0x2;
        const HOST_COHERENT = 0x4;
        const HOST_CACHED = 0x8;
        const LAZILY_ALLOCATED = 0x10;
    }
}

/// One entry of the device memory type table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryType {
    pub property_flags: MemoryPropertyFlags,
    pub heap_index: u32,
}

/// Device memory type table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProperties {
    pub memory_types: Vec<MemoryType>,
}

impl MemoryProperties {
    /// Select a memory type, failing with an error when none fits
    pub fn memory_type_index(&self, type_bits: u32, required: MemoryPropertyFlags) -> Result<u32> {
        match find_memory_type_index(self, type_bits, required) {
            Some(index) => Ok(index),
            None => engine_bail!("umbra::memory",
                "No memory type matches bits {:#b} with properties {:?}", type_bits, required),
        }
    }
}

/// Return the lowest memory type index whose bit is set in `type_bits`
/// and whose properties contain every flag of `required`.
///
/// `type_bits` comes from the resource's memory requirements; bit `i`
/// set means memory type `i` can back the resource.
pub fn find_memory_type_index(
    properties: &MemoryProperties,
    type_bits: u32,
    required: MemoryPropertyFlags,
) -> Option<u32> {
    properties
        .memory_types
        .iter()
        .enumerate()
        .take(32)
        .find(|(i, memory_type)| {
            type_bits & (1 << i) != 0 && memory_type.property_flags.contains(required)
        })
        .map(|(i, _)| i as u32)
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
