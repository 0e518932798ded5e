/// Texture, sampler and image format types

use std::any::Any;
use bitflags::bitflags;

/// Image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    R32G32B32A32_SFLOAT,
    R32G32B32A32_UINT,
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl TextureFormat {
    /// Depth (or depth/stencil) format
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::D16_UNORM
                | TextureFormat::D32_SFLOAT
                | TextureFormat::D24_UNORM_S8_UINT
                | TextureFormat::D32_SFLOAT_S8_UINT
        )
    }

    /// Format carries a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, TextureFormat::D24_UNORM_S8_UINT | TextureFormat::D32_SFLOAT_S8_UINT)
    }

    /// Size of one texel in bytes
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::D16_UNORM => 2,
            TextureFormat::R8G8B8A8_UNORM
            | TextureFormat::R8G8B8A8_SRGB
            | TextureFormat::B8G8R8A8_UNORM
            | TextureFormat::B8G8R8A8_SRGB
            | TextureFormat::D32_SFLOAT
            | TextureFormat::D24_UNORM_S8_UINT => 4,
            TextureFormat::D32_SFLOAT_S8_UINT => 8,
            TextureFormat::R32G32B32A32_SFLOAT | TextureFormat::R32G32B32A32_UINT => 16,
        }
    }
}

bitflags! {
    /// Image usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_DST = 1 << 0;
        const SAMPLED = 1 << 1;
        const COLOR_ATTACHMENT = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
    }
}

bitflags! {
    /// Image view aspect
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAspect: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Descriptor for a render-target image with a dedicated allocation
#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: ImageUsage,
    /// Aspect of the created view
    pub aspect: ImageAspect,
}

/// Descriptor for a sampled texture filled from tightly packed pixels
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Read-only properties of a created image
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: ImageUsage,
    pub aspect: ImageAspect,
}

/// Image + view (+ memory) owned as one object
///
/// Swapchain images are wrapped as non-owning textures: only the view is
/// released on drop.
pub trait Texture: Send + Sync {
    fn info(&self) -> &TextureInfo;

    fn as_any(&self) -> &dyn Any;
}

/// Texel filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Nearest,
    Linear,
}

/// Out-of-range coordinate behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Border color for `AddressMode::ClampToBorder`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorderColor {
    OpaqueWhite,
    OpaqueBlack,
    TransparentBlack,
}

/// Sampler state
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub mag_filter: Filter,
    pub min_filter: Filter,
    pub mipmap_filter: Filter,
    pub address_mode: AddressMode,
    pub max_anisotropy: Option<f32>,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: BorderColor,
}

impl SamplerDesc {
    /// Linear filtering, clamp to edge, opaque white border
    pub fn linear_clamp() -> Self {
        Self {
            mag_filter: Filter::Linear,
            min_filter: Filter::Linear,
            mipmap_filter: Filter::Linear,
            address_mode: AddressMode::ClampToEdge,
            max_anisotropy: None,
            min_lod: 0.0,
            max_lod: 1.0,
            border_color: BorderColor::OpaqueWhite,
        }
    }

    /// Linear filtering with repeat addressing (material textures)
    pub fn linear_repeat() -> Self {
        Self {
            address_mode: AddressMode::Repeat,
            max_lod: 1000.0,
            ..Self::linear_clamp()
        }
    }
}

/// Sampler object
pub trait Sampler: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
