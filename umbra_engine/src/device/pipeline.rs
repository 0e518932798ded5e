/// Descriptor set layouts, pipeline layouts and graphics pipelines

use std::any::Any;
use std::path::PathBuf;
use std::sync::Arc;
use bitflags::bitflags;
use crate::device::RenderPass;

bitflags! {
    /// Shader stages a binding or push constant range is visible to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
    }
}

/// Descriptor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    UniformBuffer,
    CombinedImageSampler,
}

/// One binding slot of a descriptor set layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorBinding {
    pub binding: u32,
    pub descriptor_type: DescriptorType,
    pub stages: ShaderStages,
}

impl DescriptorBinding {
    pub fn uniform(binding: u32, stages: ShaderStages) -> Self {
        Self { binding, descriptor_type: DescriptorType::UniformBuffer, stages }
    }

    pub fn sampler(binding: u32, stages: ShaderStages) -> Self {
        Self { binding, descriptor_type: DescriptorType::CombinedImageSampler, stages }
    }
}

/// Descriptor set layout description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorSetLayoutDesc {
    pub bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutDesc {
    /// Number of bindings of the given kind
    pub fn count(&self, descriptor_type: DescriptorType) -> u32 {
        self.bindings.iter().filter(|b| b.descriptor_type == descriptor_type).count() as u32
    }
}

/// Descriptor set layout object
pub trait DescriptorSetLayout: Send + Sync {
    fn bindings(&self) -> &[DescriptorBinding];

    fn as_any(&self) -> &dyn Any;
}

/// Push constant range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stages: ShaderStages,
    pub offset: u32,
    pub size: u32,
}

/// Pipeline layout description
pub struct PipelineLayoutDesc {
    pub set_layouts: Vec<Arc<dyn DescriptorSetLayout>>,
    pub push_constant_ranges: Vec<PushConstantRange>,
}

/// Pipeline layout object
pub trait PipelineLayout: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Vertex attribute component layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
}

impl VertexFormat {
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::Float2 => 8,
            VertexFormat::Float3 => 12,
            VertexFormat::Float4 => 16,
        }
    }
}

/// One vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

/// Interleaved vertex layout bound at binding 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: u32,
    pub attributes: Vec<VertexAttribute>,
}

/// Face culling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Winding of front faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontFace {
    Clockwise,
    CounterClockwise,
}

/// Depth comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Less,
    LessOrEqual,
    Always,
}

/// Value of a specialization constant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecializationValue {
    I32(i32),
    F32(f32),
}

impl SpecializationValue {
    /// Native-endian bytes as consumed by the shader compiler
    pub fn to_bytes(&self) -> [u8; 4] {
        match self {
            SpecializationValue::I32(v) => v.to_ne_bytes(),
            SpecializationValue::F32(v) => v.to_ne_bytes(),
        }
    }
}

/// `constant_id` / value pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecializationConstant {
    pub id: u32,
    pub value: SpecializationValue,
}

/// Per color attachment blend state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendAttachment {
    pub blend_enable: bool,
}

impl ColorBlendAttachment {
    /// Write RGBA, no blending
    pub const OPAQUE: ColorBlendAttachment = ColorBlendAttachment { blend_enable: false };
}

/// Graphics pipeline description
///
/// Viewport and scissor are always dynamic. `dynamic_depth_bias` enables
/// depth bias in the rasterizer and makes its factors dynamic.
pub struct PipelineDesc {
    pub vertex_shader: PathBuf,
    pub fragment_shader: PathBuf,
    pub vertex_layout: VertexLayout,
    pub layout: Arc<dyn PipelineLayout>,
    pub render_pass: Arc<dyn RenderPass>,
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareOp,
    pub color_blend_attachments: Vec<ColorBlendAttachment>,
    pub dynamic_depth_bias: bool,
    /// Applied to the vertex and fragment stages
    pub specialization: Vec<SpecializationConstant>,
}

/// Graphics pipeline object
pub trait Pipeline: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}
