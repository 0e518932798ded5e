/// Descriptor set layouts, pipeline layouts and the shared descriptor sets
///
/// The per-mesh offscreen sets belong to the scene; this module owns the
/// three sets the passes bind themselves (composition, shadowmap and
/// skysphere), allocated from one pool in `RenderResources`.

use std::sync::Arc;
use crate::device::{
    DescriptorBinding, DescriptorPoolDesc, DescriptorSetLayoutDesc, DescriptorType, DescriptorWrite,
    GraphicsDevice, ImageLayout, PipelineLayoutDesc, PushConstantRange, Sampler, ShaderStages,
    Texture,
};
use crate::error::Result;
use crate::registry::{LayoutId, RenderResources};
use crate::render_graph::{GBuffer, ShadowPasses};
use crate::uniforms::UniformBuffers;
use crate::engine_debug;

/// First composition binding holding a shadow map; light `i` uses `base + i`
pub const SHADOW_MAP_BINDING_BASE: u32 = 5;

/// Size of the light-index push constant of the shadow pass
pub const LIGHT_INDEX_PUSH_CONSTANT_SIZE: u32 = 4;

/// Sets allocated from the shared pool
pub const SHARED_SETS: [LayoutId; 3] = [LayoutId::Composition, LayoutId::Shadowmap, LayoutId::Skysphere];

/// Bindings of each layout
///
/// - composition: b0 screen matrices, b1-3 G-buffer, b4 lights, b5.. shadow maps
/// - shadowmap: b0 light-space matrices
/// - offscreen: b0 scene matrices, b1 diffuse, b2 roughness, b3 bump, b4 metallic
/// - skysphere: b0 scene matrices, b1 sky texture
pub fn descriptor_set_layout_desc(id: LayoutId, light_count: usize) -> DescriptorSetLayoutDesc {
    let bindings = match id {
        LayoutId::Composition => {
            let mut bindings = vec![
                DescriptorBinding::uniform(0, ShaderStages::VERTEX),
                DescriptorBinding::sampler(1, ShaderStages::FRAGMENT),
                DescriptorBinding::sampler(2, ShaderStages::FRAGMENT),
                DescriptorBinding::sampler(3, ShaderStages::FRAGMENT),
                DescriptorBinding::uniform(4, ShaderStages::FRAGMENT),
            ];
            bindings.extend(
                (0..light_count as u32).map(|i| DescriptorBinding::sampler(SHADOW_MAP_BINDING_BASE + i, ShaderStages::FRAGMENT)),
            );
            bindings
        }
        LayoutId::Shadowmap => vec![DescriptorBinding::uniform(0, ShaderStages::VERTEX)],
        LayoutId::Offscreen => {
            let mut bindings = vec![DescriptorBinding::uniform(0, ShaderStages::VERTEX)];
            bindings.extend((1..=4).map(|b| DescriptorBinding::sampler(b, ShaderStages::FRAGMENT)));
            bindings
        }
        LayoutId::Skysphere => vec![
            DescriptorBinding::uniform(0, ShaderStages::VERTEX),
            DescriptorBinding::sampler(1, ShaderStages::FRAGMENT),
        ],
    };
    DescriptorSetLayoutDesc { bindings }
}

/// Push constant ranges of each pipeline layout
pub fn push_constant_ranges(id: LayoutId) -> Vec<PushConstantRange> {
    match id {
        LayoutId::Shadowmap => vec![PushConstantRange {
            stages: ShaderStages::VERTEX,
            offset: 0,
            size: LIGHT_INDEX_PUSH_CONSTANT_SIZE,
        }],
        LayoutId::Composition | LayoutId::Offscreen | LayoutId::Skysphere => Vec::new(),
    }
}

/// Create every descriptor set layout and its single-set pipeline layout
pub fn create_layouts(device: &dyn GraphicsDevice, resources: &mut RenderResources, light_count: usize) -> Result<()> {
    for id in LayoutId::ALL {
        let set_layout = resources
            .descriptor_set_layouts
            .add(id, || device.create_descriptor_set_layout(&descriptor_set_layout_desc(id, light_count)))?;
        resources.pipeline_layouts.add(id, || {
            device.create_pipeline_layout(&PipelineLayoutDesc {
                set_layouts: vec![set_layout],
                push_constant_ranges: push_constant_ranges(id),
            })
        })?;
    }

    engine_debug!("umbra::layouts", "Created {} descriptor and pipeline layouts", LayoutId::ALL.len());
    Ok(())
}

/// Capacity of the shared pool
pub fn shared_pool_desc(light_count: usize) -> DescriptorPoolDesc {
    let (uniform_buffers, combined_image_samplers) = SHARED_SETS
        .iter()
        .map(|&id| {
            let desc = descriptor_set_layout_desc(id, light_count);
            (
                desc.count(DescriptorType::UniformBuffer),
                desc.count(DescriptorType::CombinedImageSampler),
            )
        })
        .fold((0, 0), |(u, s), (du, ds)| (u + du, s + ds));

    DescriptorPoolDesc {
        uniform_buffers,
        combined_image_samplers,
        max_sets: SHARED_SETS.len() as u32,
    }
}

/// Create the shared pool and allocate the composition, shadowmap and skysphere sets
///
/// Layouts must already exist.
pub fn create_descriptor_sets(device: &dyn GraphicsDevice, resources: &mut RenderResources, light_count: usize) -> Result<()> {
    let pool = device.create_descriptor_pool(&shared_pool_desc(light_count))?;
    resources.descriptor_sets.set_pool(pool);

    for id in SHARED_SETS {
        let layout = Arc::clone(resources.descriptor_set_layouts.require(&id)?);
        resources.descriptor_sets.add(device, id, &layout)?;
    }
    Ok(())
}

/// Point the composition set at the G-buffer, the shadow maps and the uniforms
///
/// Called again whenever the G-buffer is recreated.
pub fn write_composition_set(
    device: &dyn GraphicsDevice,
    resources: &RenderResources,
    gbuffer: &GBuffer,
    shadows: &ShadowPasses,
    uniforms: &UniformBuffers,
) -> Result<()> {
    let set = resources.descriptor_sets.require(LayoutId::Composition)?;

    let mut writes = vec![DescriptorWrite::uniform(0, &uniforms.screen)];
    for (binding, target) in (1..).zip(gbuffer.color_attachments()) {
        writes.push(DescriptorWrite::image(binding, &target.texture, gbuffer.sampler(), ImageLayout::ShaderReadOnly));
    }
    writes.push(DescriptorWrite::uniform(4, &uniforms.scene_lights));
    for (binding, pass) in (SHADOW_MAP_BINDING_BASE..).zip(shadows.passes()) {
        writes.push(DescriptorWrite::image(binding, &pass.depth.texture, &pass.sampler, ImageLayout::DepthStencilReadOnly));
    }

    device.update_descriptor_set(set, &writes)
}

pub fn write_shadowmap_set(device: &dyn GraphicsDevice, resources: &RenderResources, uniforms: &UniformBuffers) -> Result<()> {
    let set = resources.descriptor_sets.require(LayoutId::Shadowmap)?;
    device.update_descriptor_set(set, &[DescriptorWrite::uniform(0, &uniforms.shadow)])
}

pub fn write_skysphere_set(
    device: &dyn GraphicsDevice,
    resources: &RenderResources,
    uniforms: &UniformBuffers,
    texture: &Arc<dyn Texture>,
    sampler: &Arc<dyn Sampler>,
) -> Result<()> {
    let set = resources.descriptor_sets.require(LayoutId::Skysphere)?;
    device.update_descriptor_set(set, &[
        DescriptorWrite::uniform(0, &uniforms.scene_matrices),
        DescriptorWrite::image(1, texture, sampler, ImageLayout::ShaderReadOnly),
    ])
}

#[cfg(test)]
#[path = "layouts_tests.rs"]
mod tests;
