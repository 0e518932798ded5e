/// Graphics pipelines of the six fixed pipeline identities
///
/// Every pipeline starts from the same state: triangle list, back-face
/// culling with clockwise front faces, depth test and write with
/// `LessOrEqual`, one opaque color attachment and dynamic viewport and
/// scissor. Each identity then overrides what it needs.

use std::sync::Arc;
use crate::config::RendererConfig;
use crate::device::{
    ColorBlendAttachment, CompareOp, CullMode, FrontFace, GraphicsDevice, PipelineDesc,
    PipelineLayout, RenderPass, SpecializationConstant, SpecializationValue,
};
use crate::error::Result;
use crate::registry::{PipelineId, RenderResources};
use crate::scene::SceneVertex;
use crate::{engine_debug, engine_info};

/// Render passes the pipelines are built against
pub struct PassTargets<'a> {
    /// Composition and debug display
    pub swapchain: &'a Arc<dyn RenderPass>,
    /// Sky and scene geometry
    pub gbuffer: &'a Arc<dyn RenderPass>,
    pub shadow: &'a Arc<dyn RenderPass>,
}

/// Composition constants: 0 = SSAO enabled (i32), 1 = ambient factor (f32)
pub fn composition_specialization(enable_ssao: bool, ambient_factor: f32) -> Vec<SpecializationConstant> {
    vec![
        SpecializationConstant { id: 0, value: SpecializationValue::I32(enable_ssao as i32) },
        SpecializationConstant { id: 1, value: SpecializationValue::F32(ambient_factor) },
    ]
}

/// G-buffer constants: 0 = znear, 1 = zfar, 2 = alpha discard (i32)
pub fn mrt_specialization(znear: f32, zfar: f32, discard: bool) -> Vec<SpecializationConstant> {
    vec![
        SpecializationConstant { id: 0, value: SpecializationValue::F32(znear) },
        SpecializationConstant { id: 1, value: SpecializationValue::F32(zfar) },
        SpecializationConstant { id: 2, value: SpecializationValue::I32(discard as i32) },
    ]
}

/// Full description of pipeline `id`
pub fn pipeline_desc(
    id: PipelineId,
    config: &RendererConfig,
    layout: &Arc<dyn PipelineLayout>,
    passes: &PassTargets,
) -> PipelineDesc {
    let (stem, render_pass) = match id {
        PipelineId::Composition => ("composition", passes.swapchain),
        PipelineId::DebugDisplay => ("debug", passes.swapchain),
        PipelineId::SceneSolid | PipelineId::SceneBlend => ("mrt", passes.gbuffer),
        PipelineId::Skysphere => ("skysphere", passes.gbuffer),
        PipelineId::Shadowmap => ("offscreen", passes.shadow),
    };

    let mut desc = PipelineDesc {
        vertex_shader: config.shader_path(&format!("{}.vert", stem)),
        fragment_shader: config.shader_path(&format!("{}.frag", stem)),
        vertex_layout: SceneVertex::layout(),
        layout: Arc::clone(layout),
        render_pass: Arc::clone(render_pass),
        cull_mode: CullMode::Back,
        front_face: FrontFace::Clockwise,
        depth_test: true,
        depth_write: true,
        depth_compare: CompareOp::LessOrEqual,
        color_blend_attachments: vec![ColorBlendAttachment::OPAQUE],
        dynamic_depth_bias: false,
        specialization: Vec::new(),
    };

    let (znear, zfar) = (config.camera.znear, config.camera.zfar);
    match id {
        PipelineId::Composition => {
            desc.specialization = composition_specialization(config.enable_ssao, config.ambient_factor);
        }
        PipelineId::DebugDisplay => {}
        PipelineId::SceneSolid => {
            desc.color_blend_attachments = vec![ColorBlendAttachment::OPAQUE; 3];
            desc.specialization = mrt_specialization(znear, zfar, false);
        }
        PipelineId::SceneBlend => {
            desc.color_blend_attachments = vec![ColorBlendAttachment::OPAQUE; 3];
            desc.depth_write = false;
            desc.cull_mode = CullMode::None;
            desc.specialization = mrt_specialization(znear, zfar, true);
        }
        PipelineId::Skysphere => {
            desc.color_blend_attachments = vec![ColorBlendAttachment::OPAQUE; 3];
            desc.depth_write = false;
            desc.cull_mode = CullMode::None;
        }
        PipelineId::Shadowmap => {
            desc.color_blend_attachments = Vec::new();
            desc.dynamic_depth_bias = true;
        }
    }

    desc
}

fn create_pipeline(
    device: &dyn GraphicsDevice,
    resources: &mut RenderResources,
    id: PipelineId,
    config: &RendererConfig,
    passes: &PassTargets,
) -> Result<()> {
    let layout = Arc::clone(resources.pipeline_layouts.require(&id.layout())?);
    let desc = pipeline_desc(id, config, &layout, passes);
    resources.pipelines.add(id, || device.create_pipeline(&desc))?;
    engine_debug!("umbra::pipelines", "Created pipeline '{}'", id);
    Ok(())
}

/// Create all six pipelines
///
/// Pipeline layouts must already exist.
pub fn create_pipelines(
    device: &dyn GraphicsDevice,
    resources: &mut RenderResources,
    config: &RendererConfig,
    passes: &PassTargets,
) -> Result<()> {
    for id in PipelineId::ALL {
        create_pipeline(device, resources, id, config, passes)?;
    }
    engine_info!("umbra::pipelines", "Created {} pipelines", PipelineId::ALL.len());
    Ok(())
}

/// Rebuild the composition pipeline with the current SSAO flag
///
/// The caller waits for the device to be idle and re-records the
/// composition command lists afterwards.
pub fn rebuild_composition_pipeline(
    device: &dyn GraphicsDevice,
    resources: &mut RenderResources,
    config: &RendererConfig,
    passes: &PassTargets,
) -> Result<()> {
    resources.pipelines.remove(&PipelineId::Composition);
    create_pipeline(device, resources, PipelineId::Composition, config, passes)
}

#[cfg(test)]
#[path = "pipelines_tests.rs"]
mod tests;
