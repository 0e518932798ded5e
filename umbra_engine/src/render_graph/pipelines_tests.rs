//! Unit tests for pipelines.rs

use super::*;
use crate::device::mock_graphics_device::{id_of, MockGraphicsDevice, MockPipeline};
use crate::device::PipelineLayoutDesc;
use crate::render_graph::test_fixture::graph_fixture;
use crate::render_graph::{gbuffer_render_pass_desc, shadow_render_pass_desc, swapchain_render_pass_desc};
use crate::device::TextureFormat;

struct Passes {
    swapchain: Arc<dyn RenderPass>,
    gbuffer: Arc<dyn RenderPass>,
    shadow: Arc<dyn RenderPass>,
    layout: Arc<dyn PipelineLayout>,
}

fn passes(device: &MockGraphicsDevice) -> Passes {
    Passes {
        swapchain: device.create_render_pass(&swapchain_render_pass_desc(TextureFormat::B8G8R8A8_UNORM, TextureFormat::D32_SFLOAT)).unwrap(),
        gbuffer: device.create_render_pass(&gbuffer_render_pass_desc(TextureFormat::D32_SFLOAT)).unwrap(),
        shadow: device.create_render_pass(&shadow_render_pass_desc()).unwrap(),
        layout: device.create_pipeline_layout(&PipelineLayoutDesc { set_layouts: Vec::new(), push_constant_ranges: Vec::new() }).unwrap(),
    }
}

fn desc(id: PipelineId, config: &RendererConfig, passes: &Passes) -> PipelineDesc {
    pipeline_desc(id, config, &passes.layout, &PassTargets {
        swapchain: &passes.swapchain,
        gbuffer: &passes.gbuffer,
        shadow: &passes.shadow,
    })
}

fn mock_pipeline(resources: &RenderResources, id: PipelineId) -> &MockPipeline {
    resources.pipelines.require(&id).unwrap().as_any().downcast_ref::<MockPipeline>().unwrap()
}

// ============================================================================
// Tests: pipeline_desc
// ============================================================================

#[test]
fn test_shared_state() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let config = RendererConfig::default();

    for id in PipelineId::ALL {
        let desc = desc(id, &config, &passes);
        assert_eq!(desc.front_face, FrontFace::Clockwise, "{}", id);
        assert!(desc.depth_test, "{}", id);
        assert_eq!(desc.depth_compare, CompareOp::LessOrEqual, "{}", id);
        assert_eq!(desc.vertex_layout, SceneVertex::layout(), "{}", id);
    }
}

#[test]
fn test_shader_paths() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let config = RendererConfig::default();

    let shadow = desc(PipelineId::Shadowmap, &config, &passes);
    assert_eq!(shadow.vertex_shader, config.shader_dir.join("offscreen.vert.spv"));
    assert_eq!(shadow.fragment_shader, config.shader_dir.join("offscreen.frag.spv"));

    let debug = desc(PipelineId::DebugDisplay, &config, &passes);
    assert_eq!(debug.fragment_shader, config.shader_dir.join("debug.frag.spv"));
}

#[test]
fn test_render_pass_per_pipeline() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let config = RendererConfig::default();
    let pass_of = |id| id_of(desc(id, &config, &passes).render_pass.as_any());

    assert_eq!(pass_of(PipelineId::Composition), id_of(passes.swapchain.as_any()));
    assert_eq!(pass_of(PipelineId::DebugDisplay), id_of(passes.swapchain.as_any()));
    assert_eq!(pass_of(PipelineId::SceneSolid), id_of(passes.gbuffer.as_any()));
    assert_eq!(pass_of(PipelineId::SceneBlend), id_of(passes.gbuffer.as_any()));
    assert_eq!(pass_of(PipelineId::Skysphere), id_of(passes.gbuffer.as_any()));
    assert_eq!(pass_of(PipelineId::Shadowmap), id_of(passes.shadow.as_any()));
}

#[test]
fn test_scene_variants() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let config = RendererConfig::default();

    let solid = desc(PipelineId::SceneSolid, &config, &passes);
    assert_eq!(solid.color_blend_attachments.len(), 3);
    assert!(solid.depth_write);
    assert_eq!(solid.cull_mode, CullMode::Back);
    assert_eq!(solid.specialization, mrt_specialization(config.camera.znear, config.camera.zfar, false));

    let blend = desc(PipelineId::SceneBlend, &config, &passes);
    assert!(!blend.depth_write);
    assert_eq!(blend.cull_mode, CullMode::None);
    assert_eq!(blend.specialization[2].value, SpecializationValue::I32(1));

    let sky = desc(PipelineId::Skysphere, &config, &passes);
    assert!(!sky.depth_write);
    assert_eq!(sky.cull_mode, CullMode::None);
    assert_eq!(sky.color_blend_attachments.len(), 3);
}

#[test]
fn test_shadowmap_variant() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let shadow = desc(PipelineId::Shadowmap, &RendererConfig::default(), &passes);
    assert!(shadow.color_blend_attachments.is_empty());
    assert!(shadow.dynamic_depth_bias);
    assert!(shadow.depth_write);
    assert_eq!(shadow.cull_mode, CullMode::Back);
}

#[test]
fn test_composition_specialization_follows_config() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let config = RendererConfig { enable_ssao: false, ambient_factor: 0.3, ..RendererConfig::default() };

    let composition = desc(PipelineId::Composition, &config, &passes);
    assert_eq!(composition.specialization, vec![
        SpecializationConstant { id: 0, value: SpecializationValue::I32(0) },
        SpecializationConstant { id: 1, value: SpecializationValue::F32(0.3) },
    ]);
    assert!(desc(PipelineId::DebugDisplay, &config, &passes).specialization.is_empty());
}

// ============================================================================
// Tests: create_pipelines / rebuild
// ============================================================================

#[test]
fn test_create_pipelines_registers_all() {
    let fixture = graph_fixture(3);
    assert_eq!(fixture.resources.pipelines.len(), PipelineId::ALL.len());
    assert_eq!(fixture.device.log.lock().unwrap().created_count("pipeline"), 6);

    let shadow = mock_pipeline(&fixture.resources, PipelineId::Shadowmap);
    assert_eq!(shadow.vertex_shader, "offscreen.vert.spv");
    assert_eq!(shadow.render_pass, id_of(fixture.shadows.render_pass().as_any()));
    assert_eq!(shadow.color_blend_count, 0);
}

#[test]
fn test_rebuild_composition_applies_ssao_flag() {
    let mut fixture = graph_fixture(3);
    let before = id_of(fixture.resources.pipelines.require(&PipelineId::Composition).unwrap().as_any());

    fixture.config.enable_ssao = !fixture.config.enable_ssao;
    let targets = PassTargets {
        swapchain: fixture.composition.render_pass(),
        gbuffer: fixture.gbuffer.render_pass(),
        shadow: fixture.shadows.render_pass(),
    };
    rebuild_composition_pipeline(&fixture.device, &mut fixture.resources, &fixture.config, &targets).unwrap();

    let rebuilt = mock_pipeline(&fixture.resources, PipelineId::Composition);
    assert_ne!(rebuilt.id, before);
    assert_eq!(rebuilt.specialization[0].value, SpecializationValue::I32(fixture.config.enable_ssao as i32));
    assert_eq!(fixture.resources.pipelines.len(), PipelineId::ALL.len());
}

#[test]
fn test_create_pipelines_needs_layouts() {
    let device = MockGraphicsDevice::new();
    let passes = passes(&device);
    let mut resources = RenderResources::new(Box::new(crate::render_graph::test_fixture::PixelLoader));
    let result = create_pipelines(&device, &mut resources, &RendererConfig::default(), &PassTargets {
        swapchain: &passes.swapchain,
        gbuffer: &passes.gbuffer,
        shadow: &passes.shadow,
    });
    assert!(result.is_err());
    assert!(resources.pipelines.is_empty());
}
