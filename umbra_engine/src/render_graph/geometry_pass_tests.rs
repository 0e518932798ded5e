//! Unit tests for geometry_pass.rs

use super::*;
use crate::device::mock_graphics_device::{id_of, mock_commands};
use crate::error::Error;
use crate::render_graph::test_fixture::{graph_fixture, opaque_and_blend_model, GraphFixture, HEIGHT, WIDTH};

fn record(fixture: &GraphFixture, scene: &Scene) -> GeometryPass {
    let mut pass = GeometryPass::new(&fixture.device).unwrap();
    pass.record(&fixture.gbuffer, &fixture.resources, scene, &fixture.sky).unwrap();
    pass
}

fn pipeline_id(fixture: &GraphFixture, id: PipelineId) -> u64 {
    id_of(fixture.resources.pipeline(id).unwrap().0.as_any())
}

// ============================================================================
// Tests: recording
// ============================================================================

#[test]
fn test_begins_gbuffer_pass_with_four_clears() {
    let mut fixture = graph_fixture(3);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let pass = record(&fixture, &scene);

    let commands = &mock_commands(pass.command_list()).commands;
    assert_eq!(commands[0], "begin");
    assert_eq!(commands[1], format!("begin_render_pass({}, {}, 4)",
        id_of(fixture.gbuffer.render_pass().as_any()), id_of(fixture.gbuffer.framebuffer().as_any())));
    assert_eq!(commands[2], format!("set_viewport(0, 0, {}, {})", WIDTH, HEIGHT));
    assert_eq!(commands[3], format!("set_scissor({}, {})", WIDTH, HEIGHT));
    assert_eq!(commands[commands.len() - 2], "end_render_pass");
    assert!(pass.state().is_recorded());
}

#[test]
fn test_sky_then_opaque_then_blend() {
    let mut fixture = graph_fixture(3);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let pass = record(&fixture, &scene);
    let commands = &mock_commands(pass.command_list()).commands;

    let position = |needle: String| commands.iter().position(|c| *c == needle).unwrap();
    let sky = position(format!("bind_pipeline({})", pipeline_id(&fixture, PipelineId::Skysphere)));
    let solid = position(format!("bind_pipeline({})", pipeline_id(&fixture, PipelineId::SceneSolid)));
    let blend = position(format!("bind_pipeline({})", pipeline_id(&fixture, PipelineId::SceneBlend)));
    assert!(sky < solid && solid < blend);

    let draws = mock_commands(pass.command_list()).draws();
    assert_eq!(draws, vec![
        &format!("draw_indexed({}, 1, 0, 0, 0)", fixture.sky.mesh.index_count),
        &"draw_indexed(6, 1, 0, 0, 0)".to_string(),
        &"draw_indexed(3, 1, 6, 0, 0)".to_string(),
        &"draw_indexed(9, 1, 9, 0, 0)".to_string(),
    ]);
}

#[test]
fn test_each_mesh_binds_own_set_before_draw() {
    let mut fixture = graph_fixture(3);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let pass = record(&fixture, &scene);
    let commands = &mock_commands(pass.command_list()).commands;

    for mesh in &scene.meshes {
        let bind = format!("bind_descriptor_set(0, {})", id_of(mesh.descriptor_set.as_any()));
        let draw = format!("draw_indexed({}, 1, {}, 0, 0)", mesh.index_count, mesh.index_base);
        let bind_at = commands.iter().position(|c| *c == bind).unwrap();
        assert_eq!(commands[bind_at + 1], draw);
    }
}

#[test]
fn test_scene_buffers_bound_once() {
    let mut fixture = graph_fixture(3);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let pass = record(&fixture, &scene);
    let commands = &mock_commands(pass.command_list()).commands;

    let (vertex_buffer, _) = scene.buffers().unwrap();
    let binds = commands
        .iter()
        .filter(|c| **c == format!("bind_vertex_buffer({})", id_of(vertex_buffer.as_any())))
        .count();
    assert_eq!(binds, 1);
}

#[test]
fn test_empty_scene_draws_only_sky() {
    let fixture = graph_fixture(3);
    let pass = record(&fixture, &Scene::empty());
    assert_eq!(mock_commands(pass.command_list()).draws().len(), 1);
}

#[test]
fn test_re_record_replaces_commands() {
    let mut fixture = graph_fixture(3);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let mut pass = record(&fixture, &scene);
    let first = mock_commands(pass.command_list()).commands.clone();

    pass.invalidate();
    assert!(!pass.state().is_recorded());
    pass.record(&fixture.gbuffer, &fixture.resources, &scene, &fixture.sky).unwrap();
    assert_eq!(mock_commands(pass.command_list()).commands, first);
}

#[test]
fn test_missing_pipeline_is_an_error() {
    let mut fixture = graph_fixture(3);
    fixture.resources.pipelines.remove(&PipelineId::SceneBlend);
    let scene = fixture.load_scene(opaque_and_blend_model());
    let mut pass = GeometryPass::new(&fixture.device).unwrap();
    let result = pass.record(&fixture.gbuffer, &fixture.resources, &scene, &fixture.sky);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}
