//! Unit tests for lights.rs

use super::*;

// ============================================================================
// Tests: Light records
// ============================================================================

#[test]
fn test_light_is_128_bytes() {
    assert_eq!(std::mem::size_of::<Light>(), 128);
}

#[test]
fn test_spot_light_fields() {
    let light = Light::spot(Vec3::new(1.0, 2.0, 3.0), Vec3::X, Vec3::new(1.0, 0.5, 0.0));
    assert_eq!(light.position, Vec4::new(1.0, 2.0, 3.0, 1.0));
    assert_eq!(light.dir, Vec4::new(1.0, 0.0, 0.0, 1.0));
    assert_eq!(light.color, Vec4::new(1.0, 0.5, 0.0, 1.0));
    assert_eq!(light.params.x, 1.0);
    assert_eq!(light.params.y, SPOT_RANGE);
    assert_eq!(light.kind(), LightKind::Spot);
}

#[test]
fn test_spot_light_space_matches_perspective_look_at() {
    let position = Vec3::new(0.0, -15.0, 0.0);
    let light = Light::spot(position, Vec3::NEG_X, Vec3::ONE);
    let expected = Mat4::perspective_rh(45f32.to_radians(), 1.0, 1.0, 200.0)
        * Mat4::look_at_rh(position, position + Vec3::NEG_X, Vec3::Y);
    assert_eq!(light.light_space, expected);
}

#[test]
fn test_spot_light_projects_target_inside_clip_space() {
    let position = Vec3::new(0.0, -15.0, 0.0);
    let light = Light::spot(position, Vec3::X, Vec3::ONE);
    let clip = light.light_space * (position + Vec3::X * 50.0).extend(1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
    assert!(ndc.z > 0.0 && ndc.z < 1.0);
}

#[test]
fn test_point_light_fields() {
    let light = Light::point(Vec3::new(4.0, 5.0, 6.0), Vec3::ONE, 25.0);
    assert_eq!(light.params.x, 0.0);
    assert_eq!(light.params.y, 25.0);
    assert_eq!(light.dir, light.position);
    assert_eq!(light.kind(), LightKind::Point);
}

// ============================================================================
// Tests: Rig
// ============================================================================

#[test]
fn test_default_rig_three_lights() {
    let lights = default_lights(3);
    assert_eq!(lights.len(), 3);
    assert_eq!(lights[0].position, Vec4::new(0.0, -15.0, 0.0, 1.0));
    assert_eq!(lights[0].dir.truncate(), Vec3::X);
    assert_eq!(lights[1].position, lights[0].position);
    assert_eq!(lights[1].dir.truncate(), Vec3::NEG_X);
    assert_eq!(lights[1].color, Vec4::new(1.0, 1.0, 0.0, 1.0));
    assert_eq!(lights[2].position, Vec4::new(30.0, -30.0, 0.0, 1.0));
    assert_eq!(lights[2].dir.truncate(), Vec3::Z);
    assert!(lights.iter().all(|l| l.kind() == LightKind::Spot));
}

#[test]
fn test_default_rig_any_count() {
    assert_eq!(default_lights(1).len(), 1);
    let five = default_lights(5);
    assert_eq!(five.len(), 5);
    assert_eq!(five[3], five[0]);
    assert_eq!(five[4], five[1]);
}

#[test]
fn test_attached_light_position_negates_xyz() {
    let position = attached_light_position(Vec3::new(-125.0, 6.25, 2.0));
    assert_eq!(position, Vec4::new(125.0, -6.25, -2.0, 0.0));
}
