use glam::{Mat4, Vec3};
use super::*;

const EPSILON: f32 = 1e-4;

fn default_camera() -> Camera {
    Camera::new(&CameraConfig::default(), 16.0 / 9.0)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_camera_new_uses_config() {
    let camera = default_camera();
    assert_eq!(camera.position(), Vec3::new(-125.0, 6.25, 0.0));
    assert_eq!(camera.rotation(), Vec3::new(6.0, -90.0, 0.0));
    assert_eq!(camera.znear(), 1.0);
    assert_eq!(camera.zfar(), 512.0);
}

#[test]
fn test_perspective_matches_glam() {
    let camera = default_camera();
    let expected = Mat4::perspective_rh(60f32.to_radians(), 16.0 / 9.0, 1.0, 512.0);
    assert_eq!(*camera.perspective(), expected);
}

#[test]
fn test_set_aspect_rebuilds_perspective() {
    let mut camera = default_camera();
    let before = *camera.perspective();
    camera.set_aspect(1.0);
    assert_ne!(*camera.perspective(), before);
    assert_eq!(camera.aspect(), 1.0);
}

// ============================================================================
// View matrix
// ============================================================================

#[test]
fn test_view_maps_negated_position_to_origin() {
    let camera = default_camera();
    let eye = (-camera.position()).extend(1.0);
    let in_view = *camera.view() * eye;
    assert!(in_view.truncate().length() < EPSILON);
}

#[test]
fn test_identity_rotation_view_is_translation() {
    let config = CameraConfig { rotation: Vec3::ZERO, ..CameraConfig::default() };
    let camera = Camera::new(&config, 1.0);
    assert_eq!(*camera.view(), Mat4::from_translation(config.position));
}

#[test]
fn test_rotate_accumulates_degrees() {
    let mut camera = default_camera();
    camera.rotate(Vec3::new(1.0, 10.0, 0.0));
    assert_eq!(camera.rotation(), Vec3::new(7.0, -80.0, 0.0));
}

#[test]
fn test_rotate_by_mouse_scales_by_speed() {
    let mut camera = default_camera();
    camera.set_rotation(Vec3::ZERO);
    camera.rotate_by_mouse(4.0, 2.0);
    let speed = CameraConfig::default().rotation_speed;
    assert_eq!(camera.rotation(), Vec3::new(2.0 * speed, -4.0 * speed, 0.0));
}

// ============================================================================
// Movement
// ============================================================================

#[test]
fn test_update_without_movement_is_noop() {
    let mut camera = default_camera();
    let view = *camera.view();
    assert!(!camera.update(1.0, CameraMovement::default()));
    assert_eq!(*camera.view(), view);
}

#[test]
fn test_update_forward_moves_along_front() {
    let mut camera = default_camera();
    camera.set_rotation(Vec3::ZERO);
    camera.set_position(Vec3::ZERO);

    let movement = CameraMovement { forward: true, ..Default::default() };
    assert!(camera.update(0.5, movement));

    // Zero pitch and yaw face +Z; speed 40 for half a second
    assert!((camera.position() - Vec3::new(0.0, 0.0, 20.0)).length() < EPSILON);
}

#[test]
fn test_forward_then_backward_returns() {
    let mut camera = default_camera();
    let start = camera.position();
    camera.update(0.25, CameraMovement { forward: true, ..Default::default() });
    camera.update(0.25, CameraMovement { backward: true, ..Default::default() });
    assert!((camera.position() - start).length() < EPSILON);
}

#[test]
fn test_strafe_is_perpendicular_to_front() {
    let mut camera = default_camera();
    let start = camera.position();
    let front = camera.front();
    camera.update(1.0, CameraMovement { right: true, ..Default::default() });
    let offset = camera.position() - start;
    assert!(offset.dot(front).abs() < EPSILON);
    assert!((offset.length() - 40.0).abs() < EPSILON);
}

#[test]
fn test_front_is_unit_length() {
    let camera = default_camera();
    assert!((camera.front().length() - 1.0).abs() < EPSILON);
}
