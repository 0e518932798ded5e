/// First-person camera
///
/// Rotation is stored as (pitch, yaw, roll) in degrees. The view matrix is
/// `rotation * translation`, so `position` is the translation applied to
/// the world; the eye sits at `-position`.

use glam::{Mat4, Vec3};
use crate::config::CameraConfig;

/// Movement keys held during a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraMovement {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl CameraMovement {
    pub fn is_moving(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }
}

/// First-person camera producing the perspective and view matrices
#[derive(Debug, Clone)]
pub struct Camera {
    fov_degrees: f32,
    aspect: f32,
    znear: f32,
    zfar: f32,
    position: Vec3,
    rotation: Vec3,
    movement_speed: f32,
    rotation_speed: f32,
    perspective: Mat4,
    view: Mat4,
}

impl Camera {
    /// Create a camera from configuration and the initial aspect ratio
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self {
            fov_degrees: config.fov_degrees,
            aspect,
            znear: config.znear,
            zfar: config.zfar,
            position: config.position,
            rotation: config.rotation,
            movement_speed: config.movement_speed,
            rotation_speed: config.rotation_speed,
            perspective: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
        };
        camera.update_perspective();
        camera.update_view();
        camera
    }

    // ===== GETTERS =====

    pub fn perspective(&self) -> &Mat4 {
        &self.perspective
    }

    pub fn view(&self) -> &Mat4 {
        &self.view
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn znear(&self) -> f32 {
        self.znear
    }

    pub fn zfar(&self) -> f32 {
        self.zfar
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Unit facing vector derived from pitch and yaw
    pub fn front(&self) -> Vec3 {
        let pitch = self.rotation.x.to_radians();
        let yaw = self.rotation.y.to_radians();
        Vec3::new(-pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos()).normalize()
    }

    // ===== MUTATION =====

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
        self.update_perspective();
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_view();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.update_view();
    }

    /// Add `delta` degrees to (pitch, yaw, roll)
    pub fn rotate(&mut self, delta: Vec3) {
        self.rotation += delta;
        self.update_view();
    }

    /// Rotate from a mouse drag of (`dx`, `dy`) pixels
    pub fn rotate_by_mouse(&mut self, dx: f32, dy: f32) {
        self.rotate(Vec3::new(dy * self.rotation_speed, -dx * self.rotation_speed, 0.0));
    }

    /// Move along the facing vectors
    ///
    /// Returns true when the view changed.
    pub fn update(&mut self, delta_seconds: f32, movement: CameraMovement) -> bool {
        if !movement.is_moving() {
            return false;
        }

        let front = self.front();
        let side = front.cross(Vec3::Y).normalize();
        let step = delta_seconds * self.movement_speed;

        if movement.forward {
            self.position += front * step;
        }
        if movement.backward {
            self.position -= front * step;
        }
        if movement.left {
            self.position -= side * step;
        }
        if movement.right {
            self.position += side * step;
        }

        self.update_view();
        true
    }

    fn update_perspective(&mut self) {
        self.perspective = Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.znear, self.zfar);
    }

    fn update_view(&mut self) {
        let rotation = Mat4::from_rotation_x(self.rotation.x.to_radians())
            * Mat4::from_rotation_y(self.rotation.y.to_radians())
            * Mat4::from_rotation_z(self.rotation.z.to_radians());
        self.view = rotation * Mat4::from_translation(self.position);
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
