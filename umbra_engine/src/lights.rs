/// Shadow-casting lights
///
/// `Light` matches the std140 layout read by the composition shader:
/// four vec4 followed by the light-space matrix.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

/// Light kinds encoded in `params.x`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
}

impl LightKind {
    fn encode(self) -> f32 {
        match self {
            LightKind::Point => 0.0,
            LightKind::Spot => 1.0,
        }
    }
}

/// Field of view of every spot light frustum, in degrees
pub const SPOT_FOV_DEGREES: f32 = 45.0;
/// Near and far planes of the spot light frustum
pub const SPOT_ZNEAR: f32 = 1.0;
pub const SPOT_ZFAR: f32 = 200.0;
/// Falloff range passed to the shader for spot lights
pub const SPOT_RANGE: f32 = 1600.0;

/// GPU light record (128 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub position: Vec4,
    pub dir: Vec4,
    pub color: Vec4,
    /// x: kind (0 point, 1 spot), y: radius or range
    pub params: Vec4,
    /// Projection * view from the light
    pub light_space: Mat4,
}

impl Light {
    /// Spot light looking along `dir`, with its shadow frustum
    pub fn spot(position: Vec3, dir: Vec3, color: Vec3) -> Self {
        let projection = Mat4::perspective_rh(SPOT_FOV_DEGREES.to_radians(), 1.0, SPOT_ZNEAR, SPOT_ZFAR);
        let view = Mat4::look_at_rh(position, position + dir, Vec3::Y);
        Self {
            position: position.extend(1.0),
            dir: dir.extend(1.0),
            color: color.extend(1.0),
            params: Vec4::new(LightKind::Spot.encode(), SPOT_RANGE, 0.0, 0.0),
            light_space: projection * view,
        }
    }

    /// Point light of the given radius
    ///
    /// Point lights cast no shadow; `light_space` stays identity.
    pub fn point(position: Vec3, color: Vec3, radius: f32) -> Self {
        Self {
            position: position.extend(1.0),
            dir: position.extend(1.0),
            color: color.extend(1.0),
            params: Vec4::new(LightKind::Point.encode(), radius, 0.0, 0.0),
            light_space: Mat4::IDENTITY,
        }
    }

    pub fn kind(&self) -> LightKind {
        if self.params.x == LightKind::Spot.encode() { LightKind::Spot } else { LightKind::Point }
    }
}

/// Default three-spot rig for the sponza atrium
///
/// Two lights share a position and point down the nave in opposite
/// directions; the third lights the side aisle. Rigs with more lights
/// repeat the pattern.
pub fn default_lights(count: usize) -> Vec<Light> {
    let center = Vec3::new(0.0, 0.0, -15.0);
    let nave = Vec3::new(0.0, -15.0, 0.0);
    let aisle = center + Vec3::new(30.0, -30.0, 15.0);

    let rig = [
        Light::spot(nave, Vec3::X, Vec3::ONE),
        Light::spot(nave, Vec3::NEG_X, Vec3::new(1.0, 1.0, 0.0)),
        Light::spot(aisle, Vec3::Z, Vec3::ONE),
    ];

    rig.iter().cycle().take(count).copied().collect()
}

/// Position of light 0 when it follows the camera
///
/// The camera stores the world translation, so the eye is its negation.
pub fn attached_light_position(camera_position: Vec3) -> Vec4 {
    camera_position.extend(0.0) * Vec4::new(-1.0, -1.0, -1.0, 1.0)
}

#[cfg(test)]
#[path = "lights_tests.rs"]
mod tests;
