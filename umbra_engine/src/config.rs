/// Renderer configuration
///
/// Plain data with sensible defaults for the sponza scene. The demo builds
/// one with `RendererConfig::default()` and overrides individual fields.

use std::path::{Path, PathBuf};
use glam::Vec3;
use crate::error::{Error, Result};

/// First-person camera defaults
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub znear: f32,
    pub zfar: f32,
    /// Start position
    pub position: Vec3,
    /// Start rotation (pitch, yaw, roll) in degrees
    pub rotation: Vec3,
    /// Units per second
    pub movement_speed: f32,
    /// Degrees per pixel of mouse drag
    pub rotation_speed: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            znear: 1.0,
            zfar: 512.0,
            position: Vec3::new(-125.0, 6.25, 0.0),
            rotation: Vec3::new(6.0, -90.0, 0.0),
            movement_speed: 40.0,
            rotation_speed: 0.25,
        }
    }
}

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Application name (window title, Vulkan application info)
    pub app_name: String,

    /// Initial window size
    pub width: u32,
    pub height: u32,

    /// Enable validation layers (only effective with the `vulkan-validation` backend feature)
    pub enable_validation: bool,

    /// Present with FIFO instead of MAILBOX/IMMEDIATE
    pub vsync: bool,

    /// Square shadow map resolution
    pub shadow_map_size: u32,

    /// Number of shadow-casting lights
    pub light_count: usize,

    /// Dynamic depth bias applied to every shadow pass
    pub depth_bias_constant: f32,
    pub depth_bias_slope: f32,

    /// Root directory for models and textures
    pub asset_dir: PathBuf,

    /// Directory holding compiled SPIR-V (`*.vert.spv`, `*.frag.spv`)
    pub shader_dir: PathBuf,

    /// Scene model, relative to `asset_dir`
    pub scene_file: PathBuf,

    /// Sky model and texture, relative to `asset_dir`
    pub skysphere_model: PathBuf,
    pub skysphere_texture: PathBuf,

    pub camera: CameraConfig,

    /// Ambient term of the composition shader
    pub ambient_factor: f32,

    /// Initial toggle states
    pub enable_ssao: bool,
    pub debug_display: bool,
    pub attach_light: bool,
    pub paused: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app_name: "Umbra Deferred Shadows".to_string(),
            width: 1920,
            height: 1080,
            enable_validation: cfg!(debug_assertions),
            vsync: true,
            shadow_map_size: 2048,
            light_count: 3,
            depth_bias_constant: 1.25,
            depth_bias_slope: 1.75,
            asset_dir: PathBuf::from("data"),
            shader_dir: PathBuf::from("data/shaders"),
            scene_file: PathBuf::from("models/sponza/sponza_pbr.obj"),
            skysphere_model: PathBuf::from("models/skysphere.obj"),
            skysphere_texture: PathBuf::from("textures/skysphere_night.png"),
            camera: CameraConfig::default(),
            ambient_factor: 0.15,
            enable_ssao: true,
            debug_display: false,
            attach_light: false,
            paused: false,
        }
    }
}

impl RendererConfig {
    /// Resolve a path relative to the asset directory
    pub fn asset_path(&self, relative: &Path) -> PathBuf {
        self.asset_dir.join(relative)
    }

    /// Resolve a compiled shader (`name` like "composition.vert")
    pub fn shader_path(&self, name: &str) -> PathBuf {
        self.shader_dir.join(format!("{}.spv", name))
    }

    /// Reject configurations the render graph cannot build
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "Invalid window size {}x{}", self.width, self.height
            )));
        }
        if self.shadow_map_size == 0 {
            return Err(Error::InitializationFailed("Shadow map size must be non-zero".to_string()));
        }
        if self.light_count == 0 {
            return Err(Error::InitializationFailed("At least one light is required".to_string()));
        }
        if self.camera.znear <= 0.0 || self.camera.zfar <= self.camera.znear {
            return Err(Error::InitializationFailed(format!(
                "Invalid depth range [{}, {}]", self.camera.znear, self.camera.zfar
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
