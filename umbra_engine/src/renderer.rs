/// Deferred renderer - owns the device objects of the whole frame
///
/// `DeferredRenderer::prepare` builds every resource once, records the
/// command lists and loads the scene. Afterwards each frame only rewrites
/// the light and shadow uniforms and replays the recorded passes through
/// the `FrameScheduler`. Toggles and resizes wait for the device to be idle
/// and re-record what they invalidated.

use std::sync::Arc;
use crate::camera::{Camera, CameraMovement};
use crate::config::RendererConfig;
use crate::device::{GraphicsDevice, SamplerDesc, Swapchain};
use crate::error::{Error, Result};
use crate::lights::{attached_light_position, default_lights};
use crate::registry::{LayoutId, RenderResources, TextureLoader};
use crate::render_graph::*;
use crate::scene::{create_dummy_textures, MeshBuffers, ModelImporter, Scene, SceneConsolidator, MATERIAL_TEXTURE_FORMAT};
use crate::scheduler::{FramePasses, FrameScheduler};
use crate::uniforms::{MatrixUniforms, SceneLights, ShadowMatrices, UniformBuffers};
use crate::{engine_debug, engine_info, engine_warn};

/// Registry name of the sky texture
const SKYSPHERE_TEXTURE: &str = "skysphere";

/// Horizontal text alignment of an overlay label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// Caption drawn over one debug quadrant
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    pub text: &'static str,
    pub x: f32,
    pub y: f32,
    pub align: TextAlign,
}

/// Captions of the four debug quadrants for a `width` x `height` surface
pub fn debug_overlay_labels(width: u32, height: u32) -> Vec<OverlayLabel> {
    let (w, h) = (width as f32, height as f32);
    [
        ("World Position", w * 0.25, h * 0.5 - 25.0),
        ("World normals", w * 0.75, h * 0.5 - 25.0),
        ("Color", w * 0.25, h - 25.0),
        ("Final image", w * 0.75, h - 25.0),
    ]
    .into_iter()
    .map(|(text, x, y)| OverlayLabel { text, x, y, align: TextAlign::Center })
    .collect()
}

/// Everything `prepare` creates
struct FrameGraph {
    quads: MeshBuffers,
    sky: SkySphere,
    shadows: ShadowPasses,
    gbuffer: GBuffer,
    geometry: GeometryPass,
    composition: CompositionPass,
    uniforms: UniformBuffers,
    scheduler: FrameScheduler,
    scene: Scene,
}

impl FrameGraph {
    fn targets(&self) -> PassTargets<'_> {
        PassTargets {
            swapchain: self.composition.render_pass(),
            gbuffer: self.gbuffer.render_pass(),
            shadow: self.shadows.render_pass(),
        }
    }

    fn passes(&self) -> FramePasses<'_> {
        FramePasses {
            shadows: &self.shadows,
            geometry: &self.geometry,
            composition: &self.composition,
        }
    }
}

/// Shadowed deferred renderer
///
/// Fields drop in declaration order: the frame graph and the registries
/// are released before the swapchain and the device.
pub struct DeferredRenderer {
    graph: Option<FrameGraph>,
    resources: RenderResources,
    consolidator: SceneConsolidator,
    camera: Camera,
    lights: SceneLights,
    config: RendererConfig,
    swapchain: Box<dyn Swapchain>,
    device: Arc<dyn GraphicsDevice>,
}

impl DeferredRenderer {
    /// Create an unprepared renderer
    ///
    /// # Arguments
    ///
    /// * `device` - Device every resource is created on
    /// * `swapchain` - Presentation surface; its extent drives the G-buffer size
    /// * `config` - Renderer settings, validated here
    /// * `texture_loader` - Decoder for material and sky textures
    /// * `importer` - Model importer for the scene and the sky sphere
    pub fn new(
        device: Arc<dyn GraphicsDevice>,
        swapchain: Box<dyn Swapchain>,
        mut config: RendererConfig,
        texture_loader: Box<dyn TextureLoader>,
        importer: Box<dyn ModelImporter>,
    ) -> Result<Self> {
        config.validate()?;
        let (width, height) = swapchain.extent();
        config.width = width;
        config.height = height;

        let camera = Camera::new(&config.camera, width as f32 / height.max(1) as f32);
        let lights = SceneLights::new(default_lights(config.light_count));

        Ok(Self {
            graph: None,
            resources: RenderResources::new(texture_loader),
            consolidator: SceneConsolidator::new(importer),
            camera,
            lights,
            config,
            swapchain,
            device,
        })
    }

    /// Build every GPU resource, load the scene and record all passes
    ///
    /// Fails with `Error::AssetLoad` when the scene or the sky cannot be
    /// imported; the renderer then stays unprepared.
    pub fn prepare(&mut self) -> Result<()> {
        if self.graph.is_some() {
            engine_warn!("umbra::DeferredRenderer", "prepare() called twice, ignoring");
            return Ok(());
        }

        let graph = match self.build_graph() {
            Ok(graph) => graph,
            Err(e) => {
                self.resources.clear();
                return Err(e);
            }
        };
        self.graph = Some(graph);
        self.update_uniforms()?;

        let (width, height) = self.swapchain.extent();
        engine_info!("umbra::DeferredRenderer", "Prepared {}x{} with {} lights", width, height, self.config.light_count);
        Ok(())
    }

    fn build_graph(&mut self) -> Result<FrameGraph> {
        let device = self.device.as_ref();
        let config = &self.config;
        let (width, height) = self.swapchain.extent();

        // Geometry shared by the passes
        let quads = create_quads(device)?;
        create_dummy_textures(device, &mut self.resources.textures)?;
        let sky = SkySphere {
            mesh: self.consolidator.load_mesh(&config.asset_path(&config.skysphere_model), device)?,
            texture: self.resources.textures.get_or_load(
                device,
                SKYSPHERE_TEXTURE,
                &config.asset_path(&config.skysphere_texture),
                MATERIAL_TEXTURE_FORMAT,
            )?,
            sampler: device.create_sampler(&SamplerDesc::linear_repeat())?,
        };

        // Render targets
        let shadows = ShadowPasses::new(device, config.light_count, config.shadow_map_size)?;
        let gbuffer = GBuffer::new(device, width, height)?;
        let composition = CompositionPass::new(device, self.swapchain.as_ref())?;

        // Uniforms
        let uniforms = UniformBuffers::new(device, config.light_count)?;

        // Layouts and shared descriptor sets
        create_layouts(device, &mut self.resources, config.light_count)?;
        create_descriptor_sets(device, &mut self.resources, config.light_count)?;
        write_composition_set(device, &self.resources, &gbuffer, &shadows, &uniforms)?;
        write_shadowmap_set(device, &self.resources, &uniforms)?;
        write_skysphere_set(device, &self.resources, &uniforms, &sky.texture, &sky.sampler)?;

        // Pipelines
        let targets = PassTargets {
            swapchain: composition.render_pass(),
            gbuffer: gbuffer.render_pass(),
            shadow: shadows.render_pass(),
        };
        create_pipelines(device, &mut self.resources, config, &targets)?;

        // Scene
        let offscreen_layout = Arc::clone(self.resources.descriptor_set_layouts.require(&LayoutId::Offscreen)?);
        let scene = self.consolidator.load(
            &config.asset_path(&config.scene_file),
            device,
            &mut self.resources.textures,
            &offscreen_layout,
            &uniforms.scene_matrices,
        )?;

        let mut graph = FrameGraph {
            quads,
            sky,
            shadows,
            gbuffer,
            geometry: GeometryPass::new(device)?,
            composition,
            uniforms,
            scheduler: FrameScheduler::new(device, config.light_count)?,
            scene,
        };

        // Command lists
        let bias = DepthBias::new(config.depth_bias_constant, config.depth_bias_slope);
        graph.shadows.record(&self.resources, &graph.scene, bias)?;
        graph.composition.record(&self.resources, &graph.quads, config.debug_display)?;
        graph.geometry.record(&graph.gbuffer, &self.resources, &graph.scene, &graph.sky)?;

        Ok(graph)
    }

    pub fn is_prepared(&self) -> bool {
        self.graph.is_some()
    }

    /// Submit one frame
    ///
    /// A suboptimal or out-of-date swapchain is recreated at the current
    /// configured size.
    pub fn draw(&mut self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(not_prepared)?;
        let stale = graph.scheduler.draw_frame(self.device.as_ref(), self.swapchain.as_mut(), &graph.passes())?;
        if stale {
            engine_debug!("umbra::DeferredRenderer", "Swapchain out of date, recreating");
            self.resize(self.config.width, self.config.height)?;
        }
        Ok(())
    }

    /// Draw, then refresh the light uniforms unless paused
    ///
    /// Does nothing before `prepare`.
    pub fn render_frame(&mut self) -> Result<()> {
        if self.graph.is_none() {
            return Ok(());
        }
        self.draw()?;
        if !self.config.paused {
            self.update_light_uniforms()?;
            self.update_shadow_matrices()?;
        }
        Ok(())
    }

    /// Rewrite every uniform buffer from the current state
    pub fn update_uniforms(&mut self) -> Result<()> {
        self.update_screen_uniforms()?;
        self.update_camera_matrices()?;
        self.update_light_uniforms()?;
        self.update_shadow_matrices()
    }

    /// Full-screen quad projection (depends on the debug display flag)
    pub fn update_screen_uniforms(&self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(not_prepared)?;
        let (width, height) = graph.gbuffer.extent();
        graph.uniforms.write_screen(&MatrixUniforms::screen(self.config.debug_display, width, height))
    }

    /// Camera matrices of the G-buffer pass
    pub fn update_camera_matrices(&self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(not_prepared)?;
        let (width, height) = graph.gbuffer.extent();
        graph.uniforms.write_scene_matrices(&MatrixUniforms::scene(&self.camera, width, height))
    }

    /// Lights and eye position for the composition pass
    pub fn update_light_uniforms(&mut self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(not_prepared)?;
        if self.config.attach_light {
            if let Some(light) = self.lights.lights.first_mut() {
                light.position = attached_light_position(self.camera.position());
            }
        }
        self.lights.set_camera(&self.camera);
        graph.uniforms.write_scene_lights(&self.lights)
    }

    /// Light-space matrices of the shadow passes
    pub fn update_shadow_matrices(&self) -> Result<()> {
        let graph = self.graph.as_ref().ok_or_else(not_prepared)?;
        graph.uniforms.write_shadow(&ShadowMatrices::from_lights(&self.lights.lights))
    }

    /// Resize the swapchain and every size-dependent target
    ///
    /// Shadow maps keep their size and their recorded command lists.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            engine_debug!("umbra::DeferredRenderer", "Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        self.config.width = width;
        self.config.height = height;

        let Some(graph) = self.graph.as_mut() else {
            self.camera.set_aspect(width as f32 / height as f32);
            return Ok(());
        };

        let device = self.device.as_ref();
        device.wait_idle()?;
        self.swapchain.recreate(width, height)?;
        let (width, height) = self.swapchain.extent();

        graph.gbuffer.resize(device, width, height)?;
        graph.composition.rebuild_framebuffers(device, self.swapchain.as_ref())?;
        write_composition_set(device, &self.resources, &graph.gbuffer, &graph.shadows, &graph.uniforms)?;

        graph.geometry.invalidate();
        graph.geometry.record(&graph.gbuffer, &self.resources, &graph.scene, &graph.sky)?;
        graph.composition.record(&self.resources, &graph.quads, self.config.debug_display)?;

        self.camera.set_aspect(width as f32 / height as f32);
        self.update_screen_uniforms()?;
        self.update_camera_matrices()?;

        engine_info!("umbra::DeferredRenderer", "Resized to {}x{}", width, height);
        Ok(())
    }

    /// Switch between the final image and the four-quadrant debug view
    pub fn toggle_debug_display(&mut self) -> Result<()> {
        self.config.debug_display = !self.config.debug_display;
        engine_debug!("umbra::DeferredRenderer", "Debug display {}", on_off(self.config.debug_display));

        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        self.device.wait_idle()?;
        graph.composition.record(&self.resources, &graph.quads, self.config.debug_display)?;
        self.update_screen_uniforms()
    }

    /// Toggle ambient occlusion in the composition shader
    ///
    /// The flag is a specialization constant, so the composition pipeline
    /// is rebuilt.
    pub fn toggle_ssao(&mut self) -> Result<()> {
        self.config.enable_ssao = !self.config.enable_ssao;
        engine_debug!("umbra::DeferredRenderer", "SSAO {}", on_off(self.config.enable_ssao));

        let Some(graph) = self.graph.as_mut() else {
            return Ok(());
        };
        let device = self.device.as_ref();
        device.wait_idle()?;
        rebuild_composition_pipeline(device, &mut self.resources, &self.config, &graph.targets())?;
        graph.composition.record(&self.resources, &graph.quads, self.config.debug_display)
    }

    /// Make light 0 follow the camera
    pub fn toggle_attach_light(&mut self) {
        self.config.attach_light = !self.config.attach_light;
        engine_debug!("umbra::DeferredRenderer", "Attached light {}", on_off(self.config.attach_light));
    }

    /// Freeze the per-frame light updates
    pub fn toggle_pause(&mut self) {
        self.config.paused = !self.config.paused;
    }

    /// Move the camera; rewrites the scene matrices when it moved
    pub fn update_camera(&mut self, delta_seconds: f32, movement: CameraMovement) -> Result<bool> {
        let moved = self.camera.update(delta_seconds, movement);
        if moved && self.graph.is_some() {
            self.update_camera_matrices()?;
        }
        Ok(moved)
    }

    /// Rotate the camera by a mouse delta in pixels
    pub fn rotate_camera(&mut self, dx: f32, dy: f32) -> Result<()> {
        self.camera.rotate_by_mouse(dx, dy);
        if self.graph.is_some() {
            self.update_camera_matrices()?;
        }
        Ok(())
    }

    /// Captions of the debug quadrants, empty outside the debug display
    pub fn overlay_labels(&self) -> Vec<OverlayLabel> {
        if !self.config.debug_display {
            return Vec::new();
        }
        debug_overlay_labels(self.config.width, self.config.height)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn lights(&self) -> &SceneLights {
        &self.lights
    }

    pub fn resources(&self) -> &RenderResources {
        &self.resources
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.graph.as_ref().map(|g| &g.scene)
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }
}

impl Drop for DeferredRenderer {
    fn drop(&mut self) {
        if self.graph.is_some() {
            if let Err(e) = self.device.wait_idle() {
                engine_warn!("umbra::DeferredRenderer", "wait_idle failed during shutdown: {}", e);
            }
        }
        self.graph = None;
        self.resources.clear();
    }
}

fn not_prepared() -> Error {
    Error::NotReady("Renderer has not been prepared".to_string())
}

fn on_off(flag: bool) -> &'static str {
    if flag { "on" } else { "off" }
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
