//! Fully prepared render graph on the mock device

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::config::RendererConfig;
use crate::device::mock_graphics_device::{MockGraphicsDevice, MockSwapchain};
use crate::device::{GraphicsDevice, SamplerDesc, Texture, TextureDesc, TextureFormat};
use crate::error::Result;
use crate::registry::{LayoutId, RenderResources, TextureLoader};
use crate::render_graph::*;
use crate::scene::{
    create_dummy_textures, ImportedMaterial, ImportedMesh, ImportedModel, MeshBuffers,
    ModelImporter, Scene, SceneConsolidator, SceneVertex,
};
use crate::uniforms::UniformBuffers;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const SHADOW_SIZE: u32 = 256;
pub const IMAGE_COUNT: usize = 2;

/// Loader producing 1x1 textures without touching the file system
pub struct PixelLoader;

impl TextureLoader for PixelLoader {
    fn load(&self, device: &dyn GraphicsDevice, _path: &Path, format: TextureFormat) -> Result<Arc<dyn Texture>> {
        device.create_texture(&TextureDesc { width: 1, height: 1, format }, &[255, 255, 255, 255])
    }
}

/// Importer returning a fixed model
pub struct StaticImporter(pub ImportedModel);

impl ModelImporter for StaticImporter {
    fn import(&self, _path: &Path) -> Result<ImportedModel> {
        Ok(self.0.clone())
    }
}

/// Triangle fan with `triangles` triangles
pub fn fan_mesh(triangles: u32, material_index: Option<usize>) -> ImportedMesh {
    let vertex_count = triangles + 2;
    ImportedMesh {
        name: format!("fan{}", triangles),
        positions: (0..vertex_count).map(|i| [i as f32, 0.0, 1.0]).collect(),
        normals: Vec::new(),
        uvs: Vec::new(),
        tangents: Vec::new(),
        indices: (0..triangles).flat_map(|t| [0, t + 1, t + 2]).collect(),
        material_index,
    }
}

/// Two opaque meshes on a textured material, one alpha-tested mesh
pub fn opaque_and_blend_model() -> ImportedModel {
    ImportedModel {
        materials: vec![
            ImportedMaterial { name: "stone".to_string(), diffuse: Some("stone.png".to_string()), ..Default::default() },
            ImportedMaterial { name: "leaf".to_string(), opacity: Some("leaf_mask.png".to_string()), ..Default::default() },
        ],
        meshes: vec![fan_mesh(2, Some(0)), fan_mesh(1, Some(0)), fan_mesh(3, Some(1))],
        base_dir: PathBuf::from("models"),
    }
}

pub struct GraphFixture {
    pub device: MockGraphicsDevice,
    pub swapchain: MockSwapchain,
    pub config: RendererConfig,
    pub resources: RenderResources,
    pub uniforms: UniformBuffers,
    pub gbuffer: GBuffer,
    pub shadows: ShadowPasses,
    pub composition: CompositionPass,
    pub quads: MeshBuffers,
    pub sky: SkySphere,
}

impl GraphFixture {
    /// Load `model` as the scene
    pub fn load_scene(&mut self, model: ImportedModel) -> Scene {
        let layout = Arc::clone(self.resources.descriptor_set_layouts.require(&LayoutId::Offscreen).unwrap());
        SceneConsolidator::new(Box::new(StaticImporter(model)))
            .load(
                Path::new("models/scene.obj"),
                &self.device,
                &mut self.resources.textures,
                &layout,
                &self.uniforms.scene_matrices,
            )
            .unwrap()
    }

    pub fn bias(&self) -> DepthBias {
        DepthBias::new(self.config.depth_bias_constant, self.config.depth_bias_slope)
    }
}

/// Layouts, sets, targets and pipelines for `light_count` lights
pub fn graph_fixture(light_count: usize) -> GraphFixture {
    let device = MockGraphicsDevice::new();
    let swapchain = device.create_swapchain(WIDTH, HEIGHT, IMAGE_COUNT);
    let config = RendererConfig {
        width: WIDTH,
        height: HEIGHT,
        light_count,
        shadow_map_size: SHADOW_SIZE,
        ..RendererConfig::default()
    };

    let mut resources = RenderResources::new(Box::new(PixelLoader));
    create_dummy_textures(&device, &mut resources.textures).unwrap();

    let quads = create_quads(&device).unwrap();
    let (sky_vertices, sky_indices) = (vec![<SceneVertex as bytemuck::Zeroable>::zeroed(); 3], vec![0, 1, 2]);
    let sky = SkySphere {
        mesh: MeshBuffers::upload(&device, &sky_vertices, &sky_indices).unwrap(),
        texture: device.create_texture(&TextureDesc { width: 1, height: 1, format: TextureFormat::R8G8B8A8_UNORM }, &[0, 0, 0, 255]).unwrap(),
        sampler: device.create_sampler(&SamplerDesc::linear_repeat()).unwrap(),
    };

    let shadows = ShadowPasses::new(&device, light_count, SHADOW_SIZE).unwrap();
    let gbuffer = GBuffer::new(&device, WIDTH, HEIGHT).unwrap();
    let composition = CompositionPass::new(&device, &swapchain).unwrap();
    let uniforms = UniformBuffers::new(&device, light_count).unwrap();

    create_layouts(&device, &mut resources, light_count).unwrap();
    create_descriptor_sets(&device, &mut resources, light_count).unwrap();
    write_composition_set(&device, &resources, &gbuffer, &shadows, &uniforms).unwrap();
    write_shadowmap_set(&device, &resources, &uniforms).unwrap();
    write_skysphere_set(&device, &resources, &uniforms, &sky.texture, &sky.sampler).unwrap();

    create_pipelines(&device, &mut resources, &config, &PassTargets {
        swapchain: composition.render_pass(),
        gbuffer: gbuffer.render_pass(),
        shadow: shadows.render_pass(),
    }).unwrap();

    GraphFixture { device, swapchain, config, resources, uniforms, gbuffer, shadows, composition, quads, sky }
}
