/// Scene consolidator
///
/// Merges every sub-mesh of an imported model into one global vertex
/// buffer and one global index buffer, resolves materials, and builds one
/// descriptor set per mesh.
///
/// Consolidation is split in two:
///
/// - [`consolidate`] is pure: it only concatenates and transforms CPU data.
/// - [`SceneConsolidator::load`] imports the file, resolves materials,
///   uploads the consolidated data through staging buffers and writes the
///   per-mesh descriptor sets.

use std::path::Path;
use std::sync::Arc;
use crate::device::{
    Buffer, BufferDesc, BufferUsage, DescriptorPool, DescriptorPoolDesc, DescriptorSet,
    DescriptorSetLayout, DescriptorWrite, GraphicsDevice, ImageLayout, Sampler, SamplerDesc,
};
use crate::error::{Error, Result};
use crate::registry::{PipelineId, TextureRegistry};
use crate::scene::{ImportedMesh, Material, ModelImporter, SceneVertex};
use crate::{engine_debug, engine_error, engine_info};

/// Tangent used when the model has none
pub const DEFAULT_TANGENT: [f32; 3] = [0.0, 1.0, 0.0];

/// Name of the material appended for meshes that reference none
pub const DEFAULT_MATERIAL_NAME: &str = "default";

// ============================================================================
// Pure consolidation
// ============================================================================

/// Index range of one mesh inside the global index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshRange {
    pub index_base: u32,
    pub index_count: u32,
    pub material_index: usize,
}

/// Concatenated CPU-side geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidatedGeometry {
    pub vertices: Vec<SceneVertex>,
    pub indices: Vec<u32>,
    pub ranges: Vec<MeshRange>,
}

/// Concatenate meshes into global vertex and index lists
///
/// Positions and normals have their Y component negated. Missing uvs
/// default to zero, missing normals to zero and missing tangents to
/// `DEFAULT_TANGENT`. Local indices are offset by the number of vertices
/// already appended, so every index addresses the global vertex list.
/// Meshes without a material use `default_material`.
pub fn consolidate(meshes: &[ImportedMesh], default_material: usize) -> Result<ConsolidatedGeometry> {
    let mut geometry = ConsolidatedGeometry::default();

    for mesh in meshes {
        if mesh.indices.len() % 3 != 0 {
            return Err(Error::AssetLoad(format!(
                "Mesh '{}' has {} indices, not a triangle list", mesh.name, mesh.indices.len()
            )));
        }
        if let Some(bad) = mesh.indices.iter().find(|&&i| i as usize >= mesh.vertex_count()) {
            return Err(Error::AssetLoad(format!(
                "Mesh '{}' index {} out of range ({} vertices)", mesh.name, bad, mesh.vertex_count()
            )));
        }

        let vertex_base = geometry.vertices.len() as u32;
        let index_base = geometry.indices.len() as u32;

        for (i, position) in mesh.positions.iter().enumerate() {
            let normal = mesh.normals.get(i).copied().unwrap_or([0.0; 3]);
            geometry.vertices.push(SceneVertex {
                pos: [position[0], -position[1], position[2]],
                uv: mesh.uvs.get(i).copied().unwrap_or([0.0; 2]),
                color: [1.0; 3],
                normal: [normal[0], -normal[1], normal[2]],
                tangent: mesh.tangents.get(i).copied().unwrap_or(DEFAULT_TANGENT),
            });
        }
        geometry.indices.extend(mesh.indices.iter().map(|i| i + vertex_base));

        geometry.ranges.push(MeshRange {
            index_base,
            index_count: (mesh.triangle_count() * 3) as u32,
            material_index: mesh.material_index.unwrap_or(default_material),
        });
    }

    Ok(geometry)
}

// ============================================================================
// Device-local mesh buffers
// ============================================================================

/// Vertex and index buffers of one uploaded mesh
#[derive(Clone)]
pub struct MeshBuffers {
    pub vertex_buffer: Arc<dyn Buffer>,
    pub index_buffer: Arc<dyn Buffer>,
    pub index_count: u32,
}

impl MeshBuffers {
    /// Copy vertices and indices into device-local buffers
    ///
    /// Both copies go into one command list; the call blocks until the
    /// queue is idle, after which the staging buffers are released.
    pub fn upload(device: &dyn GraphicsDevice, vertices: &[SceneVertex], indices: &[u32]) -> Result<Self> {
        if vertices.is_empty() || indices.is_empty() {
            return Err(Error::InvalidResource("Cannot upload an empty mesh".to_string()));
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(indices);

        let vertex_staging = device.create_buffer(&BufferDesc::staging(vertex_bytes.len() as u64))?;
        vertex_staging.update(0, vertex_bytes)?;
        let index_staging = device.create_buffer(&BufferDesc::staging(index_bytes.len() as u64))?;
        index_staging.update(0, index_bytes)?;

        let vertex_buffer = device.create_buffer(&BufferDesc::device_local(vertex_bytes.len() as u64, BufferUsage::Vertex))?;
        let index_buffer = device.create_buffer(&BufferDesc::device_local(index_bytes.len() as u64, BufferUsage::Index))?;

        let mut copy = device.create_command_list()?;
        copy.begin()?;
        copy.copy_buffer(&vertex_staging, &vertex_buffer, vertex_bytes.len() as u64)?;
        copy.copy_buffer(&index_staging, &index_buffer, index_bytes.len() as u64)?;
        copy.end()?;
        device.submit_and_wait(copy.as_ref())?;

        Ok(Self { vertex_buffer, index_buffer, index_count: indices.len() as u32 })
    }
}

// ============================================================================
// Scene
// ============================================================================

/// One drawable mesh of the consolidated scene
///
/// Holds no vertex data of its own, only a range into the global buffers.
#[derive(Clone)]
pub struct SceneMesh {
    pub index_base: u32,
    pub index_count: u32,
    /// Index into `Scene::materials`
    pub material: usize,
    /// Matrix uniform buffer and the four material textures
    pub descriptor_set: Arc<dyn DescriptorSet>,
}

/// GPU-resident scene
///
/// An empty scene (no buffers, no meshes) is valid and draws nothing.
#[derive(Default)]
pub struct Scene {
    pub materials: Vec<Material>,
    pub meshes: Vec<SceneMesh>,
    /// Global vertex and index buffers, absent when there is no geometry
    pub geometry: Option<MeshBuffers>,
    vertex_count: u32,
    index_count: u32,
    descriptor_pool: Option<Arc<dyn DescriptorPool>>,
    sampler: Option<Arc<dyn Sampler>>,
}

impl Scene {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn descriptor_set_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn descriptor_pool(&self) -> Option<&Arc<dyn DescriptorPool>> {
        self.descriptor_pool.as_ref()
    }

    pub fn material_of(&self, mesh: &SceneMesh) -> &Material {
        &self.materials[mesh.material]
    }

    /// Meshes drawn with the opaque pipeline (also the shadow casters)
    pub fn opaque_meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.iter().filter(|m| !self.materials[m.material].has_alpha)
    }

    /// Alpha-tested meshes, drawn after the opaque ones
    pub fn blend_meshes(&self) -> impl Iterator<Item = &SceneMesh> {
        self.meshes.iter().filter(|m| self.materials[m.material].has_alpha)
    }

    /// Both global buffers, when the scene has geometry
    pub fn buffers(&self) -> Option<(&Arc<dyn Buffer>, &Arc<dyn Buffer>)> {
        self.geometry.as_ref().map(|g| (&g.vertex_buffer, &g.index_buffer))
    }
}

// ============================================================================
// SceneConsolidator
// ============================================================================

/// Loads a model file into a `Scene`
pub struct SceneConsolidator {
    importer: Box<dyn ModelImporter>,
}

impl SceneConsolidator {
    pub fn new(importer: Box<dyn ModelImporter>) -> Self {
        Self { importer }
    }

    /// Import `path` as one untextured mesh (every sub-mesh merged)
    ///
    /// Used for auxiliary geometry such as the sky sphere.
    pub fn load_mesh(&self, path: &Path, device: &dyn GraphicsDevice) -> Result<MeshBuffers> {
        let model = self.importer.import(path).map_err(|e| {
            engine_error!("umbra::SceneConsolidator", "Error parsing '{}': '{}'", path.display(), e);
            e
        })?;
        let geometry = consolidate(&model.meshes, 0)?;
        if geometry.indices.is_empty() {
            return Err(Error::AssetLoad(format!("{}: no geometry", path.display())));
        }
        MeshBuffers::upload(device, &geometry.vertices, &geometry.indices)
    }

    /// Import, consolidate and upload `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Model file
    /// * `device` - Device creating buffers and descriptor sets
    /// * `textures` - Registry holding the dummy textures; scene textures are added to it
    /// * `layout` - Per-mesh descriptor set layout (uniform buffer + 4 samplers)
    /// * `matrices` - Uniform buffer bound at binding 0 of every mesh set
    ///
    /// On error nothing is returned and the caller keeps its empty scene.
    pub fn load(
        &self,
        path: &Path,
        device: &dyn GraphicsDevice,
        textures: &mut TextureRegistry,
        layout: &Arc<dyn DescriptorSetLayout>,
        matrices: &Arc<dyn Buffer>,
    ) -> Result<Scene> {
        let model = self.importer.import(path).map_err(|e| {
            engine_error!("umbra::SceneConsolidator", "Error parsing '{}': '{}'", path.display(), e);
            e
        })?;

        // Materials
        let mut materials = model
            .materials
            .iter()
            .map(|m| Material::resolve(m, &model.base_dir, device, textures))
            .collect::<Result<Vec<_>>>()?;

        let needs_default = model
            .meshes
            .iter()
            .any(|m| !matches!(m.material_index, Some(i) if i < materials.len()));
        let default_material = materials.len();
        if needs_default {
            materials.push(Material::fallback(DEFAULT_MATERIAL_NAME, textures)?);
        }

        // Meshes
        let mut meshes = model.meshes;
        for mesh in &mut meshes {
            if mesh.material_index.is_some_and(|i| i >= default_material) {
                mesh.material_index = None;
            }
        }
        let geometry = consolidate(&meshes, default_material)?;

        for (mesh, range) in meshes.iter().zip(&geometry.ranges) {
            engine_debug!("umbra::SceneConsolidator", "Mesh '{}': material '{}', {} faces",
                mesh.name, materials[range.material_index].name, range.index_count / 3);
        }

        let mut scene = Scene {
            vertex_count: geometry.vertices.len() as u32,
            index_count: geometry.indices.len() as u32,
            ..Scene::default()
        };

        // Meshes without triangles keep their ranges but nothing is uploaded
        if !geometry.indices.is_empty() {
            scene.geometry = Some(MeshBuffers::upload(device, &geometry.vertices, &geometry.indices)?);
        }

        if !geometry.ranges.is_empty() {
            let mesh_count = geometry.ranges.len() as u32;
            let pool = device.create_descriptor_pool(&DescriptorPoolDesc {
                uniform_buffers: mesh_count,
                combined_image_samplers: 4 * mesh_count,
                max_sets: mesh_count,
            })?;
            let sampler = device.create_sampler(&SamplerDesc::linear_repeat())?;

            for range in &geometry.ranges {
                let material = &materials[range.material_index];
                let set = device.allocate_descriptor_set(&pool, layout)?;
                device.update_descriptor_set(&set, &[
                    DescriptorWrite::uniform(0, matrices),
                    DescriptorWrite::image(1, &material.diffuse, &sampler, ImageLayout::ShaderReadOnly),
                    DescriptorWrite::image(2, &material.roughness, &sampler, ImageLayout::ShaderReadOnly),
                    DescriptorWrite::image(3, &material.bump, &sampler, ImageLayout::ShaderReadOnly),
                    DescriptorWrite::image(4, &material.metallic, &sampler, ImageLayout::ShaderReadOnly),
                ])?;
                scene.meshes.push(SceneMesh {
                    index_base: range.index_base,
                    index_count: range.index_count,
                    material: range.material_index,
                    descriptor_set: set,
                });
            }

            scene.descriptor_pool = Some(pool);
            scene.sampler = Some(sampler);
        }

        scene.materials = materials;

        let blend = scene.meshes.iter().filter(|m| scene.materials[m.material].pipeline == PipelineId::SceneBlend).count();
        engine_info!("umbra::SceneConsolidator",
            "Loaded '{}': {} materials, {} meshes ({} alpha-tested), {} vertices, {} indices",
            path.display(), scene.materials.len(), scene.meshes.len(), blend,
            scene.vertex_count, scene.index_count);

        Ok(scene)
    }
}

#[cfg(test)]
#[path = "consolidator_tests.rs"]
mod tests;
