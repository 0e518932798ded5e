/// Imported model data, independent of the file format
///
/// A `ModelImporter` turns a model file into plain material and mesh lists.
/// Everything here lives on the CPU; the consolidator turns it into GPU
/// buffers and descriptor sets.

use std::path::{Path, PathBuf};
use crate::error::Result;

/// Material as named by the model file
///
/// Texture entries are file names exactly as written by the exporter,
/// relative to the model directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMaterial {
    pub name: String,
    pub diffuse: Option<String>,
    /// Normal / height map
    pub bump: Option<String>,
    pub roughness: Option<String>,
    pub metallic: Option<String>,
    /// Alpha mask
    pub opacity: Option<String>,
}

/// One triangulated sub-mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Empty when the file has no normals
    pub normals: Vec<[f32; 3]>,
    /// Empty when the file has no texture coordinates
    pub uvs: Vec<[f32; 2]>,
    /// Empty when the file has no tangents
    pub tangents: Vec<[f32; 3]>,
    /// Triangle list, local to this mesh
    pub indices: Vec<u32>,
    pub material_index: Option<usize>,
}

impl ImportedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Material and mesh lists of one model file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedModel {
    pub materials: Vec<ImportedMaterial>,
    pub meshes: Vec<ImportedMesh>,
    /// Directory texture names are relative to
    pub base_dir: PathBuf,
}

/// Parses a model file
///
/// Parse failures are reported as `Error::AssetLoad` carrying the parser's
/// message.
pub trait ModelImporter: Send + Sync {
    fn import(&self, path: &Path) -> Result<ImportedModel>;
}
