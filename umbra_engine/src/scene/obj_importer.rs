/// Wavefront OBJ importer backed by `tobj`
///
/// MTL channel mapping:
///
/// | MTL key   | Channel   |
/// |-----------|-----------|
/// | `map_Kd`  | diffuse   |
/// | `map_Bump`| bump      |
/// | `map_Ka`  | roughness |
/// | `map_Ks`  | metallic  |
/// | `map_d`   | opacity   |

use std::path::Path;
use crate::error::{Error, Result};
use crate::scene::{ImportedMaterial, ImportedMesh, ImportedModel, ModelImporter};
use crate::{engine_debug, engine_warn};

/// `ModelImporter` for `.obj` files
///
/// Faces are triangulated and positions, normals and uvs share one index
/// stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjImporter;

impl ObjImporter {
    pub fn new() -> Self {
        Self
    }

    fn convert_material(material: tobj::Material) -> ImportedMaterial {
        ImportedMaterial {
            name: material.name,
            diffuse: material.diffuse_texture,
            bump: material.normal_texture,
            roughness: material.ambient_texture,
            metallic: material.specular_texture,
            opacity: material.dissolve_texture,
        }
    }

    fn convert_mesh(model: tobj::Model) -> ImportedMesh {
        let mesh = model.mesh;
        ImportedMesh {
            name: model.name,
            positions: mesh.positions.chunks_exact(3).map(|p| [p[0], p[1], p[2]]).collect(),
            normals: mesh.normals.chunks_exact(3).map(|n| [n[0], n[1], n[2]]).collect(),
            uvs: mesh.texcoords.chunks_exact(2).map(|t| [t[0], t[1]]).collect(),
            tangents: Vec::new(),
            indices: mesh.indices,
            material_index: mesh.material_id,
        }
    }
}

impl ModelImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<ImportedModel> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };

        let (models, materials) = tobj::load_obj(path, &options)
            .map_err(|e| Error::AssetLoad(format!("{}: {}", path.display(), e)))?;

        let materials = match materials {
            Ok(materials) => materials,
            Err(e) => {
                engine_warn!("umbra::ObjImporter", "No materials for '{}': {}", path.display(), e);
                Vec::new()
            }
        };

        engine_debug!("umbra::ObjImporter", "'{}': {} meshes, {} materials",
            path.display(), models.len(), materials.len());

        Ok(ImportedModel {
            materials: materials.into_iter().map(Self::convert_material).collect(),
            meshes: models.into_iter().map(Self::convert_mesh).collect(),
            base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
#[path = "obj_importer_tests.rs"]
mod tests;
