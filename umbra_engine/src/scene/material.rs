/// Scene materials and their shared fallback textures
///
/// Every material carries four textures. Channels the model file does not
/// provide fall back to 1x1 dummies registered once per texture registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::device::{GraphicsDevice, Texture, TextureDesc, TextureFormat};
use crate::error::Result;
use crate::registry::{PipelineId, TextureRegistry};
use crate::scene::ImportedMaterial;
use crate::engine_debug;

/// Fallback for materials without a diffuse map (white)
pub const DUMMY_DIFFUSE: &str = "dummy.diffuse";
/// Fallback for materials without a roughness map (black)
pub const DUMMY_SPECULAR: &str = "dummy.specular";
/// Fallback for materials without a bump map (flat normal)
pub const DUMMY_BUMP: &str = "dummy.bump";
/// Fallback for materials without a metalness map (black, dielectric)
pub const DUMMY_METALLIC: &str = "dialectric.metallic";

/// Format material textures are decoded to
pub const MATERIAL_TEXTURE_FORMAT: TextureFormat = TextureFormat::R8G8B8A8_UNORM;

const DUMMY_PIXELS: [(&str, [u8; 4]); 4] = [
    (DUMMY_DIFFUSE, [255, 255, 255, 255]),
    (DUMMY_SPECULAR, [0, 0, 0, 255]),
    (DUMMY_BUMP, [128, 128, 255, 255]),
    (DUMMY_METALLIC, [0, 0, 0, 255]),
];

/// Register the four fallback textures
///
/// Names already present are left untouched, so calling this again keeps
/// every handle identical.
pub fn create_dummy_textures(device: &dyn GraphicsDevice, textures: &mut TextureRegistry) -> Result<()> {
    let desc = TextureDesc { width: 1, height: 1, format: MATERIAL_TEXTURE_FORMAT };
    for (name, pixel) in DUMMY_PIXELS {
        if !textures.present(name) {
            textures.add_from_pixels(device, name, &desc, &pixel)?;
        }
    }
    Ok(())
}

/// Resolve a texture name from a model file against the model directory
///
/// Backslash separators are normalised to `/`.
pub fn resolve_texture_path(base_dir: &Path, file_name: &str) -> PathBuf {
    base_dir.join(file_name.replace('\\', "/"))
}

/// Immutable material of the consolidated scene
#[derive(Clone)]
pub struct Material {
    pub name: String,
    pub diffuse: Arc<dyn Texture>,
    pub roughness: Arc<dyn Texture>,
    pub metallic: Arc<dyn Texture>,
    pub bump: Arc<dyn Texture>,
    pub has_alpha: bool,
    pub has_bump: bool,
    pub has_roughness: bool,
    pub has_metalness: bool,
    /// `SceneSolid`, or `SceneBlend` for alpha-tested materials
    pub pipeline: PipelineId,
}

impl Material {
    /// Build a material, loading each referenced texture at most once per path
    ///
    /// Textures are keyed by their resolved path, so materials naming the
    /// same file share one texture object. Dummy textures must already be
    /// registered.
    pub fn resolve(
        imported: &ImportedMaterial,
        base_dir: &Path,
        device: &dyn GraphicsDevice,
        textures: &mut TextureRegistry,
    ) -> Result<Self> {
        let mut channel = |file: &Option<String>, fallback: &str| -> Result<(Arc<dyn Texture>, bool)> {
            match file {
                Some(file) => {
                    let path = resolve_texture_path(base_dir, file);
                    let key = path.to_string_lossy().into_owned();
                    let texture = textures.get_or_load(device, &key, &path, MATERIAL_TEXTURE_FORMAT)?;
                    Ok((texture, true))
                }
                None => Ok((Arc::clone(textures.require(fallback)?), false)),
            }
        };

        let (diffuse, _) = channel(&imported.diffuse, DUMMY_DIFFUSE)?;
        let (roughness, has_roughness) = channel(&imported.roughness, DUMMY_SPECULAR)?;
        let (metallic, has_metalness) = channel(&imported.metallic, DUMMY_METALLIC)?;
        let (bump, has_bump) = channel(&imported.bump, DUMMY_BUMP)?;
        let has_alpha = imported.opacity.is_some();

        if has_alpha {
            engine_debug!("umbra::Material", "Material '{}' has opacity, alpha test enabled", imported.name);
        }

        Ok(Self {
            name: imported.name.clone(),
            diffuse,
            roughness,
            metallic,
            bump,
            has_alpha,
            has_bump,
            has_roughness,
            has_metalness,
            pipeline: if has_alpha { PipelineId::SceneBlend } else { PipelineId::SceneSolid },
        })
    }

    /// Material with every channel on its fallback
    pub fn fallback(name: &str, textures: &TextureRegistry) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            diffuse: Arc::clone(textures.require(DUMMY_DIFFUSE)?),
            roughness: Arc::clone(textures.require(DUMMY_SPECULAR)?),
            metallic: Arc::clone(textures.require(DUMMY_METALLIC)?),
            bump: Arc::clone(textures.require(DUMMY_BUMP)?),
            has_alpha: false,
            has_bump: false,
            has_roughness: false,
            has_metalness: false,
            pipeline: PipelineId::SceneSolid,
        })
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("has_alpha", &self.has_alpha)
            .field("has_bump", &self.has_bump)
            .field("has_roughness", &self.has_roughness)
            .field("has_metalness", &self.has_metalness)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
