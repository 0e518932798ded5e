/// Texture registry - textures keyed by name, plus the loader that fills it
///
/// Scene textures are keyed by their resolved file path so that two
/// materials naming the same file share one texture object.

use std::path::Path;
use std::sync::Arc;
use crate::device::{GraphicsDevice, Texture, TextureDesc, TextureFormat};
use crate::error::{Error, Result};
use crate::registry::ResourceRegistry;
use crate::{engine_debug, engine_error};

/// Decodes an image file into a device texture
pub trait TextureLoader: Send + Sync {
    /// Load `path` as a 2D texture of the given format
    fn load(&self, device: &dyn GraphicsDevice, path: &Path, format: TextureFormat) -> Result<Arc<dyn Texture>>;
}

/// `TextureLoader` backed by the `image` crate
///
/// Decodes any supported container to 8-bit RGBA.
pub struct ImageTextureLoader;

impl TextureLoader for ImageTextureLoader {
    fn load(&self, device: &dyn GraphicsDevice, path: &Path, format: TextureFormat) -> Result<Arc<dyn Texture>> {
        if format.bytes_per_pixel() != 4 || format.is_depth() {
            return Err(Error::InvalidResource(format!(
                "Texture '{}': format {:?} cannot hold RGBA8 data", path.display(), format
            )));
        }

        let rgba = image::open(path)
            .map_err(|e| {
                engine_error!("umbra::TextureRegistry", "Failed to load '{}': {}", path.display(), e);
                Error::AssetLoad(format!("{}: {}", path.display(), e))
            })?
            .to_rgba8();
        let (width, height) = rgba.dimensions();

        engine_debug!("umbra::TextureRegistry", "Decoded '{}' ({}x{})", path.display(), width, height);

        device.create_texture(&TextureDesc { width, height, format }, &rgba.into_raw())
    }
}

/// Named textures and their loader
pub struct TextureRegistry {
    loader: Box<dyn TextureLoader>,
    textures: ResourceRegistry<String, Arc<dyn Texture>>,
}

impl TextureRegistry {
    pub fn new(loader: Box<dyn TextureLoader>) -> Self {
        Self {
            loader,
            textures: ResourceRegistry::new("texture"),
        }
    }

    /// Load `path` and register it under `name`
    pub fn add_texture_2d(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        path: &Path,
        format: TextureFormat,
    ) -> Result<Arc<dyn Texture>> {
        let loader = &self.loader;
        self.textures.add(name.to_string(), || loader.load(device, path, format))
    }

    /// Create a texture from raw pixels and register it under `name`
    pub fn add_from_pixels(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        desc: &TextureDesc,
        pixels: &[u8],
    ) -> Result<Arc<dyn Texture>> {
        self.textures.add(name.to_string(), || device.create_texture(desc, pixels))
    }

    /// Return the texture registered under `name`, loading it from `path` on first use
    pub fn get_or_load(
        &mut self,
        device: &dyn GraphicsDevice,
        name: &str,
        path: &Path,
        format: TextureFormat,
    ) -> Result<Arc<dyn Texture>> {
        if let Some(texture) = self.textures.get(name) {
            return Ok(Arc::clone(texture));
        }
        self.add_texture_2d(device, name, path, format)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Texture>> {
        self.textures.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&Arc<dyn Texture>> {
        self.textures.require(name)
    }

    pub fn present(&self, name: &str) -> bool {
        self.textures.present(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Release every texture
    pub fn clear(&mut self) {
        self.textures.clear();
    }
}

#[cfg(test)]
#[path = "texture_registry_tests.rs"]
mod tests;
