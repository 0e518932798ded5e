/// Render resource context
///
/// Owns every long-lived GPU object the passes share. The renderer creates
/// one and passes it by reference to each component that needs it; there is
/// no process-wide resource table.

use std::fmt;
use std::sync::Arc;
use crate::device::{
    DescriptorPool, DescriptorSet, DescriptorSetLayout, GraphicsDevice, Pipeline, PipelineLayout,
};
use crate::error::{Error, Result};
use crate::registry::{ResourceRegistry, TextureLoader, TextureRegistry};

/// Fixed descriptor / pipeline layout identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutId {
    /// G-buffer + shadow maps + light uniforms, read by the full-screen passes
    Composition,
    /// Light-space matrices + light index push constant
    Shadowmap,
    /// Per-mesh matrices + material textures
    Offscreen,
    /// Sky matrices + sky texture
    Skysphere,
}

impl LayoutId {
    pub const ALL: [LayoutId; 4] = [
        LayoutId::Composition,
        LayoutId::Shadowmap,
        LayoutId::Offscreen,
        LayoutId::Skysphere,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayoutId::Composition => "composition",
            LayoutId::Shadowmap => "shadowmap",
            LayoutId::Offscreen => "offscreen",
            LayoutId::Skysphere => "skysphere",
        }
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed pipeline identities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineId {
    Composition,
    DebugDisplay,
    SceneSolid,
    SceneBlend,
    Skysphere,
    Shadowmap,
}

impl PipelineId {
    pub const ALL: [PipelineId; 6] = [
        PipelineId::Composition,
        PipelineId::DebugDisplay,
        PipelineId::SceneSolid,
        PipelineId::SceneBlend,
        PipelineId::Skysphere,
        PipelineId::Shadowmap,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PipelineId::Composition => "composition",
            PipelineId::DebugDisplay => "debugdisplay",
            PipelineId::SceneSolid => "scene.solid",
            PipelineId::SceneBlend => "scene.blend",
            PipelineId::Skysphere => "skysphere",
            PipelineId::Shadowmap => "shadowmap",
        }
    }

    /// Pipeline layout the pipeline is built against
    pub fn layout(&self) -> LayoutId {
        match self {
            PipelineId::Composition | PipelineId::DebugDisplay => LayoutId::Composition,
            PipelineId::SceneSolid | PipelineId::SceneBlend => LayoutId::Offscreen,
            PipelineId::Skysphere => LayoutId::Skysphere,
            PipelineId::Shadowmap => LayoutId::Shadowmap,
        }
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Descriptor sets keyed by layout, allocated from one owned pool
pub struct DescriptorSetRegistry {
    pool: Option<Arc<dyn DescriptorPool>>,
    sets: ResourceRegistry<LayoutId, Arc<dyn DescriptorSet>>,
}

impl DescriptorSetRegistry {
    pub fn new() -> Self {
        Self {
            pool: None,
            sets: ResourceRegistry::new("descriptor set"),
        }
    }

    /// Install the pool later allocations draw from
    pub fn set_pool(&mut self, pool: Arc<dyn DescriptorPool>) {
        self.pool = Some(pool);
    }

    pub fn pool(&self) -> Option<&Arc<dyn DescriptorPool>> {
        self.pool.as_ref()
    }

    /// Allocate a set of `layout` from the pool and register it under `key`
    pub fn add(
        &mut self,
        device: &dyn GraphicsDevice,
        key: LayoutId,
        layout: &Arc<dyn DescriptorSetLayout>,
    ) -> Result<Arc<dyn DescriptorSet>> {
        let pool = self.pool.as_ref().ok_or_else(|| {
            Error::InvalidResource(format!("No descriptor pool for set '{}'", key))
        })?;
        self.sets.add(key, || device.allocate_descriptor_set(pool, layout))
    }

    pub fn get(&self, key: LayoutId) -> Option<&Arc<dyn DescriptorSet>> {
        self.sets.get(&key)
    }

    pub fn require(&self, key: LayoutId) -> Result<&Arc<dyn DescriptorSet>> {
        self.sets.require(&key)
    }

    pub fn present(&self, key: LayoutId) -> bool {
        self.sets.present(&key)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Release every set, then the pool
    pub fn clear(&mut self) {
        self.sets.clear();
        self.pool = None;
    }
}

impl Default for DescriptorSetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// All registries shared by the render graph
pub struct RenderResources {
    pub pipeline_layouts: ResourceRegistry<LayoutId, Arc<dyn PipelineLayout>>,
    pub pipelines: ResourceRegistry<PipelineId, Arc<dyn Pipeline>>,
    pub descriptor_set_layouts: ResourceRegistry<LayoutId, Arc<dyn DescriptorSetLayout>>,
    pub descriptor_sets: DescriptorSetRegistry,
    pub textures: TextureRegistry,
}

impl RenderResources {
    pub fn new(texture_loader: Box<dyn TextureLoader>) -> Self {
        Self {
            pipeline_layouts: ResourceRegistry::new("pipeline layout"),
            pipelines: ResourceRegistry::new("pipeline"),
            descriptor_set_layouts: ResourceRegistry::new("descriptor set layout"),
            descriptor_sets: DescriptorSetRegistry::new(),
            textures: TextureRegistry::new(texture_loader),
        }
    }

    /// Pipeline and its layout, both required to be registered
    pub fn pipeline(&self, id: PipelineId) -> Result<(&Arc<dyn Pipeline>, &Arc<dyn PipelineLayout>)> {
        Ok((self.pipelines.require(&id)?, self.pipeline_layouts.require(&id.layout())?))
    }

    /// Release everything
    ///
    /// Descriptor sets go before their layouts and pool, pipelines before
    /// their layouts.
    pub fn clear(&mut self) {
        self.descriptor_sets.clear();
        self.pipelines.clear();
        self.pipeline_layouts.clear();
        self.descriptor_set_layouts.clear();
        self.textures.clear();
    }
}

impl Drop for RenderResources {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
#[path = "render_resources_tests.rs"]
mod tests;
