/// Tests for RenderResources and DescriptorSetRegistry

use super::*;
use crate::device::mock_graphics_device::{id_of, MockDescriptorSet, MockGraphicsDevice};
use crate::device::{DescriptorPoolDesc, DescriptorSetLayoutDesc, PipelineLayoutDesc};
use crate::registry::ImageTextureLoader;

fn pool_desc(max_sets: u32) -> DescriptorPoolDesc {
    DescriptorPoolDesc { uniform_buffers: max_sets, combined_image_samplers: 0, max_sets }
}

// ============================================================================
// Tests: Identities
// ============================================================================

#[test]
fn test_pipeline_layout_mapping() {
    assert_eq!(PipelineId::DebugDisplay.layout(), LayoutId::Composition);
    assert_eq!(PipelineId::SceneBlend.layout(), LayoutId::Offscreen);
    assert_eq!(PipelineId::Shadowmap.layout(), LayoutId::Shadowmap);
    assert_eq!(PipelineId::Skysphere.layout(), LayoutId::Skysphere);
}

#[test]
fn test_names_are_unique() {
    let mut names: Vec<&str> = PipelineId::ALL.iter().map(|p| p.name()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names.len(), PipelineId::ALL.len());
    assert_eq!(format!("{}", LayoutId::Offscreen), "offscreen");
}

// ============================================================================
// Tests: DescriptorSetRegistry
// ============================================================================

#[test]
fn test_descriptor_set_without_pool_fails() {
    let device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings: vec![] }).unwrap();
    let mut sets = DescriptorSetRegistry::new();
    assert!(sets.add(&device, LayoutId::Composition, &layout).is_err());
    assert!(!sets.present(LayoutId::Composition));
}

#[test]
fn test_descriptor_set_allocated_from_owned_pool() {
    let device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings: vec![] }).unwrap();
    let pool = device.create_descriptor_pool(&pool_desc(2)).unwrap();
    let mut sets = DescriptorSetRegistry::new();
    sets.set_pool(Arc::clone(&pool));

    let set = sets.add(&device, LayoutId::Shadowmap, &layout).unwrap();
    let mock = set.as_any().downcast_ref::<MockDescriptorSet>().unwrap();
    assert_eq!(mock.pool, id_of(pool.as_any()));
    assert_eq!(mock.layout, id_of(layout.as_any()));
    assert!(Arc::ptr_eq(sets.get(LayoutId::Shadowmap).unwrap(), &set));
}

#[test]
fn test_descriptor_pool_exhaustion_propagates() {
    let device = MockGraphicsDevice::new();
    let layout = device.create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings: vec![] }).unwrap();
    let mut sets = DescriptorSetRegistry::new();
    sets.set_pool(device.create_descriptor_pool(&pool_desc(1)).unwrap());
    sets.add(&device, LayoutId::Composition, &layout).unwrap();
    assert!(sets.add(&device, LayoutId::Skysphere, &layout).is_err());
    assert_eq!(sets.len(), 1);
}

// ============================================================================
// Tests: RenderResources
// ============================================================================

#[test]
fn test_pipeline_lookup_requires_layout() {
    let device = MockGraphicsDevice::new();
    let mut resources = RenderResources::new(Box::new(ImageTextureLoader));
    assert!(resources.pipeline(PipelineId::Shadowmap).is_err());

    let layout = resources
        .pipeline_layouts
        .add(LayoutId::Shadowmap, || {
            device.create_pipeline_layout(&PipelineLayoutDesc { set_layouts: vec![], push_constant_ranges: vec![] })
        })
        .unwrap();
    // Layout alone is not enough
    assert!(resources.pipeline(PipelineId::Shadowmap).is_err());
    assert!(Arc::ptr_eq(resources.pipeline_layouts.get(&LayoutId::Shadowmap).unwrap(), &layout));
}

#[test]
fn test_clear_empties_all_registries() {
    let device = MockGraphicsDevice::new();
    let mut resources = RenderResources::new(Box::new(ImageTextureLoader));
    resources
        .descriptor_set_layouts
        .add(LayoutId::Offscreen, || {
            device.create_descriptor_set_layout(&DescriptorSetLayoutDesc { bindings: vec![] })
        })
        .unwrap();
    resources.descriptor_sets.set_pool(device.create_descriptor_pool(&pool_desc(1)).unwrap());
    resources.clear();
    assert!(resources.descriptor_set_layouts.is_empty());
    assert!(resources.descriptor_sets.pool().is_none());
}
