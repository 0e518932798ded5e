/// G-buffer fill pass
///
/// Draws the sky sphere first, then every opaque mesh with the solid
/// pipeline, then every alpha-tested mesh with the blend pipeline. Each
/// mesh binds its own descriptor set before drawing. Signals its semaphore
/// for the composition pass.

use std::sync::Arc;
use crate::device::{
    CommandList, DrawIndexed, GraphicsDevice, IndexType, PipelineLayout, Rect2D, Sampler,
    Semaphore, Texture, Viewport,
};
use crate::error::Result;
use crate::registry::{LayoutId, PipelineId, RenderResources};
use crate::render_graph::{GBuffer, PassState};
use crate::scene::{MeshBuffers, Scene, SceneMesh};
use crate::engine_debug;

/// Sky sphere mesh and its texture
pub struct SkySphere {
    pub mesh: MeshBuffers,
    pub texture: Arc<dyn Texture>,
    pub sampler: Arc<dyn Sampler>,
}

/// G-buffer command list and completion semaphore
pub struct GeometryPass {
    command_list: Box<dyn CommandList>,
    semaphore: Arc<dyn Semaphore>,
    state: PassState,
}

impl GeometryPass {
    /// Create the pass for an existing G-buffer
    pub fn new(device: &dyn GraphicsDevice) -> Result<Self> {
        let mut state = PassState::default();
        state.framebuffer_built();
        Ok(Self {
            command_list: device.create_command_list()?,
            semaphore: device.create_semaphore()?,
            state,
        })
    }

    /// The G-buffer was recreated; the recorded commands are stale
    pub fn invalidate(&mut self) {
        self.state.framebuffer_built();
    }

    /// Record the whole pass into the command list
    pub fn record(
        &mut self,
        gbuffer: &GBuffer,
        resources: &RenderResources,
        scene: &Scene,
        sky: &SkySphere,
    ) -> Result<()> {
        self.state.begin_recording("geometry")?;
        let (width, height) = gbuffer.extent();

        let cmd = self.command_list.as_mut();
        cmd.begin()?;
        cmd.begin_render_pass(gbuffer.render_pass(), gbuffer.framebuffer(), &GBuffer::clear_values())?;
        cmd.set_viewport(Viewport::full(width, height))?;
        cmd.set_scissor(Rect2D::full(width, height))?;

        // Sky
        let (pipeline, layout) = resources.pipeline(PipelineId::Skysphere)?;
        cmd.bind_pipeline(pipeline)?;
        cmd.bind_descriptor_set(layout, 0, resources.descriptor_sets.require(LayoutId::Skysphere)?)?;
        cmd.bind_vertex_buffer(&sky.mesh.vertex_buffer, 0)?;
        cmd.bind_index_buffer(&sky.mesh.index_buffer, 0, IndexType::U32)?;
        cmd.draw_indexed(DrawIndexed::range(0, sky.mesh.index_count))?;

        if let Some((vertex_buffer, index_buffer)) = scene.buffers() {
            let (solid, solid_layout) = resources.pipeline(PipelineId::SceneSolid)?;
            cmd.bind_pipeline(solid)?;
            cmd.bind_vertex_buffer(vertex_buffer, 0)?;
            cmd.bind_index_buffer(index_buffer, 0, IndexType::U32)?;
            draw_meshes(cmd, solid_layout, scene.opaque_meshes())?;

            let (blend, blend_layout) = resources.pipeline(PipelineId::SceneBlend)?;
            cmd.bind_pipeline(blend)?;
            draw_meshes(cmd, blend_layout, scene.blend_meshes())?;
        }

        cmd.end_render_pass()?;
        cmd.end()?;
        self.state.recorded();

        engine_debug!("umbra::GeometryPass", "Recorded G-buffer pass ({} meshes)", scene.meshes.len());
        Ok(())
    }

    pub fn command_list(&self) -> &dyn CommandList {
        self.command_list.as_ref()
    }

    pub fn semaphore(&self) -> &Arc<dyn Semaphore> {
        &self.semaphore
    }

    pub fn state(&self) -> PassState {
        self.state
    }
}

/// Bind each mesh's set and draw its index range
///
/// Indices are already global, so every draw uses a zero vertex offset.
fn draw_meshes<'a>(
    cmd: &mut dyn CommandList,
    layout: &Arc<dyn PipelineLayout>,
    meshes: impl Iterator<Item = &'a SceneMesh>,
) -> Result<()> {
    for mesh in meshes {
        cmd.bind_descriptor_set(layout, 0, &mesh.descriptor_set)?;
        cmd.draw_indexed(DrawIndexed::range(mesh.index_base, mesh.index_count))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "geometry_pass_tests.rs"]
mod tests;
