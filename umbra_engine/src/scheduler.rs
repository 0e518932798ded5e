/// Frame submission scheduler
///
/// Every frame is a linear chain on the single graphics queue:
///
/// ```text
/// acquire -> shadow[0] -> ... -> shadow[N-1] -> geometry -> composition -> present
/// ```
///
/// Each submission waits on exactly one semaphore (its predecessor's) and
/// signals exactly one. The chain is built as data first so its shape can
/// be checked without a device.

use std::sync::Arc;
use crate::device::{CommandList, GraphicsDevice, PipelineStages, Semaphore, Submission, Swapchain};
use crate::error::{Error, Result};
use crate::render_graph::{CompositionPass, GeometryPass, ShadowPasses};
use crate::engine_trace;

/// Semaphore roles in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncPoint {
    /// Swapchain image acquired
    PresentComplete,
    /// Shadow map `i` written
    ShadowDone(usize),
    /// G-buffer written
    DeferredDone,
    /// Swapchain image ready to present
    RenderComplete,
}

/// Work submitted by one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameStage {
    Shadow(usize),
    Geometry,
    Composition,
}

impl FrameStage {
    /// Earliest stage of this work that depends on its predecessor
    pub fn wait_stage(&self) -> PipelineStages {
        match self {
            FrameStage::Shadow(_) => PipelineStages::EARLY_FRAGMENT_TESTS,
            FrameStage::Geometry => PipelineStages::COLOR_ATTACHMENT_OUTPUT | PipelineStages::EARLY_FRAGMENT_TESTS,
            FrameStage::Composition => PipelineStages::FRAGMENT_SHADER | PipelineStages::COLOR_ATTACHMENT_OUTPUT,
        }
    }

    /// Semaphore signaled when this work completes
    pub fn signal(&self) -> SyncPoint {
        match self {
            FrameStage::Shadow(i) => SyncPoint::ShadowDone(*i),
            FrameStage::Geometry => SyncPoint::DeferredDone,
            FrameStage::Composition => SyncPoint::RenderComplete,
        }
    }
}

/// One queue submission of the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitStep {
    pub stage: FrameStage,
    pub wait: SyncPoint,
    pub signal: SyncPoint,
}

/// Submission order for `light_count` shadow passes
pub fn build_submission_chain(light_count: usize) -> Vec<SubmitStep> {
    let stages = (0..light_count)
        .map(FrameStage::Shadow)
        .chain([FrameStage::Geometry, FrameStage::Composition]);

    let mut wait = SyncPoint::PresentComplete;
    stages
        .map(|stage| {
            let step = SubmitStep { stage, wait, signal: stage.signal() };
            wait = step.signal;
            step
        })
        .collect()
}

/// Passes the chain submits
pub struct FramePasses<'a> {
    pub shadows: &'a ShadowPasses,
    pub geometry: &'a GeometryPass,
    pub composition: &'a CompositionPass,
}

impl FramePasses<'_> {
    fn ensure_recorded(&self) -> Result<()> {
        let shadows_ready = self.shadows.passes().iter().all(|p| p.state().is_recorded());
        if !shadows_ready || !self.geometry.state().is_recorded() || !self.composition.state().is_recorded() {
            return Err(Error::NotReady("Frame submitted before every pass was recorded".to_string()));
        }
        Ok(())
    }
}

/// Owns the two swapchain semaphores and submits the chain
pub struct FrameScheduler {
    chain: Vec<SubmitStep>,
    present_complete: Arc<dyn Semaphore>,
    render_complete: Arc<dyn Semaphore>,
}

impl FrameScheduler {
    pub fn new(device: &dyn GraphicsDevice, light_count: usize) -> Result<Self> {
        Ok(Self {
            chain: build_submission_chain(light_count),
            present_complete: device.create_semaphore()?,
            render_complete: device.create_semaphore()?,
        })
    }

    pub fn chain(&self) -> &[SubmitStep] {
        &self.chain
    }

    pub fn present_complete(&self) -> &Arc<dyn Semaphore> {
        &self.present_complete
    }

    pub fn render_complete(&self) -> &Arc<dyn Semaphore> {
        &self.render_complete
    }

    /// Submit every step for swapchain image `image_index`
    pub fn submit_chain(&self, device: &dyn GraphicsDevice, passes: &FramePasses, image_index: u32) -> Result<()> {
        passes.ensure_recorded()?;

        for step in &self.chain {
            let command_list = self.command_list(passes, step.stage, image_index)?;
            let wait = self.semaphore(passes, step.wait)?;
            let signal = self.semaphore(passes, step.signal)?;
            device.submit(&Submission {
                command_list,
                wait: Some((wait, step.stage.wait_stage())),
                signal: Some(signal),
            })?;
        }

        engine_trace!("umbra::FrameScheduler", "Submitted {} steps for image {}", self.chain.len(), image_index);
        Ok(())
    }

    /// Acquire, submit the chain, present, then wait for the queue
    ///
    /// Returns true when the swapchain is suboptimal or out of date and
    /// should be recreated.
    pub fn draw_frame(
        &self,
        device: &dyn GraphicsDevice,
        swapchain: &mut dyn Swapchain,
        passes: &FramePasses,
    ) -> Result<bool> {
        let (image_index, suboptimal) = swapchain.acquire_next_image(self.present_complete.as_ref())?;
        self.submit_chain(device, passes, image_index)?;
        let out_of_date = swapchain.present(image_index, self.render_complete.as_ref())?;
        device.queue_wait_idle()?;
        Ok(suboptimal || out_of_date)
    }

    fn command_list<'a>(&self, passes: &FramePasses<'a>, stage: FrameStage, image_index: u32) -> Result<&'a dyn CommandList> {
        match stage {
            FrameStage::Shadow(i) => passes
                .shadows
                .get(i)
                .map(|pass| pass.command_list.as_ref())
                .ok_or_else(|| Error::InvalidResource(format!("No shadow pass for light {}", i))),
            FrameStage::Geometry => Ok(passes.geometry.command_list()),
            FrameStage::Composition => passes.composition.command_list(image_index),
        }
    }

    fn semaphore<'a>(&'a self, passes: &FramePasses<'a>, point: SyncPoint) -> Result<&'a dyn Semaphore> {
        match point {
            SyncPoint::PresentComplete => Ok(self.present_complete.as_ref()),
            SyncPoint::RenderComplete => Ok(self.render_complete.as_ref()),
            SyncPoint::DeferredDone => Ok(passes.geometry.semaphore().as_ref()),
            SyncPoint::ShadowDone(i) => passes
                .shadows
                .get(i)
                .map(|pass| pass.semaphore.as_ref())
                .ok_or_else(|| Error::InvalidResource(format!("No shadow semaphore for light {}", i))),
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
