use crate::backend::Backend;
use crate::params::ParamBlock;
use crate::registry::{RenderPipelineHandle, ResourceRegistry};

use super::compute::ComputeDone;

/// Counts for the single draw of a render stage.
///
/// `count` is the index count for indexed pipelines, the vertex count otherwise.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawCall {
    pub count: u32,
    pub instances: u32,
}

impl DrawCall {
    pub const fn new(count: u32, instances: u32) -> Self {
        Self { count, instances }
    }
}

/// One draw per frame that reads the compute stage's output.
#[derive(Debug, Clone)]
pub struct RenderStage {
    label: String,
    pipeline: RenderPipelineHandle,
    call: DrawCall,
}

impl RenderStage {
    pub fn new(label: impl Into<String>, pipeline: RenderPipelineHandle, call: DrawCall) -> Self {
        Self {
            label: label.into(),
            pipeline,
            call,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> RenderPipelineHandle {
        self.pipeline
    }

    pub fn call(&self) -> DrawCall {
        self.call
    }

    /// Clears the target and issues the draw.
    ///
    /// Requires this frame's `ComputeDone`, so the draw is always recorded
    /// after the dispatch whose output it reads.
    pub fn draw<B: Backend>(
        &self,
        backend: &mut B,
        registry: &ResourceRegistry<B>,
        _done: ComputeDone,
        params: Option<&ParamBlock>,
    ) {
        match registry.render_pipeline(self.pipeline) {
            Some(pipeline) => {
                log::trace!("draw `{}` {:?}", self.label, self.call);
                backend.draw(pipeline, params.map(ParamBlock::as_bytes), self.call);
            }
            None => log::error!("render stage `{}` has no live pipeline", self.label),
        }
    }
}
