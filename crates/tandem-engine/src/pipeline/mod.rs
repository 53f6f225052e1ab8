//! Pipeline description and per-frame orchestration.
//!
//! A `PipelineSpec` is plain data: declared resources, an optional compute stage
//! and a render stage. `FrameOrchestrator` turns it into backend objects on
//! `on_init` and drives one compute → render → present cycle per `on_frame`.

mod orchestrator;
mod spec;

pub use orchestrator::{FrameOrchestrator, FrameOutcome, Lifecycle, Phase};
pub use spec::{DeclaredResource, PipelineSpec, ResourceDecl, SpecError};
