//! Tandem engine crate.
//!
//! Drives a two-stage GPU frame: a compute stage that produces GPU-resident data
//! and a render stage that consumes it and presents, once per displayed frame.
//!
//! Layering, leaves first:
//! - `params`: parameter block layouts and host-side marshaling
//! - `registry`: ownership of every backend object, handed out as typed handles
//! - `stage`: compute/render stage descriptors and their per-frame entry points
//! - `backend`: the `Backend` seam, with a wgpu and a software implementation
//! - `pipeline`: `PipelineSpec` data and the `FrameOrchestrator`
//! - `device`, `window`: wgpu device/surface and the winit runtime adapter

pub mod backend;
pub mod color;
pub mod device;
pub mod input;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod stage;
pub mod time;
pub mod window;
