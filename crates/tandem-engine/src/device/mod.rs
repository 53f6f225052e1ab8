//! wgpu device and window surface.
//!
//! `Gpu` owns the instance-derived objects and the surface configuration;
//! the wgpu backend records every pass of a frame into one `GpuFrame`.

mod gpu;
mod init;
mod surface;

pub use gpu::{Gpu, GpuFrame};
pub use init::{GpuInit, OutputEncoding};
pub use surface::SurfaceRecovery;
