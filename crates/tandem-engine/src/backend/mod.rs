//! Backend seam.
//!
//! The registry, stages and orchestrator are written against `Backend`; the
//! backend owns the concrete objects behind each handle kind.
//!
//! - `WgpuBackend`: wgpu device + window surface
//! - `SoftwareBackend`: runs host kernels, records every call (headless runs, tests)

mod software;
mod wgpu_backend;

pub use software::{
    Command, FrameSnapshot, HostKernel, ImageTexels, KernelCtx, SoftBuffer, SoftCompute,
    SoftImage, SoftRender, SoftwareBackend, LOG_CAPACITY,
};
pub use wgpu_backend::WgpuBackend;

use crate::color::ColorRgba;
use crate::params::ParamLayout;
use crate::registry::{
    Access, BufferDesc, ImageDesc, IndexFormat, RegistryError, SamplerDesc, Topology, VertexLayout,
};
use crate::stage::{DrawCall, ShaderSet};

/// Result of trying to start a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStart {
    /// A target is acquired; dispatch/draw/present may follow.
    Ready,
    /// Transient failure; skip this frame entirely.
    Skip,
    /// Unrecoverable; end the run.
    Fatal,
}

/// A resolved resource reference, borrowed from the registry.
pub enum BoundResource<'a, B: Backend + ?Sized> {
    StorageBuffer { buffer: &'a B::Buffer, access: Access },
    SampledImage(&'a B::Image),
    Sampler(&'a B::Sampler),
}

pub struct BoundSlot<'a, B: Backend + ?Sized> {
    pub slot: u32,
    pub resource: BoundResource<'a, B>,
}

/// Everything a backend needs to build a compute pipeline.
pub struct ComputeBuild<'a, B: Backend + ?Sized> {
    pub label: &'a str,
    pub shader: &'a ShaderSet,
    pub entry_point: &'a str,
    pub bindings: Vec<BoundSlot<'a, B>>,
    pub attachments: Option<&'a B::Attachments>,
    pub params: Option<&'a ParamLayout>,
    pub local_size: [u32; 3],
}

pub struct IndexBinding<'a, B: Backend + ?Sized> {
    pub buffer: &'a B::Buffer,
    pub format: IndexFormat,
}

/// Everything a backend needs to build a render pipeline.
pub struct RenderBuild<'a, B: Backend + ?Sized> {
    pub label: &'a str,
    pub shader: &'a ShaderSet,
    pub vs_entry: &'a str,
    pub fs_entry: &'a str,
    pub bindings: Vec<BoundSlot<'a, B>>,
    pub vertex_buffers: Vec<(&'a B::Buffer, &'a VertexLayout)>,
    pub index_buffer: Option<IndexBinding<'a, B>>,
    pub params: Option<&'a ParamLayout>,
    pub topology: Topology,
    pub clear_color: ColorRgba,
}

/// GPU abstraction driven by the frame pipeline.
///
/// Creation calls happen during startup only. Per frame the orchestrator calls
/// `begin_frame`, then at most one `dispatch`, one `draw` and one `present`, in
/// that order.
pub trait Backend {
    type Buffer;
    type Image;
    type Sampler;
    type Attachments;
    type ComputePipeline;
    type RenderPipeline;

    /// Short backend name for diagnostics.
    fn name(&self) -> &'static str;

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<Self::Buffer, RegistryError>;
    fn create_image(&mut self, desc: &ImageDesc) -> Result<Self::Image, RegistryError>;
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<Self::Sampler, RegistryError>;
    fn create_attachments(
        &mut self,
        label: &str,
        targets: &[(u32, &Self::Image)],
    ) -> Result<Self::Attachments, RegistryError>;
    fn create_compute_pipeline(
        &mut self,
        build: ComputeBuild<'_, Self>,
    ) -> Result<Self::ComputePipeline, RegistryError>;
    fn create_render_pipeline(
        &mut self,
        build: RenderBuild<'_, Self>,
    ) -> Result<Self::RenderPipeline, RegistryError>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        drop(buffer);
    }

    fn destroy_image(&mut self, image: Self::Image) {
        drop(image);
    }

    /// Size of the presentable surface, in pixels.
    fn surface_size(&self) -> (u32, u32);

    fn begin_frame(&mut self) -> FrameStart;

    /// Uploads `params` (when the pipeline has a parameter block) and issues one
    /// dispatch of `grid` workgroups.
    fn dispatch(&mut self, pipeline: &Self::ComputePipeline, params: Option<&[u8]>, grid: [u32; 3]);

    /// Uploads `params`, clears the target and issues one draw.
    fn draw(&mut self, pipeline: &Self::RenderPipeline, params: Option<&[u8]>, call: DrawCall);

    fn present(&mut self);
}
