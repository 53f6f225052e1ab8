//! Resource registry.
//!
//! Owns every backend object (buffers, images, samplers, attachment sets,
//! pipelines) for the lifetime of the run and hands out typed handles. Stages
//! hold handles only.

mod desc;
mod error;
mod handle;
mod store;

pub use desc::{
    Access, AttachmentsDesc, Binding, BufferDesc, BufferKind, ComputePipelineDesc, FilterMode,
    ImageDesc, ImageFormat, IndexFormat, RenderPipelineDesc, ResourceDesc, SamplerDesc,
    SlotBinding, Topology, VertexAttribute, VertexFormat, VertexLayout, VertexStep,
    MAX_IMAGE_EXTENT,
};
pub use error::RegistryError;
pub use handle::{
    AttachmentsHandle, BufferHandle, ComputePipelineHandle, Handle, ImageHandle,
    RenderPipelineHandle, SamplerHandle,
};
pub use store::ResourceRegistry;
