//! Descriptors accepted by the registry.
//!
//! Pipeline descriptors reference other resources through handles; the registry
//! resolves them before the backend sees anything.

use bytemuck::Pod;

use crate::color::ColorRgba;
use crate::params::ParamLayout;
use crate::stage::ShaderSet;

use super::handle::{AttachmentsHandle, BufferHandle, ImageHandle, SamplerHandle};

// ── buffers ───────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferKind {
    /// Immutable per-vertex data.
    Vertex,
    /// Immutable index data.
    Index(IndexFormat),
    /// Array of fixed-layout records, written only by compute.
    Storage { stride: u32 },
}

impl BufferKind {
    pub const fn name(self) -> &'static str {
        match self {
            BufferKind::Vertex => "vertex buffer",
            BufferKind::Index(_) => "index buffer",
            BufferKind::Storage { .. } => "storage buffer",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc {
    pub label: String,
    pub kind: BufferKind,
    /// Size in bytes.
    pub size: u64,
    /// Initial contents; `None` zero-fills.
    pub contents: Option<Vec<u8>>,
}

impl BufferDesc {
    pub fn vertex<T: Pod>(label: impl Into<String>, vertices: &[T]) -> Self {
        Self::with_contents(label, BufferKind::Vertex, bytemuck::cast_slice(vertices))
    }

    pub fn index_u16(label: impl Into<String>, indices: &[u16]) -> Self {
        Self::with_contents(label, BufferKind::Index(IndexFormat::U16), bytemuck::cast_slice(indices))
    }

    pub fn index_u32(label: impl Into<String>, indices: &[u32]) -> Self {
        Self::with_contents(label, BufferKind::Index(IndexFormat::U32), bytemuck::cast_slice(indices))
    }

    /// Storage buffer initialized from `records`; the stride is `size_of::<T>()`.
    pub fn storage<T: Pod>(label: impl Into<String>, records: &[T]) -> Self {
        let stride = std::mem::size_of::<T>() as u32;
        Self::with_contents(label, BufferKind::Storage { stride }, bytemuck::cast_slice(records))
    }

    pub fn storage_zeroed(label: impl Into<String>, stride: u32, count: u32) -> Self {
        Self {
            label: label.into(),
            kind: BufferKind::Storage { stride },
            size: stride as u64 * count as u64,
            contents: None,
        }
    }

    fn with_contents(label: impl Into<String>, kind: BufferKind, bytes: &[u8]) -> Self {
        Self {
            label: label.into(),
            kind,
            size: bytes.len() as u64,
            contents: Some(bytes.to_vec()),
        }
    }

    /// Number of indices, for index buffers.
    pub fn index_count(&self) -> Option<u32> {
        match self.kind {
            BufferKind::Index(fmt) => Some((self.size / fmt.size()) as u32),
            _ => None,
        }
    }
}

// ── images & samplers ─────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageFormat {
    Rgba8Unorm,
    Rgba16Float,
    Rgba32Float,
}

impl ImageFormat {
    pub const fn bytes_per_texel(self) -> u32 {
        match self {
            ImageFormat::Rgba8Unorm => 4,
            ImageFormat::Rgba16Float => 8,
            ImageFormat::Rgba32Float => 16,
        }
    }

    pub const fn wgsl_name(self) -> &'static str {
        match self {
            ImageFormat::Rgba8Unorm => "rgba8unorm",
            ImageFormat::Rgba16Float => "rgba16float",
            ImageFormat::Rgba32Float => "rgba32float",
        }
    }
}

/// Largest accepted image edge, in texels.
pub const MAX_IMAGE_EXTENT: u32 = 8192;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageDesc {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Compute-writable storage target (also sampleable by render).
    pub storage: bool,
}

impl ImageDesc {
    pub fn storage_target(label: impl Into<String>, width: u32, height: u32, format: ImageFormat) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            format,
            storage: true,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub label: String,
    pub filter: FilterMode,
}

impl SamplerDesc {
    pub fn linear(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            filter: FilterMode::Linear,
        }
    }
}

/// Storage images bound as the targets of a compute dispatch, one per slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentsDesc {
    pub label: String,
    pub targets: Vec<(u32, ImageHandle)>,
}

// ── pipelines ─────────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// A resource bound at a slot of a stage's resource group.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Binding {
    StorageBuffer { buffer: BufferHandle, access: Access },
    SampledImage { image: ImageHandle },
    Sampler { sampler: SamplerHandle },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SlotBinding {
    pub slot: u32,
    pub binding: Binding,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub const fn size(self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: VertexFormat,
    pub offset: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VertexStep {
    Vertex,
    Instance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexLayout {
    pub stride: u32,
    pub step: VertexStep,
    pub attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Per-vertex layout with tightly packed attributes at consecutive locations.
    pub fn packed(formats: &[VertexFormat]) -> Self {
        let mut offset = 0;
        let attributes = formats
            .iter()
            .enumerate()
            .map(|(i, &format)| {
                let attr = VertexAttribute { location: i as u32, format, offset };
                offset += format.size();
                attr
            })
            .collect();

        Self {
            stride: offset,
            step: VertexStep::Vertex,
            attributes,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Topology {
    Points,
    Triangles,
}

#[derive(Debug, Clone)]
pub struct ComputePipelineDesc {
    pub label: String,
    pub shader: ShaderSet,
    pub entry_point: String,
    pub bindings: Vec<SlotBinding>,
    pub attachments: Option<AttachmentsHandle>,
    pub params: Option<ParamLayout>,
    pub local_size: [u32; 3],
}

#[derive(Debug, Clone)]
pub struct RenderPipelineDesc {
    pub label: String,
    pub shader: ShaderSet,
    pub vs_entry: String,
    pub fs_entry: String,
    pub bindings: Vec<SlotBinding>,
    pub vertex_buffers: Vec<(BufferHandle, VertexLayout)>,
    pub index_buffer: Option<BufferHandle>,
    pub params: Option<ParamLayout>,
    pub topology: Topology,
    pub clear_color: ColorRgba,
}

/// Any descriptor, for the kind-generic `ResourceRegistry::create`.
#[derive(Debug, Clone)]
pub enum ResourceDesc {
    Buffer(BufferDesc),
    Image(ImageDesc),
    Sampler(SamplerDesc),
    Attachments(AttachmentsDesc),
    ComputePipeline(ComputePipelineDesc),
    RenderPipeline(RenderPipelineDesc),
}
