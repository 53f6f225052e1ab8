use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_registry_id() -> u32 {
    NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
        pub struct $name {
            registry: u32,
            index: u32,
        }

        impl $name {
            pub const KIND: &'static str = $kind;

            pub(crate) const fn new(registry: u32, index: u32) -> Self {
                Self { registry, index }
            }

            /// Slot index inside the owning registry.
            pub const fn index(self) -> u32 {
                self.index
            }

            pub(crate) const fn registry(self) -> u32 {
                self.registry
            }
        }
    };
}

typed_handle!(
    /// Vertex, index or storage buffer.
    BufferHandle,
    "buffer"
);
typed_handle!(
    /// 2D image, optionally a compute storage target.
    ImageHandle,
    "image"
);
typed_handle!(SamplerHandle, "sampler");
typed_handle!(
    /// Storage images bound as the targets of a compute dispatch.
    AttachmentsHandle,
    "attachments"
);
typed_handle!(ComputePipelineHandle, "compute pipeline");
typed_handle!(RenderPipelineHandle, "render pipeline");

/// Handle returned by the kind-generic `ResourceRegistry::create`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Handle {
    Buffer(BufferHandle),
    Image(ImageHandle),
    Sampler(SamplerHandle),
    Attachments(AttachmentsHandle),
    ComputePipeline(ComputePipelineHandle),
    RenderPipeline(RenderPipelineHandle),
}

impl Handle {
    pub const fn kind(&self) -> &'static str {
        match self {
            Handle::Buffer(_) => BufferHandle::KIND,
            Handle::Image(_) => ImageHandle::KIND,
            Handle::Sampler(_) => SamplerHandle::KIND,
            Handle::Attachments(_) => AttachmentsHandle::KIND,
            Handle::ComputePipeline(_) => ComputePipelineHandle::KIND,
            Handle::RenderPipeline(_) => RenderPipelineHandle::KIND,
        }
    }

    pub const fn as_buffer(&self) -> Option<BufferHandle> {
        match self {
            Handle::Buffer(h) => Some(*h),
            _ => None,
        }
    }

    pub const fn as_image(&self) -> Option<ImageHandle> {
        match self {
            Handle::Image(h) => Some(*h),
            _ => None,
        }
    }

    pub const fn as_sampler(&self) -> Option<SamplerHandle> {
        match self {
            Handle::Sampler(h) => Some(*h),
            _ => None,
        }
    }
}
