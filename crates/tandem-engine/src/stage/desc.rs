//! Declarative stage descriptors.
//!
//! Resources are referenced by the key they were declared under in the
//! `PipelineSpec`; the orchestrator resolves keys to registry handles.

use crate::color::ColorRgba;
use crate::params::ParamLayout;
use crate::registry::{Access, Topology, VertexLayout};

use super::render::DrawCall;
use super::shader::ShaderSet;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BindingKind {
    StorageBuffer(Access),
    SampledImage,
    Sampler,
}

/// Slot → declared resource entry of a stage's binding manifest.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BindingDecl {
    pub slot: u32,
    pub resource: String,
    pub kind: BindingKind,
}

impl BindingDecl {
    pub fn storage(slot: u32, resource: impl Into<String>, access: Access) -> Self {
        Self {
            slot,
            resource: resource.into(),
            kind: BindingKind::StorageBuffer(access),
        }
    }

    pub fn sampled_image(slot: u32, resource: impl Into<String>) -> Self {
        Self {
            slot,
            resource: resource.into(),
            kind: BindingKind::SampledImage,
        }
    }

    pub fn sampler(slot: u32, resource: impl Into<String>) -> Self {
        Self {
            slot,
            resource: resource.into(),
            kind: BindingKind::Sampler,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ComputeStageDesc {
    pub label: String,
    pub shader: ShaderSet,
    pub entry_point: String,
    pub bindings: Vec<BindingDecl>,
    /// Storage images written by the dispatch, as `(slot, resource)`.
    pub targets: Vec<(u32, String)>,
    pub params: Option<ParamLayout>,
    pub local_size: [u32; 3],
    pub problem_size: [u32; 3],
}

impl ComputeStageDesc {
    pub fn new(label: impl Into<String>, shader: ShaderSet) -> Self {
        Self {
            label: label.into(),
            shader,
            entry_point: "cs_main".to_string(),
            bindings: Vec::new(),
            targets: Vec::new(),
            params: None,
            local_size: [1, 1, 1],
            problem_size: [1, 1, 1],
        }
    }

    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = name.into();
        self
    }

    pub fn bind(mut self, decl: BindingDecl) -> Self {
        self.bindings.push(decl);
        self
    }

    pub fn target(mut self, slot: u32, resource: impl Into<String>) -> Self {
        self.targets.push((slot, resource.into()));
        self
    }

    pub fn params(mut self, layout: ParamLayout) -> Self {
        self.params = Some(layout);
        self
    }

    pub fn local_size(mut self, size: [u32; 3]) -> Self {
        self.local_size = size;
        self
    }

    pub fn problem_size(mut self, size: [u32; 3]) -> Self {
        self.problem_size = size;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertexBufferDecl {
    pub resource: String,
    pub layout: VertexLayout,
}

#[derive(Debug, Clone)]
pub struct RenderStageDesc {
    pub label: String,
    pub shader: ShaderSet,
    pub vs_entry: String,
    pub fs_entry: String,
    pub bindings: Vec<BindingDecl>,
    pub vertex_buffers: Vec<VertexBufferDecl>,
    pub index_buffer: Option<String>,
    pub params: Option<ParamLayout>,
    pub topology: Topology,
    pub draw: DrawCall,
    pub clear_color: ColorRgba,
}

impl RenderStageDesc {
    pub fn new(label: impl Into<String>, shader: ShaderSet) -> Self {
        Self {
            label: label.into(),
            shader,
            vs_entry: "vs_main".to_string(),
            fs_entry: "fs_main".to_string(),
            bindings: Vec::new(),
            vertex_buffers: Vec::new(),
            index_buffer: None,
            params: None,
            topology: Topology::Triangles,
            draw: DrawCall::new(3, 1),
            clear_color: ColorRgba::black(),
        }
    }

    pub fn entry_points(mut self, vs: impl Into<String>, fs: impl Into<String>) -> Self {
        self.vs_entry = vs.into();
        self.fs_entry = fs.into();
        self
    }

    pub fn bind(mut self, decl: BindingDecl) -> Self {
        self.bindings.push(decl);
        self
    }

    pub fn vertex_buffer(mut self, resource: impl Into<String>, layout: VertexLayout) -> Self {
        self.vertex_buffers.push(VertexBufferDecl {
            resource: resource.into(),
            layout,
        });
        self
    }

    pub fn index_buffer(mut self, resource: impl Into<String>) -> Self {
        self.index_buffer = Some(resource.into());
        self
    }

    pub fn params(mut self, layout: ParamLayout) -> Self {
        self.params = Some(layout);
        self
    }

    pub fn topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Vertex (or index) count and instance count of the single draw.
    pub fn draw(mut self, count: u32, instances: u32) -> Self {
        self.draw = DrawCall::new(count, instances);
        self
    }

    pub fn clear_color(mut self, color: ColorRgba) -> Self {
        self.clear_color = color;
        self
    }
}
