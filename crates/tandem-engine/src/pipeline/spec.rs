use std::collections::HashMap;

use crate::input::ReleasePolicy;
use crate::registry::{BufferDesc, BufferKind, ImageDesc, ResourceDesc, SamplerDesc};
use crate::stage::{BindingKind, ComputeStageDesc, RenderStageDesc};

/// A resource created at startup and referenced by stages through its key.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredResource {
    Buffer(BufferDesc),
    Image(ImageDesc),
    Sampler(SamplerDesc),
}

impl DeclaredResource {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeclaredResource::Buffer(d) => d.kind.name(),
            DeclaredResource::Image(_) => "image",
            DeclaredResource::Sampler(_) => "sampler",
        }
    }

    pub fn to_desc(&self) -> ResourceDesc {
        match self {
            DeclaredResource::Buffer(d) => ResourceDesc::Buffer(d.clone()),
            DeclaredResource::Image(d) => ResourceDesc::Image(d.clone()),
            DeclaredResource::Sampler(d) => ResourceDesc::Sampler(d.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDecl {
    pub key: String,
    pub resource: DeclaredResource,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SpecError {
    #[error("pipeline `{0}` has a zero-sized output")]
    EmptyOutput(String),

    #[error("resource `{0}` declared more than once")]
    DuplicateResource(String),

    #[error("stage `{stage}` references undeclared resource `{key}`")]
    UnknownResource { stage: String, key: String },

    #[error("stage `{stage}` uses `{key}` as {expected} but it is declared as {found}")]
    WrongResourceKind {
        stage: String,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Everything that distinguishes one pipeline variant from another.
///
/// Pure data: resources in creation order, an optional compute stage, the render
/// stage and the input release policy.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub name: String,
    /// Output width/height in pixels; also the `Resolution` parameter source.
    pub output_size: (u32, u32),
    pub resources: Vec<ResourceDecl>,
    pub compute: Option<ComputeStageDesc>,
    pub render: RenderStageDesc,
    pub release_policy: ReleasePolicy,
}

impl PipelineSpec {
    pub fn new(name: impl Into<String>, output_size: (u32, u32), render: RenderStageDesc) -> Self {
        Self {
            name: name.into(),
            output_size,
            resources: Vec::new(),
            compute: None,
            render,
            release_policy: ReleasePolicy::default(),
        }
    }

    pub fn buffer(self, key: impl Into<String>, desc: BufferDesc) -> Self {
        self.declare(key, DeclaredResource::Buffer(desc))
    }

    pub fn image(self, key: impl Into<String>, desc: ImageDesc) -> Self {
        self.declare(key, DeclaredResource::Image(desc))
    }

    pub fn sampler(self, key: impl Into<String>, desc: SamplerDesc) -> Self {
        self.declare(key, DeclaredResource::Sampler(desc))
    }

    pub fn compute(mut self, stage: ComputeStageDesc) -> Self {
        self.compute = Some(stage);
        self
    }

    pub fn release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    fn declare(mut self, key: impl Into<String>, resource: DeclaredResource) -> Self {
        self.resources.push(ResourceDecl {
            key: key.into(),
            resource,
        });
        self
    }

    pub fn resource(&self, key: &str) -> Option<&DeclaredResource> {
        self.resources.iter().find(|d| d.key == key).map(|d| &d.resource)
    }

    /// Checks that every key a stage references is declared with a fitting kind.
    ///
    /// Descriptor contents (sizes, formats, slots) are validated later by the
    /// registry.
    pub fn validate(&self) -> Result<(), SpecError> {
        let (w, h) = self.output_size;
        if w == 0 || h == 0 {
            return Err(SpecError::EmptyOutput(self.name.clone()));
        }

        let mut declared: HashMap<&str, &DeclaredResource> = HashMap::new();
        for decl in &self.resources {
            if declared.insert(&decl.key, &decl.resource).is_some() {
                return Err(SpecError::DuplicateResource(decl.key.clone()));
            }
        }

        let check = |stage: &str, key: &str, expected: Expect| -> Result<(), SpecError> {
            let found = declared.get(key).ok_or_else(|| SpecError::UnknownResource {
                stage: stage.to_string(),
                key: key.to_string(),
            })?;
            if expected.matches(found) {
                Ok(())
            } else {
                Err(SpecError::WrongResourceKind {
                    stage: stage.to_string(),
                    key: key.to_string(),
                    expected: expected.name(),
                    found: found.kind_name(),
                })
            }
        };

        if let Some(compute) = &self.compute {
            for b in &compute.bindings {
                check(&compute.label, &b.resource, Expect::from_binding(b.kind))?;
            }
            for (_, key) in &compute.targets {
                check(&compute.label, key, Expect::StorageImage)?;
            }
        }

        let render = &self.render;
        for b in &render.bindings {
            check(&render.label, &b.resource, Expect::from_binding(b.kind))?;
        }
        for vb in &render.vertex_buffers {
            check(&render.label, &vb.resource, Expect::VertexBuffer)?;
        }
        if let Some(key) = &render.index_buffer {
            check(&render.label, key, Expect::IndexBuffer)?;
        }

        Ok(())
    }
}

#[derive(Debug, Copy, Clone)]
enum Expect {
    StorageBuffer,
    VertexBuffer,
    IndexBuffer,
    Image,
    StorageImage,
    Sampler,
}

impl Expect {
    fn from_binding(kind: BindingKind) -> Self {
        match kind {
            BindingKind::StorageBuffer(_) => Expect::StorageBuffer,
            BindingKind::SampledImage => Expect::Image,
            BindingKind::Sampler => Expect::Sampler,
        }
    }

    fn matches(self, found: &DeclaredResource) -> bool {
        match (self, found) {
            (Expect::StorageBuffer, DeclaredResource::Buffer(d)) => matches!(d.kind, BufferKind::Storage { .. }),
            (Expect::VertexBuffer, DeclaredResource::Buffer(d)) => d.kind == BufferKind::Vertex,
            (Expect::IndexBuffer, DeclaredResource::Buffer(d)) => matches!(d.kind, BufferKind::Index(_)),
            (Expect::Image, DeclaredResource::Image(_)) => true,
            (Expect::StorageImage, DeclaredResource::Image(d)) => d.storage,
            (Expect::Sampler, DeclaredResource::Sampler(_)) => true,
            _ => false,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Expect::StorageBuffer => "storage buffer",
            Expect::VertexBuffer => "vertex buffer",
            Expect::IndexBuffer => "index buffer",
            Expect::Image => "image",
            Expect::StorageImage => "storage image",
            Expect::Sampler => "sampler",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Access, ImageFormat};
    use crate::stage::{BindingDecl, ShaderSet};

    fn render() -> RenderStageDesc {
        RenderStageDesc::new("draw", ShaderSet::default())
    }

    #[test]
    fn well_formed_spec_validates() {
        let spec = PipelineSpec::new("p", (8, 8), render().bind(BindingDecl::storage(0, "data", Access::ReadOnly)))
            .buffer("data", BufferDesc::storage_zeroed("data", 16, 4))
            .compute(
                ComputeStageDesc::new("step", ShaderSet::default())
                    .bind(BindingDecl::storage(0, "data", Access::ReadWrite)),
            );
        assert_eq!(spec.validate(), Ok(()));
    }

    #[test]
    fn zero_output_is_rejected() {
        let spec = PipelineSpec::new("p", (0, 600), render());
        assert_eq!(spec.validate(), Err(SpecError::EmptyOutput("p".into())));
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let spec = PipelineSpec::new("p", (8, 8), render())
            .sampler("s", SamplerDesc::linear("a"))
            .sampler("s", SamplerDesc::linear("b"));
        assert_eq!(spec.validate(), Err(SpecError::DuplicateResource("s".into())));
    }

    #[test]
    fn unknown_key_names_the_stage() {
        let spec = PipelineSpec::new("p", (8, 8), render().bind(BindingDecl::sampler(1, "missing")));
        assert_eq!(
            spec.validate(),
            Err(SpecError::UnknownResource {
                stage: "draw".into(),
                key: "missing".into()
            })
        );
    }

    #[test]
    fn compute_target_must_be_a_storage_image() {
        let plain = ImageDesc {
            storage: false,
            ..ImageDesc::storage_target("img", 4, 4, ImageFormat::Rgba8Unorm)
        };
        let spec = PipelineSpec::new("p", (8, 8), render())
            .image("img", plain)
            .compute(ComputeStageDesc::new("fill", ShaderSet::default()).target(0, "img"));

        assert!(matches!(
            spec.validate(),
            Err(SpecError::WrongResourceKind { expected: "storage image", found: "image", .. })
        ));
    }

    #[test]
    fn vertex_slot_rejects_storage_buffer() {
        let layout = crate::registry::VertexLayout::packed(&[crate::registry::VertexFormat::Float32x2]);
        let spec = PipelineSpec::new("p", (8, 8), render().vertex_buffer("data", layout))
            .buffer("data", BufferDesc::storage_zeroed("data", 8, 2));
        assert!(matches!(
            spec.validate(),
            Err(SpecError::WrongResourceKind { expected: "vertex buffer", found: "storage buffer", .. })
        ));
    }
}
