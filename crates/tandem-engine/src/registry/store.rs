use std::collections::HashMap;

use crate::backend::{Backend, BoundResource, BoundSlot, ComputeBuild, IndexBinding, RenderBuild};

use super::desc::{
    Access, AttachmentsDesc, Binding, BufferDesc, BufferKind, ComputePipelineDesc, ImageDesc,
    ImageFormat, RenderPipelineDesc, ResourceDesc, SamplerDesc, SlotBinding, MAX_IMAGE_EXTENT,
};
use super::error::RegistryError;
use super::handle::{
    next_registry_id, AttachmentsHandle, BufferHandle, ComputePipelineHandle, Handle, ImageHandle,
    RenderPipelineHandle, SamplerHandle,
};

struct BufferEntry<T> {
    label: String,
    kind: BufferKind,
    size: u64,
    value: T,
}

struct ImageEntry<T> {
    label: String,
    storage: bool,
    format: ImageFormat,
    value: T,
}

struct Named<T> {
    label: String,
    value: T,
}

struct AttachmentsEntry<T> {
    label: String,
    slots: Vec<u32>,
    value: T,
}

/// Exclusive owner of every backend object created for a pipeline.
///
/// Objects are created during startup and released together by `destroy_all`.
/// A handle stays valid from `create` until `destroy_all`; nothing is released
/// individually.
pub struct ResourceRegistry<B: Backend> {
    id: u32,
    buffers: Vec<BufferEntry<B::Buffer>>,
    images: Vec<ImageEntry<B::Image>>,
    samplers: Vec<Named<B::Sampler>>,
    attachments: Vec<AttachmentsEntry<B::Attachments>>,
    compute_pipelines: Vec<Named<B::ComputePipeline>>,
    render_pipelines: Vec<Named<B::RenderPipeline>>,
    destroyed: bool,
}

impl<B: Backend> Default for ResourceRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> ResourceRegistry<B> {
    pub fn new() -> Self {
        Self {
            id: next_registry_id(),
            buffers: Vec::new(),
            images: Vec::new(),
            samplers: Vec::new(),
            attachments: Vec::new(),
            compute_pipelines: Vec::new(),
            render_pipelines: Vec::new(),
            destroyed: false,
        }
    }

    /// Number of live objects across all kinds.
    pub fn len(&self) -> usize {
        self.buffers.len()
            + self.images.len()
            + self.samplers.len()
            + self.attachments.len()
            + self.compute_pipelines.len()
            + self.render_pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Creates the object described by `desc`.
    pub fn create(&mut self, backend: &mut B, desc: &ResourceDesc) -> Result<Handle, RegistryError> {
        match desc {
            ResourceDesc::Buffer(d) => self.create_buffer(backend, d).map(Handle::Buffer),
            ResourceDesc::Image(d) => self.create_image(backend, d).map(Handle::Image),
            ResourceDesc::Sampler(d) => self.create_sampler(backend, d).map(Handle::Sampler),
            ResourceDesc::Attachments(d) => {
                self.create_attachments(backend, d).map(Handle::Attachments)
            }
            ResourceDesc::ComputePipeline(d) => {
                self.create_compute_pipeline(backend, d).map(Handle::ComputePipeline)
            }
            ResourceDesc::RenderPipeline(d) => {
                self.create_render_pipeline(backend, d).map(Handle::RenderPipeline)
            }
        }
    }

    // ── creation ───────────────────────────────────────────────────────────

    pub fn create_buffer(&mut self, backend: &mut B, desc: &BufferDesc) -> Result<BufferHandle, RegistryError> {
        self.ensure_live()?;
        validate_buffer(desc)?;

        let value = backend.create_buffer(desc)?;
        let handle = BufferHandle::new(self.id, self.buffers.len() as u32);
        log::debug!("created {} `{}` ({} bytes)", desc.kind.name(), desc.label, desc.size);

        self.buffers.push(BufferEntry {
            label: desc.label.clone(),
            kind: desc.kind,
            size: desc.size,
            value,
        });
        Ok(handle)
    }

    pub fn create_image(&mut self, backend: &mut B, desc: &ImageDesc) -> Result<ImageHandle, RegistryError> {
        self.ensure_live()?;
        let extent_ok = |v: u32| v > 0 && v <= MAX_IMAGE_EXTENT;
        if !extent_ok(desc.width) || !extent_ok(desc.height) {
            return Err(RegistryError::invalid(
                ImageHandle::KIND,
                &desc.label,
                format!("extent {}x{} outside 1..={MAX_IMAGE_EXTENT}", desc.width, desc.height),
            ));
        }

        let value = backend.create_image(desc)?;
        let handle = ImageHandle::new(self.id, self.images.len() as u32);
        log::debug!(
            "created image `{}` ({}x{} {:?}{})",
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            if desc.storage { ", storage" } else { "" }
        );

        self.images.push(ImageEntry {
            label: desc.label.clone(),
            storage: desc.storage,
            format: desc.format,
            value,
        });
        Ok(handle)
    }

    pub fn create_sampler(&mut self, backend: &mut B, desc: &SamplerDesc) -> Result<SamplerHandle, RegistryError> {
        self.ensure_live()?;
        let value = backend.create_sampler(desc)?;
        let handle = SamplerHandle::new(self.id, self.samplers.len() as u32);
        log::debug!("created sampler `{}` ({:?})", desc.label, desc.filter);

        self.samplers.push(Named {
            label: desc.label.clone(),
            value,
        });
        Ok(handle)
    }

    pub fn create_attachments(
        &mut self,
        backend: &mut B,
        desc: &AttachmentsDesc,
    ) -> Result<AttachmentsHandle, RegistryError> {
        self.ensure_live()?;
        if desc.targets.is_empty() {
            return Err(RegistryError::invalid(AttachmentsHandle::KIND, &desc.label, "no targets"));
        }

        let mut slots = HashMap::new();
        let mut targets = Vec::with_capacity(desc.targets.len());
        for &(slot, image) in &desc.targets {
            if let Some(first) = slots.insert(image, slot) {
                return Err(RegistryError::AliasedBinding {
                    stage: desc.label.clone(),
                    kind: ImageHandle::KIND,
                    first,
                    second: slot,
                });
            }
            if targets.iter().any(|&(s, _)| s == slot) {
                return Err(RegistryError::SlotConflict { stage: desc.label.clone(), slot });
            }

            let entry = self.image_entry(image)?;
            if !entry.storage {
                return Err(RegistryError::invalid(
                    AttachmentsHandle::KIND,
                    &desc.label,
                    format!("image `{}` is not a storage target", entry.label),
                ));
            }
            targets.push((slot, &entry.value));
        }

        let value = backend.create_attachments(&desc.label, &targets)?;
        drop(targets);

        let handle = AttachmentsHandle::new(self.id, self.attachments.len() as u32);
        log::debug!("created attachment set `{}` ({} targets)", desc.label, desc.targets.len());

        self.attachments.push(AttachmentsEntry {
            label: desc.label.clone(),
            slots: desc.targets.iter().map(|&(slot, _)| slot).collect(),
            value,
        });
        Ok(handle)
    }

    pub fn create_compute_pipeline(
        &mut self,
        backend: &mut B,
        desc: &ComputePipelineDesc,
    ) -> Result<ComputePipelineHandle, RegistryError> {
        self.ensure_live()?;
        if desc.local_size.contains(&0) {
            return Err(RegistryError::invalid(
                ComputePipelineHandle::KIND,
                &desc.label,
                format!("local size {:?} has a zero axis", desc.local_size),
            ));
        }

        // Attachment target slots share the resource group with the bindings.
        let reserved = match desc.attachments {
            Some(h) => self.attachments_entry(h)?.slots.clone(),
            None => Vec::new(),
        };

        let bindings = self.resolve_bindings(&desc.label, &desc.bindings, &reserved, false)?;
        let attachments = match desc.attachments {
            Some(h) => Some(&self.attachments_entry(h)?.value),
            None => None,
        };

        let value = backend.create_compute_pipeline(ComputeBuild {
            label: &desc.label,
            shader: &desc.shader,
            entry_point: &desc.entry_point,
            bindings,
            attachments,
            params: desc.params.as_ref(),
            local_size: desc.local_size,
        })?;

        let handle = ComputePipelineHandle::new(self.id, self.compute_pipelines.len() as u32);
        log::debug!(
            "created compute pipeline `{}` (entry `{}`, local size {:?})",
            desc.label,
            desc.entry_point,
            desc.local_size
        );

        self.compute_pipelines.push(Named {
            label: desc.label.clone(),
            value,
        });
        Ok(handle)
    }

    pub fn create_render_pipeline(
        &mut self,
        backend: &mut B,
        desc: &RenderPipelineDesc,
    ) -> Result<RenderPipelineHandle, RegistryError> {
        self.ensure_live()?;
        let bindings = self.resolve_bindings(&desc.label, &desc.bindings, &[], true)?;

        let mut vertex_buffers = Vec::with_capacity(desc.vertex_buffers.len());
        for (buffer, layout) in &desc.vertex_buffers {
            let entry = self.buffer_entry(*buffer)?;
            if entry.kind != BufferKind::Vertex {
                return Err(RegistryError::invalid(
                    RenderPipelineHandle::KIND,
                    &desc.label,
                    format!("`{}` is a {}, not a vertex buffer", entry.label, entry.kind.name()),
                ));
            }
            if layout.stride == 0 || layout.attributes.is_empty() {
                return Err(RegistryError::invalid(
                    RenderPipelineHandle::KIND,
                    &desc.label,
                    format!("vertex layout for `{}` is empty", entry.label),
                ));
            }
            vertex_buffers.push((&entry.value, layout));
        }

        let index_buffer = match desc.index_buffer {
            Some(h) => {
                let entry = self.buffer_entry(h)?;
                let BufferKind::Index(format) = entry.kind else {
                    return Err(RegistryError::invalid(
                        RenderPipelineHandle::KIND,
                        &desc.label,
                        format!("`{}` is a {}, not an index buffer", entry.label, entry.kind.name()),
                    ));
                };
                Some(IndexBinding { buffer: &entry.value, format })
            }
            None => None,
        };

        let value = backend.create_render_pipeline(RenderBuild {
            label: &desc.label,
            shader: &desc.shader,
            vs_entry: &desc.vs_entry,
            fs_entry: &desc.fs_entry,
            bindings,
            vertex_buffers,
            index_buffer,
            params: desc.params.as_ref(),
            topology: desc.topology,
            clear_color: desc.clear_color,
        })?;

        let handle = RenderPipelineHandle::new(self.id, self.render_pipelines.len() as u32);
        log::debug!("created render pipeline `{}` ({:?})", desc.label, desc.topology);

        self.render_pipelines.push(Named {
            label: desc.label.clone(),
            value,
        });
        Ok(handle)
    }

    // ── lookup ─────────────────────────────────────────────────────────────

    pub fn buffer(&self, h: BufferHandle) -> Option<&B::Buffer> {
        self.buffer_entry(h).ok().map(|e| &e.value)
    }

    /// Byte size of a buffer as declared at creation.
    pub fn buffer_size(&self, h: BufferHandle) -> Option<u64> {
        self.buffer_entry(h).ok().map(|e| e.size)
    }

    pub fn image(&self, h: ImageHandle) -> Option<&B::Image> {
        self.image_entry(h).ok().map(|e| &e.value)
    }

    pub fn image_format(&self, h: ImageHandle) -> Option<ImageFormat> {
        self.image_entry(h).ok().map(|e| e.format)
    }

    pub fn sampler(&self, h: SamplerHandle) -> Option<&B::Sampler> {
        self.lookup(&self.samplers, h.registry(), h.index()).map(|e| &e.value)
    }

    pub fn attachments(&self, h: AttachmentsHandle) -> Option<&B::Attachments> {
        self.attachments_entry(h).ok().map(|e| &e.value)
    }

    pub fn compute_pipeline(&self, h: ComputePipelineHandle) -> Option<&B::ComputePipeline> {
        self.lookup(&self.compute_pipelines, h.registry(), h.index()).map(|e| &e.value)
    }

    pub fn render_pipeline(&self, h: RenderPipelineHandle) -> Option<&B::RenderPipeline> {
        self.lookup(&self.render_pipelines, h.registry(), h.index()).map(|e| &e.value)
    }

    /// Label of the object behind `h`.
    pub fn label(&self, h: Handle) -> Option<&str> {
        match h {
            Handle::Buffer(h) => self.buffer_entry(h).ok().map(|e| e.label.as_str()),
            Handle::Image(h) => self.image_entry(h).ok().map(|e| e.label.as_str()),
            Handle::Sampler(h) => self.lookup(&self.samplers, h.registry(), h.index()).map(|e| e.label.as_str()),
            Handle::Attachments(h) => self.attachments_entry(h).ok().map(|e| e.label.as_str()),
            Handle::ComputePipeline(h) => self
                .lookup(&self.compute_pipelines, h.registry(), h.index())
                .map(|e| e.label.as_str()),
            Handle::RenderPipeline(h) => self
                .lookup(&self.render_pipelines, h.registry(), h.index())
                .map(|e| e.label.as_str()),
        }
    }

    // ── teardown ───────────────────────────────────────────────────────────

    /// Releases every object. Call once at shutdown; later calls are no-ops.
    pub fn destroy_all(&mut self, backend: &mut B) {
        if self.destroyed {
            log::warn!("resource registry destroyed twice; ignoring");
            return;
        }

        let count = self.len();

        // Consumers before the resources they reference.
        self.render_pipelines.clear();
        self.compute_pipelines.clear();
        self.attachments.clear();
        self.samplers.clear();
        for entry in self.images.drain(..) {
            backend.destroy_image(entry.value);
        }
        for entry in self.buffers.drain(..) {
            backend.destroy_buffer(entry.value);
        }

        self.destroyed = true;
        log::debug!("resource registry released {count} objects");
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<(), RegistryError> {
        if self.destroyed {
            Err(RegistryError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn lookup<'s, T>(&self, items: &'s [T], registry: u32, index: u32) -> Option<&'s T> {
        if self.destroyed || registry != self.id {
            return None;
        }
        items.get(index as usize)
    }

    fn buffer_entry(&self, h: BufferHandle) -> Result<&BufferEntry<B::Buffer>, RegistryError> {
        self.lookup(&self.buffers, h.registry(), h.index())
            .ok_or(RegistryError::UnknownHandle { kind: BufferHandle::KIND, index: h.index() })
    }

    fn image_entry(&self, h: ImageHandle) -> Result<&ImageEntry<B::Image>, RegistryError> {
        self.lookup(&self.images, h.registry(), h.index())
            .ok_or(RegistryError::UnknownHandle { kind: ImageHandle::KIND, index: h.index() })
    }

    fn attachments_entry(&self, h: AttachmentsHandle) -> Result<&AttachmentsEntry<B::Attachments>, RegistryError> {
        self.lookup(&self.attachments, h.registry(), h.index())
            .ok_or(RegistryError::UnknownHandle { kind: AttachmentsHandle::KIND, index: h.index() })
    }

    fn resolve_bindings(
        &self,
        stage: &str,
        bindings: &[SlotBinding],
        reserved: &[u32],
        read_only: bool,
    ) -> Result<Vec<BoundSlot<'_, B>>, RegistryError> {
        let mut seen_slots: Vec<u32> = reserved.to_vec();
        let mut seen_objects: HashMap<Binding, u32> = HashMap::new();
        let mut out = Vec::with_capacity(bindings.len());

        for b in bindings {
            if seen_slots.contains(&b.slot) {
                return Err(RegistryError::SlotConflict { stage: stage.to_string(), slot: b.slot });
            }
            seen_slots.push(b.slot);

            let identity = match b.binding {
                Binding::StorageBuffer { buffer, .. } => Binding::StorageBuffer { buffer, access: Access::ReadOnly },
                other => other,
            };
            if let Some(first) = seen_objects.insert(identity, b.slot) {
                return Err(RegistryError::AliasedBinding {
                    stage: stage.to_string(),
                    kind: binding_kind(&b.binding),
                    first,
                    second: b.slot,
                });
            }

            let resource = match b.binding {
                Binding::StorageBuffer { buffer, access } => {
                    let entry = self.buffer_entry(buffer)?;
                    let BufferKind::Storage { .. } = entry.kind else {
                        return Err(RegistryError::invalid(
                            "binding",
                            stage,
                            format!("slot {}: `{}` is a {}, not a storage buffer", b.slot, entry.label, entry.kind.name()),
                        ));
                    };
                    if read_only && access == Access::ReadWrite {
                        return Err(RegistryError::invalid(
                            "binding",
                            stage,
                            format!("slot {}: render stages bind storage buffers read-only", b.slot),
                        ));
                    }
                    BoundResource::StorageBuffer { buffer: &entry.value, access }
                }
                Binding::SampledImage { image } => BoundResource::SampledImage(&self.image_entry(image)?.value),
                Binding::Sampler { sampler } => {
                    let entry = self
                        .lookup(&self.samplers, sampler.registry(), sampler.index())
                        .ok_or(RegistryError::UnknownHandle { kind: SamplerHandle::KIND, index: sampler.index() })?;
                    BoundResource::Sampler(&entry.value)
                }
            };

            out.push(BoundSlot { slot: b.slot, resource });
        }

        Ok(out)
    }
}

fn binding_kind(b: &Binding) -> &'static str {
    match b {
        Binding::StorageBuffer { .. } => BufferHandle::KIND,
        Binding::SampledImage { .. } => ImageHandle::KIND,
        Binding::Sampler { .. } => SamplerHandle::KIND,
    }
}

fn validate_buffer(desc: &BufferDesc) -> Result<(), RegistryError> {
    let kind = BufferHandle::KIND;
    if desc.size == 0 {
        return Err(RegistryError::invalid(kind, &desc.label, "size is zero"));
    }
    if let Some(bytes) = &desc.contents {
        if bytes.len() as u64 != desc.size {
            return Err(RegistryError::invalid(
                kind,
                &desc.label,
                format!("contents are {} bytes but size is {}", bytes.len(), desc.size),
            ));
        }
    }

    match desc.kind {
        BufferKind::Storage { stride } => {
            if stride == 0 || stride % 4 != 0 {
                return Err(RegistryError::invalid(kind, &desc.label, format!("record stride {stride} is not a positive multiple of 4")));
            }
            if desc.size % stride as u64 != 0 {
                return Err(RegistryError::invalid(
                    kind,
                    &desc.label,
                    format!("size {} is not a whole number of {stride}-byte records", desc.size),
                ));
            }
        }
        BufferKind::Index(fmt) => {
            if desc.size % fmt.size() != 0 {
                return Err(RegistryError::invalid(
                    kind,
                    &desc.label,
                    format!("size {} is not a whole number of {fmt:?} indices", desc.size),
                ));
            }
            if desc.contents.is_none() {
                return Err(RegistryError::invalid(kind, &desc.label, "index buffers need initial contents"));
            }
        }
        BufferKind::Vertex => {
            if desc.contents.is_none() {
                return Err(RegistryError::invalid(kind, &desc.label, "vertex buffers need initial contents"));
            }
        }
    }

    Ok(())
}
