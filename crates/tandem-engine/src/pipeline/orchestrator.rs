use std::collections::HashMap;

use anyhow::{bail, Context, Result};

use crate::backend::{Backend, FrameStart};
use crate::input::{InputEvent, PointerState};
use crate::params::{ParamBlock, ParamInputs, ParamLayout};
use crate::registry::{
    AttachmentsDesc, Binding, BufferHandle, ComputePipelineDesc, Handle, ImageHandle,
    RenderPipelineDesc, ResourceRegistry, SlotBinding,
};
use crate::stage::{BindingDecl, BindingKind, ComputeDone, ComputeStage, RenderStage};
use crate::time::SimTime;

use super::spec::PipelineSpec;

/// Stage the orchestrator runs next within a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Compute,
    Render,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Lifecycle {
    Created,
    Running,
    ShutDown,
}

/// Result of one `on_frame` call.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameOutcome {
    /// Compute, render and present all ran.
    Presented,
    /// No target could be acquired; nothing was recorded, time still advanced.
    Skipped,
    /// The backend cannot continue; the run should end.
    Fatal,
    /// Not initialized, or already shut down.
    Inactive,
}

struct StageParams {
    layout: ParamLayout,
    block: ParamBlock,
}

impl StageParams {
    fn new(layout: Option<&ParamLayout>) -> Option<Self> {
        layout.map(|l| Self {
            layout: l.clone(),
            block: ParamBlock::new(l),
        })
    }

    fn refill(&mut self, inputs: &ParamInputs) {
        self.block.fill(&self.layout, inputs);
    }
}

/// Per-frame driver of one `PipelineSpec`.
///
/// Owns the registry, both stages, their parameter blocks, the pointer state
/// and simulation time. Every frame runs: advance time, rebuild parameter
/// blocks, dispatch, draw, present. Nothing is reordered or skipped except
/// when the backend cannot start a frame.
pub struct FrameOrchestrator<B: Backend> {
    spec: PipelineSpec,
    lifecycle: Lifecycle,
    registry: ResourceRegistry<B>,
    resources: HashMap<String, Handle>,

    compute: Option<ComputeStage>,
    compute_params: Option<StageParams>,
    render: Option<RenderStage>,
    render_params: Option<StageParams>,

    pointer: PointerState,
    time: SimTime,
    phase: Phase,
    presented: u64,
}

impl<B: Backend> FrameOrchestrator<B> {
    pub fn new(spec: PipelineSpec) -> Self {
        let pointer = PointerState::new(spec.release_policy);
        Self {
            spec,
            lifecycle: Lifecycle::Created,
            registry: ResourceRegistry::new(),
            resources: HashMap::new(),
            compute: None,
            compute_params: None,
            render: None,
            render_params: None,
            pointer,
            time: SimTime::new(),
            phase: Phase::Compute,
            presented: 0,
        }
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    /// Creates every declared resource, then both pipelines.
    ///
    /// Any failure is a startup configuration error. Objects created before
    /// the failure stay owned by the registry and are released by `on_shutdown`.
    pub fn on_init(&mut self, backend: &mut B) -> Result<()> {
        if self.lifecycle != Lifecycle::Created {
            bail!("pipeline `{}` initialized twice", self.spec.name);
        }
        self.spec
            .validate()
            .with_context(|| format!("invalid pipeline `{}`", self.spec.name))?;

        for decl in &self.spec.resources {
            let handle = self
                .registry
                .create(backend, &decl.resource.to_desc())
                .with_context(|| format!("failed to create {} `{}`", decl.resource.kind_name(), decl.key))?;
            self.resources.insert(decl.key.clone(), handle);
        }

        if let Some(desc) = &self.spec.compute {
            let bindings = self.slot_bindings(&desc.bindings)?;
            let attachments = if desc.targets.is_empty() {
                None
            } else {
                let targets = desc
                    .targets
                    .iter()
                    .map(|(slot, key)| Ok((*slot, self.image_handle(key)?)))
                    .collect::<Result<Vec<_>>>()?;
                let handle = self
                    .registry
                    .create_attachments(
                        backend,
                        &AttachmentsDesc {
                            label: format!("{} targets", desc.label),
                            targets,
                        },
                    )
                    .with_context(|| format!("failed to create targets of `{}`", desc.label))?;
                Some(handle)
            };

            let pipeline = self
                .registry
                .create_compute_pipeline(
                    backend,
                    &ComputePipelineDesc {
                        label: desc.label.clone(),
                        shader: desc.shader.clone(),
                        entry_point: desc.entry_point.clone(),
                        bindings,
                        attachments,
                        params: desc.params.clone(),
                        local_size: desc.local_size,
                    },
                )
                .with_context(|| format!("failed to create compute stage `{}`", desc.label))?;

            self.compute = Some(ComputeStage::new(
                desc.label.clone(),
                pipeline,
                desc.problem_size,
                desc.local_size,
            ));
            self.compute_params = StageParams::new(desc.params.as_ref());
        }

        let desc = &self.spec.render;
        let bindings = self.slot_bindings(&desc.bindings)?;
        let vertex_buffers = desc
            .vertex_buffers
            .iter()
            .map(|vb| Ok((self.buffer_handle(&vb.resource)?, vb.layout.clone())))
            .collect::<Result<Vec<_>>>()?;
        let index_buffer = desc
            .index_buffer
            .as_deref()
            .map(|key| self.buffer_handle(key))
            .transpose()?;

        let pipeline = self
            .registry
            .create_render_pipeline(
                backend,
                &RenderPipelineDesc {
                    label: desc.label.clone(),
                    shader: desc.shader.clone(),
                    vs_entry: desc.vs_entry.clone(),
                    fs_entry: desc.fs_entry.clone(),
                    bindings,
                    vertex_buffers,
                    index_buffer,
                    params: desc.params.clone(),
                    topology: desc.topology,
                    clear_color: desc.clear_color,
                },
            )
            .with_context(|| format!("failed to create render stage `{}`", desc.label))?;

        self.render = Some(RenderStage::new(desc.label.clone(), pipeline, desc.draw));
        self.render_params = StageParams::new(desc.params.as_ref());

        self.lifecycle = Lifecycle::Running;
        log::info!(
            "pipeline `{}` ready on {} backend ({} objects)",
            self.spec.name,
            backend.name(),
            self.registry.len()
        );
        Ok(())
    }

    /// Runs one frame with `dt` seconds since the previous one.
    pub fn on_frame(&mut self, backend: &mut B, dt: f32) -> FrameOutcome {
        if self.lifecycle != Lifecycle::Running {
            return FrameOutcome::Inactive;
        }
        let Some(render) = &self.render else {
            return FrameOutcome::Inactive;
        };

        self.time.advance(dt);
        self.phase = Phase::Compute;

        let (w, h) = self.spec.output_size;
        let inputs = ParamInputs {
            elapsed: self.time.elapsed(),
            delta: self.time.delta(),
            resolution: [w as f32, h as f32],
            pointer: self.pointer.as_vec4(),
            element_count: self.compute.as_ref().map_or(render.call().count, |c| c.problem_size()[0]),
        };
        if let Some(p) = &mut self.compute_params {
            p.refill(&inputs);
        }
        if let Some(p) = &mut self.render_params {
            p.refill(&inputs);
        }

        match backend.begin_frame() {
            FrameStart::Ready => {}
            FrameStart::Skip => {
                log::trace!("frame {} skipped", self.time.frame());
                return FrameOutcome::Skipped;
            }
            FrameStart::Fatal => {
                log::error!("backend cannot start a frame; ending the run");
                return FrameOutcome::Fatal;
            }
        }

        let done = match &self.compute {
            Some(stage) => stage.dispatch(backend, &self.registry, self.compute_params.as_ref().map(|p| &p.block)),
            None => ComputeDone::without_compute(),
        };

        self.phase = Phase::Render;
        render.draw(backend, &self.registry, done, self.render_params.as_ref().map(|p| &p.block));
        backend.present();

        self.phase = Phase::Compute;
        self.presented += 1;
        FrameOutcome::Presented
    }

    /// Feeds one input event to the pointer state; read at the next frame.
    pub fn on_event(&mut self, event: &InputEvent) {
        self.pointer.apply(event);
    }

    /// Releases every backend object. Safe to call more than once.
    pub fn on_shutdown(&mut self, backend: &mut B) {
        if self.lifecycle == Lifecycle::ShutDown {
            log::debug!("pipeline `{}` already shut down", self.spec.name);
            return;
        }

        self.registry.destroy_all(backend);
        self.compute = None;
        self.render = None;
        self.lifecycle = Lifecycle::ShutDown;
        log::info!("pipeline `{}` shut down after {} frames", self.spec.name, self.presented);
    }

    // ── accessors ──────────────────────────────────────────────────────────

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn registry(&self) -> &ResourceRegistry<B> {
        &self.registry
    }

    /// Handle created for the resource declared under `key`.
    pub fn resource(&self, key: &str) -> Option<Handle> {
        self.resources.get(key).copied()
    }

    pub fn buffer(&self, key: &str) -> Option<&B::Buffer> {
        self.resource(key)?.as_buffer().and_then(|h| self.registry.buffer(h))
    }

    pub fn image(&self, key: &str) -> Option<&B::Image> {
        self.resource(key)?.as_image().and_then(|h| self.registry.image(h))
    }

    pub fn compute_stage(&self) -> Option<&ComputeStage> {
        self.compute.as_ref()
    }

    pub fn render_stage(&self) -> Option<&RenderStage> {
        self.render.as_ref()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn sim_time(&self) -> &SimTime {
        &self.time
    }

    /// Number of presented frames.
    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    // ── private helpers ────────────────────────────────────────────────────

    fn handle(&self, key: &str) -> Result<Handle> {
        self.resources
            .get(key)
            .copied()
            .with_context(|| format!("resource `{key}` was not created"))
    }

    fn buffer_handle(&self, key: &str) -> Result<BufferHandle> {
        self.handle(key)?
            .as_buffer()
            .with_context(|| format!("resource `{key}` is not a buffer"))
    }

    fn image_handle(&self, key: &str) -> Result<ImageHandle> {
        self.handle(key)?
            .as_image()
            .with_context(|| format!("resource `{key}` is not an image"))
    }

    fn slot_bindings(&self, decls: &[BindingDecl]) -> Result<Vec<SlotBinding>> {
        decls
            .iter()
            .map(|d| {
                let binding = match d.kind {
                    BindingKind::StorageBuffer(access) => Binding::StorageBuffer {
                        buffer: self.buffer_handle(&d.resource)?,
                        access,
                    },
                    BindingKind::SampledImage => Binding::SampledImage {
                        image: self.image_handle(&d.resource)?,
                    },
                    BindingKind::Sampler => Binding::Sampler {
                        sampler: self
                            .handle(&d.resource)?
                            .as_sampler()
                            .with_context(|| format!("resource `{}` is not a sampler", d.resource))?,
                    },
                };
                Ok(SlotBinding { slot: d.slot, binding })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Command, KernelCtx, SoftwareBackend};
    use crate::input::{MouseButton, ReleasePolicy};
    use crate::params::{ParamKind, ParamSource, ParamValue};
    use crate::registry::{Access, BufferDesc, ImageDesc, ImageFormat, RegistryError, SamplerDesc};
    use crate::stage::{ComputeStageDesc, RenderStageDesc, ShaderSet};

    const COUNT: u32 = 100;

    /// Adds the `step` parameter to every counter.
    fn bump(ctx: &mut KernelCtx<'_>) {
        let step = ctx.params_as::<[u32; 4]>().map_or(1, |p| p[0]);
        let ids: Vec<u32> = ctx.invocations().map(|[x, _, _]| x).collect();
        let Some(counters) = ctx.storage_records::<u32>(0) else { return };
        for i in ids {
            if let Some(c) = counters.get_mut(i as usize) {
                *c += step;
            }
        }
    }

    fn fill_gradient(ctx: &mut KernelCtx<'_>) {
        let ids: Vec<[u32; 3]> = ctx.invocations().collect();
        let Some(mut img) = ctx.storage_image(0) else { return };
        for [x, y, _] in ids {
            img.put_rgba8(x, y, [x as u8, y as u8, 0, 255]);
        }
    }

    fn counter_spec() -> PipelineSpec {
        let compute_params = ParamLayout::builder()
            .field("step", ParamKind::U32, ParamSource::Constant(ParamValue::U32(1)))
            .field("count", ParamKind::U32, ParamSource::ElementCount)
            .build()
            .unwrap();
        let render_params = ParamLayout::builder()
            .field("time", ParamKind::F32, ParamSource::Elapsed)
            .field("mouse", ParamKind::Vec4, ParamSource::Pointer)
            .build()
            .unwrap();

        PipelineSpec::new(
            "counters",
            (64, 48),
            RenderStageDesc::new("show", ShaderSet::default())
                .bind(BindingDecl::storage(0, "counters", Access::ReadOnly))
                .params(render_params)
                .draw(COUNT, 1),
        )
        .buffer("counters", BufferDesc::storage_zeroed("counters", 4, COUNT))
        .compute(
            ComputeStageDesc::new("bump", ShaderSet::host(bump))
                .bind(BindingDecl::storage(0, "counters", Access::ReadWrite))
                .params(compute_params)
                .local_size([64, 1, 1])
                .problem_size([COUNT, 1, 1]),
        )
    }

    fn started(spec: PipelineSpec) -> (FrameOrchestrator<SoftwareBackend>, SoftwareBackend) {
        let mut backend = SoftwareBackend::new(64, 48);
        let mut orch = FrameOrchestrator::new(spec);
        orch.on_init(&mut backend).unwrap();
        backend.take_log();
        (orch, backend)
    }

    fn counters(orch: &FrameOrchestrator<SoftwareBackend>) -> Vec<u32> {
        orch.buffer("counters").unwrap().read_as::<u32>()
    }

    // ── sequencing ─────────────────────────────────────────────────────────

    #[test]
    fn frame_runs_compute_then_render_then_present() {
        let (mut orch, mut be) = started(counter_spec());
        assert_eq!(orch.on_frame(&mut be, 1.0 / 60.0), FrameOutcome::Presented);

        assert_eq!(
            be.log(),
            &[
                Command::BeginFrame { frame: 0 },
                Command::Dispatch { label: "bump".into(), grid: [2, 1, 1] },
                Command::Draw { label: "show".into(), call: crate::stage::DrawCall::new(COUNT, 1) },
                Command::Present { frame: 0 },
            ]
        );
        assert_eq!(orch.phase(), Phase::Compute);
    }

    #[test]
    fn render_reads_the_same_frames_compute_output() {
        let (mut orch, mut be) = started(counter_spec());
        for frame in 1..=5u32 {
            orch.on_frame(&mut be, 1.0 / 60.0);
            let shown: Vec<u32> = bytemuck::pod_collect_to_vec(&be.last_frame().unwrap().bytes);
            assert_eq!(shown, vec![frame; COUNT as usize]);
        }
        assert_eq!(counters(&orch), vec![5; COUNT as usize]);
    }

    #[test]
    fn skipped_frame_advances_time_but_records_nothing() {
        let (mut orch, mut be) = started(counter_spec());
        be.skip_next_frames(1);

        assert_eq!(orch.on_frame(&mut be, 0.5), FrameOutcome::Skipped);
        assert_eq!(be.log(), &[Command::SkippedFrame]);
        assert_eq!(counters(&orch), vec![0; COUNT as usize]);
        assert_eq!(orch.sim_time().elapsed(), 0.5);
        assert_eq!(orch.frames_presented(), 0);

        assert_eq!(orch.on_frame(&mut be, 0.5), FrameOutcome::Presented);
        assert_eq!(counters(&orch), vec![1; COUNT as usize]);
    }

    #[test]
    fn render_only_pipeline_draws_without_dispatch() {
        let spec = PipelineSpec::new(
            "tri",
            (8, 8),
            RenderStageDesc::new("tri", ShaderSet::default())
                .vertex_buffer(
                    "verts",
                    crate::registry::VertexLayout::packed(&[crate::registry::VertexFormat::Float32x2]),
                )
                .draw(3, 1),
        )
        .buffer("verts", BufferDesc::vertex("verts", &[[0.0f32, 0.5], [-0.5, -0.5], [0.5, -0.5]]));

        let (mut orch, mut be) = started(spec);
        orch.on_frame(&mut be, 0.016);
        assert!(!be.log().iter().any(|c| matches!(c, Command::Dispatch { .. })));
        assert_eq!(be.presented(), 1);
    }

    // ── parameters ─────────────────────────────────────────────────────────

    #[test]
    fn parameter_blocks_follow_time_and_pointer() {
        let (mut orch, mut be) = started(counter_spec());
        orch.on_event(&InputEvent::pointer_down(MouseButton::Left, 10.0, 20.0));
        orch.on_event(&InputEvent::pointer_move(15.0, 25.0));
        orch.on_frame(&mut be, 0.25);
        orch.on_frame(&mut be, 0.25);

        let params = be.last_frame().unwrap().params.clone().unwrap();
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(&params);
        assert_eq!(floats.len(), 8);
        assert_eq!(floats[0], 0.5);
        assert_eq!(&floats[4..8], &[15.0, 25.0, 1.0, 0.0]);
    }

    #[test]
    fn latch_policy_comes_from_the_spec() {
        let spec = counter_spec().release_policy(ReleasePolicy::Latch);
        let (mut orch, _) = started(spec);
        orch.on_event(&InputEvent::pointer_down(MouseButton::Right, 1.0, 1.0));
        orch.on_event(&InputEvent::pointer_up(MouseButton::Right));
        assert_eq!(orch.pointer().as_vec4()[3], 1.0);
    }

    // ── determinism ────────────────────────────────────────────────────────

    #[test]
    fn identical_runs_present_identical_frames() {
        let run = || {
            let (mut orch, mut be) = started(counter_spec());
            for _ in 0..10 {
                orch.on_frame(&mut be, 1.0 / 60.0);
            }
            be.last_frame().cloned()
        };
        assert_eq!(run(), run());
    }

    // ── storage images ─────────────────────────────────────────────────────

    #[test]
    fn compute_targets_are_sampled_by_render() {
        let spec = PipelineSpec::new(
            "img",
            (4, 2),
            RenderStageDesc::new("display", ShaderSet::default())
                .bind(BindingDecl::sampled_image(0, "img"))
                .bind(BindingDecl::sampler(1, "linear"))
                .draw(6, 1),
        )
        .image("img", ImageDesc::storage_target("img", 4, 2, ImageFormat::Rgba8Unorm))
        .sampler("linear", SamplerDesc::linear("linear"))
        .compute(
            ComputeStageDesc::new("fill", ShaderSet::host(fill_gradient))
                .target(0, "img")
                .local_size([8, 8, 1])
                .problem_size([4, 2, 1]),
        );

        let (mut orch, mut be) = started(spec);
        orch.on_frame(&mut be, 0.016);

        let bytes = &be.last_frame().unwrap().bytes;
        assert_eq!(bytes.len(), 4 * 2 * 4);
        assert_eq!(&bytes[(4 + 3) * 4..(4 + 3) * 4 + 4], &[3, 1, 0, 255]);
    }

    // ── lifecycle ──────────────────────────────────────────────────────────

    #[test]
    fn frames_before_init_and_after_shutdown_do_nothing() {
        let mut be = SoftwareBackend::new(8, 8);
        let mut orch = FrameOrchestrator::new(counter_spec());
        assert_eq!(orch.on_frame(&mut be, 0.1), FrameOutcome::Inactive);

        orch.on_init(&mut be).unwrap();
        orch.on_shutdown(&mut be);
        assert_eq!(orch.on_frame(&mut be, 0.1), FrameOutcome::Inactive);
        assert!(be.log().is_empty());
        assert!(orch.registry().is_destroyed());

        orch.on_shutdown(&mut be);
        assert_eq!(orch.lifecycle(), Lifecycle::ShutDown);
    }

    #[test]
    fn init_twice_is_an_error() {
        let (mut orch, mut be) = started(counter_spec());
        assert!(orch.on_init(&mut be).is_err());
    }

    #[test]
    fn undeclared_binding_fails_init() {
        let spec = PipelineSpec::new(
            "broken",
            (8, 8),
            RenderStageDesc::new("show", ShaderSet::default()).bind(BindingDecl::storage(0, "nope", Access::ReadOnly)),
        );
        let mut be = SoftwareBackend::new(8, 8);
        let mut orch = FrameOrchestrator::new(spec);
        let err = orch.on_init(&mut be).unwrap_err();
        assert!(format!("{err:#}").contains("nope"));
        assert_eq!(orch.lifecycle(), Lifecycle::Created);
    }

    #[test]
    fn missing_host_kernel_fails_init_with_registry_error() {
        let mut spec = counter_spec();
        if let Some(c) = spec.compute.as_mut() {
            c.shader = ShaderSet::wgsl("@compute @workgroup_size(64) fn cs_main() {}");
        }
        let mut be = SoftwareBackend::new(8, 8);
        let mut orch = FrameOrchestrator::new(spec);
        let err = orch.on_init(&mut be).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RegistryError>(),
            Some(RegistryError::MissingShader { .. })
        ));

        // Partially created objects are still released.
        orch.on_shutdown(&mut be);
        assert!(orch.registry().is_destroyed());
    }
}
