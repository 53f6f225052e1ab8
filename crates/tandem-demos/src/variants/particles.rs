//! Bouncing particles: a compute stage integrates positions in a storage
//! buffer, the render stage reads the same buffer as points or quads.

use std::f32::consts::TAU;

use anyhow::{ensure, Result};
use bytemuck::{Pod, Zeroable};
use tandem_engine::backend::KernelCtx;
use tandem_engine::params::{ParamKind, ParamLayout, ParamSource, ParamValue};
use tandem_engine::pipeline::PipelineSpec;
use tandem_engine::registry::{Access, BufferDesc, Topology};
use tandem_engine::stage::{BindingDecl, ComputeStageDesc, RenderStageDesc, ShaderSet};

use super::DemoConfig;

const COMPUTE_SHADER: &str = include_str!("../../shaders/particles_compute.wgsl");
const POINTS_SHADER: &str = include_str!("../../shaders/particles_points.wgsl");
const QUADS_SHADER: &str = include_str!("../../shaders/particles_quads.wgsl");

/// Key of the shared particle storage buffer.
pub const BUFFER: &str = "particles";

pub const LOCAL_SIZE: u32 = 64;
/// Quad edge in pixels.
pub const POINT_SIZE: f32 = 20.0;

const SPAWN_RADIUS: f32 = 0.25;
const SPEED: f32 = 0.25;

/// One particle, laid out identically on host and device (32 bytes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Particle {
    pub pos: [f32; 2],
    pub vel: [f32; 2],
    pub color: [f32; 4],
}

impl Particle {
    /// Advances by `dt` and reverses any velocity component whose coordinate
    /// reached the `[-1, 1]` border. Position is not clamped.
    pub fn step(&mut self, dt: f32) {
        for axis in 0..2 {
            self.pos[axis] += self.vel[axis] * dt;
            if self.pos[axis] <= -1.0 || self.pos[axis] >= 1.0 {
                self.vel[axis] = -self.vel[axis];
            }
        }
    }

    pub fn speed(&self) -> f32 {
        self.vel[0].hypot(self.vel[1])
    }
}

/// Host mirror of the compute parameter block.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct StepParams {
    dt: f32,
    num_particles: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Draw {
    /// One point per particle.
    Points,
    /// Six vertices per particle forming a `POINT_SIZE` quad.
    Quads,
}

/// Places `count` particles uniformly in a disc around the origin, moving
/// outward. Same seed, same particles.
pub fn seed_particles(count: u32, seed: u64) -> Vec<Particle> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            let r = SPAWN_RADIUS * rng.f32().sqrt();
            let theta = rng.f32() * TAU;
            let pos = [r * theta.cos(), r * theta.sin()];

            let len = pos[0].hypot(pos[1]);
            let vel = if len > 0.0 {
                [pos[0] / len * SPEED, pos[1] / len * SPEED]
            } else {
                [SPEED, 0.0]
            };

            Particle {
                pos,
                vel,
                color: [rng.f32(), rng.f32(), rng.f32(), rng.f32()],
            }
        })
        .collect()
}

fn step_kernel(ctx: &mut KernelCtx<'_>) {
    let Some(params) = ctx.params_as::<StepParams>() else {
        return;
    };
    let ids = ctx.invocations();
    let Some(particles) = ctx.storage_records::<Particle>(0) else {
        return;
    };

    for [x, _, _] in ids {
        if x >= params.num_particles {
            continue;
        }
        if let Some(p) = particles.get_mut(x as usize) {
            p.step(params.dt);
        }
    }
}

pub fn spec(cfg: &DemoConfig, draw: Draw) -> Result<PipelineSpec> {
    ensure!(cfg.particles > 0, "particle count must be positive");
    let count = cfg.particles;

    let step_params = ParamLayout::builder()
        .field("dt", ParamKind::F32, ParamSource::Delta)
        .field("num_particles", ParamKind::U32, ParamSource::ElementCount)
        .build()?;

    let compute = ComputeStageDesc::new("particle step", ShaderSet::wgsl(COMPUTE_SHADER).with_host(step_kernel))
        .bind(BindingDecl::storage(0, BUFFER, Access::ReadWrite))
        .params(step_params)
        .local_size([LOCAL_SIZE, 1, 1])
        .problem_size([count, 1, 1]);

    let (name, render) = match draw {
        Draw::Points => (
            "particles",
            RenderStageDesc::new("particle points", ShaderSet::wgsl(POINTS_SHADER))
                .topology(Topology::Points)
                .draw(1, count),
        ),
        Draw::Quads => {
            let quad_params = ParamLayout::builder()
                .field("resolution", ParamKind::Vec2, ParamSource::Resolution)
                .field(
                    "point_size",
                    ParamKind::F32,
                    ParamSource::Constant(ParamValue::F32(POINT_SIZE)),
                )
                .build()?;
            (
                "particle-quads",
                RenderStageDesc::new("particle quads", ShaderSet::wgsl(QUADS_SHADER))
                    .params(quad_params)
                    .draw(6, count),
            )
        }
    };
    let render = render
        .bind(BindingDecl::storage(0, BUFFER, Access::ReadOnly))
        .clear_color(cfg.clear);

    log::debug!("seeding {count} particles with seed {}", cfg.seed);
    Ok(PipelineSpec::new(name, cfg.size, render)
        .buffer(BUFFER, BufferDesc::storage("particles", &seed_particles(count, cfg.seed)))
        .compute(compute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_engine::backend::{Command, SoftwareBackend};
    use tandem_engine::pipeline::{FrameOrchestrator, FrameOutcome};

    const DT: f32 = 1.0 / 60.0;

    fn run(cfg: &DemoConfig, draw: Draw, frames: u32) -> (FrameOrchestrator<SoftwareBackend>, SoftwareBackend) {
        let mut backend = SoftwareBackend::new(cfg.size.0, cfg.size.1);
        let mut orch = FrameOrchestrator::new(spec(cfg, draw).unwrap());
        orch.on_init(&mut backend).unwrap();
        for _ in 0..frames {
            assert_eq!(orch.on_frame(&mut backend, DT), FrameOutcome::Presented);
        }
        (orch, backend)
    }

    fn particles(orch: &FrameOrchestrator<SoftwareBackend>) -> Vec<Particle> {
        orch.buffer(BUFFER).unwrap().read_as::<Particle>()
    }

    // ── record ─────────────────────────────────────────────────────────────

    #[test]
    fn record_is_32_bytes() {
        assert_eq!(std::mem::size_of::<Particle>(), 32);
        assert_eq!(std::mem::offset_of!(Particle, color), 16);
    }

    #[test]
    fn crossing_the_border_flips_velocity_without_clamping() {
        let mut p = Particle {
            pos: [0.999, 0.0],
            vel: [0.25, 0.1],
            color: [1.0; 4],
        };
        p.step(DT);

        assert!(p.pos[0] > 1.0, "position must not be clamped");
        assert_eq!(p.vel, [-0.25, 0.1]);

        p.step(DT);
        assert!(p.pos[0] < 1.0 + 0.25 * DT);
    }

    #[test]
    fn interior_step_keeps_velocity() {
        let mut p = Particle {
            pos: [0.0, -0.5],
            vel: [0.1, -0.2],
            color: [0.0; 4],
        };
        p.step(0.5);
        assert!((p.pos[0] - 0.05).abs() < 1e-6);
        assert!((p.pos[1] + 0.6).abs() < 1e-6);
        assert_eq!(p.vel, [0.1, -0.2]);
    }

    // ── seeding ────────────────────────────────────────────────────────────

    #[test]
    fn seeding_fills_a_small_disc_moving_outward() {
        for p in seed_particles(1000, 7) {
            let r = p.pos[0].hypot(p.pos[1]);
            assert!(r <= SPAWN_RADIUS + 1e-6);
            assert!((p.speed() - SPEED).abs() < 1e-5);
            if r > 1e-3 {
                let outward = p.pos[0] * p.vel[0] + p.pos[1] * p.vel[1];
                assert!(outward > 0.0);
            }
            assert!(p.color.iter().all(|c| (0.0..=1.0).contains(c)));
        }
    }

    #[test]
    fn seeding_is_deterministic() {
        assert_eq!(seed_particles(64, 42), seed_particles(64, 42));
        assert_ne!(seed_particles(64, 42), seed_particles(64, 43));
    }

    // ── pipeline ───────────────────────────────────────────────────────────

    #[test]
    fn default_count_dispatches_128_groups() {
        let (_, backend) = run(&DemoConfig::default(), Draw::Points, 1);
        assert!(backend.log().iter().any(|c| matches!(
            c,
            Command::Dispatch { grid: [128, 1, 1], .. }
        )));
    }

    #[test]
    fn hundred_frames_stay_in_bounds_and_conserve_speed() {
        let cfg = DemoConfig::default();
        let (orch, _) = run(&cfg, Draw::Points, 100);
        let out = particles(&orch);

        assert_eq!(out.len(), 8192);
        for p in &out {
            assert!(p.pos.iter().all(|c| (-1.0..=1.0).contains(c)), "{p:?}");
            assert!((p.speed() - SPEED).abs() < 1e-5);
        }
    }

    #[test]
    fn long_run_reflects_at_the_border_and_conserves_speed() {
        // 600 frames is 10 s; a dominant axis moves at least SPEED/√2 and is
        // never more than 1.0 from the border, so it gets there within 5.7 s.
        let cfg = DemoConfig {
            particles: 256,
            seed: 5,
            ..DemoConfig::default()
        };
        let mut backend = SoftwareBackend::new(cfg.size.0, cfg.size.1);
        let mut orch = FrameOrchestrator::new(spec(&cfg, Draw::Points).unwrap());
        orch.on_init(&mut backend).unwrap();

        let mut prev = particles(&orch);
        let mut flipped = vec![false; prev.len()];
        for _ in 0..600 {
            assert_eq!(orch.on_frame(&mut backend, DT), FrameOutcome::Presented);
            let now = particles(&orch);

            for (i, (before, after)) in prev.iter().zip(&now).enumerate() {
                assert!((after.speed() - SPEED).abs() < 1e-5, "{after:?}");
                for axis in 0..2 {
                    let v = before.vel[axis];
                    assert!(after.pos[axis].abs() <= 1.0 + v.abs() * DT + 1e-6, "{after:?}");

                    if after.vel[axis] != v {
                        assert_eq!(after.vel[axis], -v);
                        assert!(after.pos[axis].abs() >= 1.0, "flip away from the border: {after:?}");
                        flipped[i] = true;
                    }
                }
            }
            prev = now;
        }

        assert!(flipped.iter().all(|&f| f), "some particles never reached the border");

        let mut expected = seed_particles(256, 5);
        for _ in 0..600 {
            expected.iter_mut().for_each(|p| p.step(DT));
        }
        assert_eq!(prev, expected);
    }

    #[test]
    fn compute_matches_host_stepping() {
        let cfg = DemoConfig {
            particles: 100,
            seed: 3,
            ..DemoConfig::default()
        };
        let (orch, _) = run(&cfg, Draw::Points, 10);

        let mut expected = seed_particles(100, 3);
        for _ in 0..10 {
            expected.iter_mut().for_each(|p| p.step(DT));
        }
        assert_eq!(particles(&orch), expected);
    }

    #[test]
    fn same_seed_renders_identical_frames() {
        let cfg = DemoConfig {
            particles: 300,
            seed: 11,
            ..DemoConfig::default()
        };
        let (_, a) = run(&cfg, Draw::Quads, 5);
        let (_, b) = run(&cfg, Draw::Quads, 5);
        assert_eq!(a.last_frame(), b.last_frame());
    }

    #[test]
    fn quads_draw_six_vertices_per_instance_with_resolution() {
        let cfg = DemoConfig {
            particles: 10,
            ..DemoConfig::default()
        };
        let (_, backend) = run(&cfg, Draw::Quads, 1);
        let frame = backend.last_frame().unwrap();
        assert_eq!((frame.call.count, frame.call.instances), (6, 10));

        let bytes = frame.params.as_deref().unwrap();
        let params: [f32; 3] = bytemuck::pod_read_unaligned(&bytes[..12]);
        assert_eq!(params, [800.0, 600.0, POINT_SIZE]);
    }

    #[test]
    fn zero_particles_is_rejected() {
        let cfg = DemoConfig {
            particles: 0,
            ..DemoConfig::default()
        };
        assert!(spec(&cfg, Draw::Points).is_err());
    }
}
