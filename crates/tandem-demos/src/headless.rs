//! Windowless runs on the software backend.

use std::fmt;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tandem_engine::backend::SoftwareBackend;
use tandem_engine::pipeline::{DeclaredResource, FrameOrchestrator, FrameOutcome, PipelineSpec};
use tandem_engine::time::FrameClock;

use crate::variants::particles::{self, Particle};

pub const DEFAULT_FRAMES: u64 = 100;

/// Summary of the simulation state after a headless run.
#[derive(Debug, Clone, PartialEq)]
pub enum Stats {
    Particles {
        count: usize,
        min: [f32; 2],
        max: [f32; 2],
        /// Particles with a coordinate outside `[-1, 1]`.
        out_of_bounds: usize,
        mean_speed: f32,
    },
    Image {
        key: String,
        size: (u32, u32),
        /// Mean RGB in `[0, 1]`.
        mean: [f32; 3],
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub pipeline: String,
    pub presented: u64,
    pub simulated_secs: f32,
    pub stats: Vec<Stats>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: {} frames, {:.3}s simulated",
            self.pipeline, self.presented, self.simulated_secs
        )?;
        for s in &self.stats {
            match s {
                Stats::Particles {
                    count,
                    min,
                    max,
                    out_of_bounds,
                    mean_speed,
                } => writeln!(
                    f,
                    "  particles: {count}, x [{:.3}, {:.3}], y [{:.3}, {:.3}], out of bounds {out_of_bounds}, mean speed {mean_speed:.4}",
                    min[0], max[0], min[1], max[1]
                )?,
                Stats::Image { key, size, mean } => writeln!(
                    f,
                    "  {key} {}x{}: mean rgb ({:.3}, {:.3}, {:.3})",
                    size.0, size.1, mean[0], mean[1], mean[2]
                )?,
            }
        }
        Ok(())
    }
}

/// Runs `frames` frames of `spec` with a fixed 1/60 s step.
pub fn run(spec: PipelineSpec, frames: u64) -> Result<Report> {
    let (w, h) = spec.output_size;
    let mut backend = SoftwareBackend::new(w, h);
    let mut orch = FrameOrchestrator::new(spec);
    let mut clock = FrameClock::fixed(Duration::from_secs_f64(1.0 / 60.0));

    orch.on_init(&mut backend).context("failed to start headless pipeline")?;

    for _ in 0..frames {
        let dt = clock.tick().dt;
        match orch.on_frame(&mut backend, dt) {
            FrameOutcome::Presented | FrameOutcome::Skipped => {}
            FrameOutcome::Fatal | FrameOutcome::Inactive => {
                orch.on_shutdown(&mut backend);
                bail!("headless run of `{}` stopped early", orch.spec().name);
            }
        }
        for cmd in backend.take_log() {
            log::trace!("{cmd:?}");
        }
    }

    let report = Report {
        pipeline: orch.spec().name.clone(),
        presented: orch.frames_presented(),
        simulated_secs: orch.sim_time().elapsed(),
        stats: collect_stats(&orch),
    };
    orch.on_shutdown(&mut backend);
    Ok(report)
}

fn collect_stats(orch: &FrameOrchestrator<SoftwareBackend>) -> Vec<Stats> {
    let mut stats = Vec::new();
    if let Some(buf) = orch.buffer(particles::BUFFER) {
        stats.push(particle_stats(&buf.read_as::<Particle>()));
    }

    for decl in &orch.spec().resources {
        let DeclaredResource::Image(desc) = &decl.resource else {
            continue;
        };
        if !desc.storage {
            continue;
        }
        if let Some(img) = orch.image(&decl.key) {
            stats.push(Stats::Image {
                key: decl.key.clone(),
                size: img.size(),
                mean: mean_rgb(&img.read_texels()),
            });
        }
    }
    stats
}

pub fn particle_stats(particles: &[Particle]) -> Stats {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];
    let mut out_of_bounds = 0;
    let mut speed_sum = 0.0f64;

    for p in particles {
        for axis in 0..2 {
            min[axis] = min[axis].min(p.pos[axis]);
            max[axis] = max[axis].max(p.pos[axis]);
        }
        if p.pos.iter().any(|c| !(-1.0..=1.0).contains(c)) {
            out_of_bounds += 1;
        }
        speed_sum += p.speed() as f64;
    }

    let mean_speed = if particles.is_empty() {
        0.0
    } else {
        (speed_sum / particles.len() as f64) as f32
    };
    Stats::Particles {
        count: particles.len(),
        min,
        max,
        out_of_bounds,
        mean_speed,
    }
}

/// Mean of the RGB channels of RGBA8 texels.
pub fn mean_rgb(texels: &[u8]) -> [f32; 3] {
    let mut sum = [0u64; 3];
    let mut n = 0u64;
    for t in texels.chunks_exact(4) {
        for c in 0..3 {
            sum[c] += t[c] as u64;
        }
        n += 1;
    }
    if n == 0 {
        return [0.0; 3];
    }
    sum.map(|s| s as f32 / (n as f32 * 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Variant;
    use crate::variants::{self, DemoConfig};

    #[test]
    fn particle_run_reports_bounds_and_speed() {
        let spec = variants::build(Variant::Particles, &DemoConfig::default()).unwrap();
        let report = run(spec, DEFAULT_FRAMES).unwrap();

        assert_eq!(report.presented, 100);
        assert!((report.simulated_secs - 100.0 / 60.0).abs() < 1e-3);
        let Some(Stats::Particles { count, out_of_bounds, mean_speed, .. }) = report.stats.first() else {
            panic!("no particle stats: {report:?}");
        };
        assert_eq!(*count, 8192);
        assert_eq!(*out_of_bounds, 0);
        assert!((mean_speed - 0.25).abs() < 1e-4);
    }

    #[test]
    fn noise_run_reports_image_mean() {
        let cfg = DemoConfig {
            size: (64, 64),
            ..DemoConfig::default()
        };
        let report = run(variants::build(Variant::Noise, &cfg).unwrap(), 2).unwrap();
        let Some(Stats::Image { size, mean, .. }) = report.stats.first() else {
            panic!("no image stats: {report:?}");
        };
        assert_eq!(*size, (64, 64));
        // uniform noise centers on one half
        assert!(mean.iter().all(|m| (0.4..0.6).contains(m)), "{mean:?}");
    }

    #[test]
    fn render_only_run_has_no_stats() {
        let report = run(variants::build(Variant::Triangle, &DemoConfig::default()).unwrap(), 3).unwrap();
        assert_eq!(report.presented, 3);
        assert!(report.stats.is_empty());
        assert!(report.to_string().starts_with("triangle: 3 frames"));
    }

    #[test]
    fn stats_flag_escaped_particles() {
        let ps = [
            Particle { pos: [0.5, 0.5], vel: [0.0, 0.25], color: [1.0; 4] },
            Particle { pos: [1.01, -0.2], vel: [-0.25, 0.0], color: [1.0; 4] },
        ];
        let Stats::Particles { out_of_bounds, min, max, .. } = particle_stats(&ps) else {
            unreachable!()
        };
        assert_eq!(out_of_bounds, 1);
        assert_eq!(min, [0.5, -0.2]);
        assert_eq!(max, [1.01, 0.5]);
    }

    #[test]
    fn mean_rgb_ignores_alpha() {
        assert_eq!(mean_rgb(&[255, 0, 51, 7, 255, 0, 51, 200]), [1.0, 0.0, 0.2]);
        assert_eq!(mean_rgb(&[]), [0.0; 3]);
    }
}
