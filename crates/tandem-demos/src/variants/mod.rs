//! Demo pipelines expressed as `PipelineSpec` data.
//!
//! Every variant runs through the same orchestrator; they differ only in the
//! resources they declare and the stages that read and write them.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tandem_engine::color::ColorRgba;
use tandem_engine::input::ReleasePolicy;
use tandem_engine::pipeline::PipelineSpec;
use tandem_engine::registry::SamplerDesc;

use crate::cli::{Cli, Variant};

pub mod noise;
pub mod particles;
pub mod raymarch;
pub mod triangle;

/// Startup values shared by all variants.
#[derive(Debug, Clone)]
pub struct DemoConfig {
    /// Output size in pixels; also the size of compute-written images.
    pub size: (u32, u32),
    pub clear: ColorRgba,
    pub particles: u32,
    pub seed: u64,
    pub shader_dir: PathBuf,
    pub release_policy: ReleasePolicy,
}

impl DemoConfig {
    pub fn from_cli(cli: &Cli) -> Self {
        let seed = cli.seed.unwrap_or_else(wall_clock_seed);
        Self {
            size: (cli.width, cli.height),
            clear: cli.clear,
            particles: cli.particles,
            seed,
            shader_dir: cli.shader_dir.clone(),
            release_policy: if cli.latch_buttons {
                ReleasePolicy::Latch
            } else {
                ReleasePolicy::Clear
            },
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            size: (800, 600),
            clear: ColorRgba::new(0.2, 0.3, 0.3, 1.0),
            particles: 8192,
            seed: 0,
            shader_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders")),
            release_policy: ReleasePolicy::Clear,
        }
    }
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Builds the pipeline for `variant`.
pub fn build(variant: Variant, cfg: &DemoConfig) -> Result<PipelineSpec> {
    let spec = match variant {
        Variant::Triangle => triangle::spec(cfg),
        Variant::Particles => particles::spec(cfg, particles::Draw::Points)?,
        Variant::ParticleQuads => particles::spec(cfg, particles::Draw::Quads)?,
        Variant::Noise => noise::spec(cfg)?,
        Variant::Raymarch => raymarch::spec(cfg)?,
        Variant::RaymarchMouse => raymarch::mouse_spec(cfg)?,
    };
    Ok(spec.release_policy(cfg.release_policy))
}

/// Linear sampler shared by the image-display variants.
pub(crate) fn display_sampler() -> SamplerDesc {
    SamplerDesc::linear("display sampler")
}
