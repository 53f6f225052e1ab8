use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tandem_engine::color::ColorRgba;

/// Compute-to-render demos on the tandem frame pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "tandem-demos", version, about)]
pub struct Cli {
    /// Which pipeline to run
    #[arg(value_enum)]
    pub variant: Variant,

    /// Output width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Particle count for the particle variants
    #[arg(long, default_value_t = 8192)]
    pub particles: u32,

    /// RNG seed for particle placement (defaults to wall-clock time)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory holding WGSL files loaded at startup
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders"))]
    pub shader_dir: PathBuf,

    /// Clear color as `r,g,b` or `r,g,b,a`
    #[arg(long, value_parser = parse_color, default_value = "0.2,0.3,0.3,1.0")]
    pub clear: ColorRgba,

    /// Keep pointer button flags set after release
    #[arg(long)]
    pub latch_buttons: bool,

    /// Run on the software backend without a window
    #[arg(long)]
    pub headless: bool,

    /// Stop after this many presented frames (headless default: 100)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Variant {
    /// Render-only colored triangle
    Triangle,
    /// Bouncing particles drawn as points
    Particles,
    /// Bouncing particles drawn as instanced quads
    ParticleQuads,
    /// Animated hash noise written to a storage image
    Noise,
    /// Analytic sphere over a plane
    Raymarch,
    /// SDF raymarcher with a mouse-driven camera, loaded from disk
    RaymarchMouse,
}

impl Variant {
    pub fn name(self) -> &'static str {
        match self {
            Variant::Triangle => "triangle",
            Variant::Particles => "particles",
            Variant::ParticleQuads => "particle-quads",
            Variant::Noise => "noise",
            Variant::Raymarch => "raymarch",
            Variant::RaymarchMouse => "raymarch-mouse",
        }
    }
}

fn parse_color(s: &str) -> Result<ColorRgba, String> {
    ColorRgba::parse(s).ok_or_else(|| format!("expected `r,g,b` or `r,g,b,a`, got `{s}`"))
}
