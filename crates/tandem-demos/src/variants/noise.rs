//! Animated hash noise written by compute into a storage image, shown through
//! an indexed textured quad.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use tandem_engine::backend::KernelCtx;
use tandem_engine::params::{ParamKind, ParamLayout, ParamSource};
use tandem_engine::pipeline::PipelineSpec;
use tandem_engine::registry::{BufferDesc, ImageDesc, ImageFormat, VertexFormat, VertexLayout};
use tandem_engine::stage::{BindingDecl, ComputeStageDesc, RenderStageDesc, ShaderSet};

use super::{display_sampler, DemoConfig};

const COMPUTE_SHADER: &str = include_str!("../../shaders/noise_compute.wgsl");
const DISPLAY_SHADER: &str = include_str!("../../shaders/display_quad.wgsl");

pub const LOCAL_SIZE: [u32; 3] = [8, 8, 1];

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

pub const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [-1.0, -1.0, 0.0], uv: [0.0, 1.0] },
    QuadVertex { pos: [1.0, -1.0, 0.0], uv: [1.0, 1.0] },
    QuadVertex { pos: [1.0, 1.0, 0.0], uv: [1.0, 0.0] },
    QuadVertex { pos: [-1.0, 1.0, 0.0], uv: [0.0, 0.0] },
];

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

/// Host mirror of `{ time: f32, img_size: vec2<f32> }`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct NoiseParams {
    time: f32,
    _pad: f32,
    img_size: [f32; 2],
}

fn fract(v: f32) -> f32 {
    v - v.floor()
}

/// Hash without sine: maps a 2D point to `[0, 1)`.
pub fn hash12(p: [f32; 2]) -> f32 {
    let mut p3 = [fract(p[0] * 0.1031), fract(p[1] * 0.1031), fract(p[0] * 0.1031)];
    let d = p3[0] * (p3[1] + 33.33) + p3[1] * (p3[2] + 33.33) + p3[2] * (p3[0] + 33.33);
    for c in &mut p3 {
        *c += d;
    }
    fract((p3[0] + p3[1]) * p3[2])
}

/// Noise color of texel `(x, y)` at `time` seconds.
pub fn noise_texel(x: u32, y: u32, time: f32) -> [f32; 4] {
    let p = [x as f32 + time, y as f32 + time];
    [
        hash12(p),
        hash12([p[0] + 0.1, p[1] + 0.1]),
        hash12([p[0] + 0.2, p[1] + 0.2]),
        1.0,
    ]
}

pub(crate) fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn noise_kernel(ctx: &mut KernelCtx<'_>) {
    let Some(params) = ctx.params_as::<NoiseParams>() else {
        return;
    };
    let ids = ctx.invocations();
    let Some(mut img) = ctx.storage_image(0) else {
        return;
    };

    let [w, h] = params.img_size;
    for [x, y, _] in ids {
        if x as f32 >= w || y as f32 >= h {
            continue;
        }
        img.put_rgba8(x, y, noise_texel(x, y, params.time).map(unorm8));
    }
}

pub fn spec(cfg: &DemoConfig) -> Result<PipelineSpec> {
    let (w, h) = cfg.size;
    let params = ParamLayout::builder()
        .field("time", ParamKind::F32, ParamSource::Elapsed)
        .field("img_size", ParamKind::Vec2, ParamSource::Resolution)
        .build()?;

    let compute = ComputeStageDesc::new("noise", ShaderSet::wgsl(COMPUTE_SHADER).with_host(noise_kernel))
        .target(0, "noise image")
        .params(params)
        .local_size(LOCAL_SIZE)
        .problem_size([w, h, 1]);

    let render = RenderStageDesc::new("noise display", ShaderSet::wgsl(DISPLAY_SHADER))
        .bind(BindingDecl::sampled_image(0, "noise image"))
        .bind(BindingDecl::sampler(1, "sampler"))
        .vertex_buffer(
            "quad vertices",
            VertexLayout::packed(&[VertexFormat::Float32x3, VertexFormat::Float32x2]),
        )
        .index_buffer("quad indices")
        .draw(QUAD_INDICES.len() as u32, 1)
        .clear_color(cfg.clear);

    Ok(PipelineSpec::new("noise", cfg.size, render)
        .image(
            "noise image",
            ImageDesc::storage_target("noise image", w, h, ImageFormat::Rgba8Unorm),
        )
        .sampler("sampler", display_sampler())
        .buffer("quad vertices", BufferDesc::vertex("quad vertices", &QUAD_VERTICES))
        .buffer("quad indices", BufferDesc::index_u32("quad indices", &QUAD_INDICES))
        .compute(compute))
}
