//! Raymarched scenes rendered by compute into a storage image and shown on a
//! fullscreen quad generated from the vertex index.

use anyhow::Result;
use bytemuck::{Pod, Zeroable};
use tandem_engine::backend::KernelCtx;
use tandem_engine::params::{ParamKind, ParamLayout, ParamSource};
use tandem_engine::pipeline::PipelineSpec;
use tandem_engine::registry::{ImageDesc, ImageFormat};
use tandem_engine::stage::{BindingDecl, ComputeStageDesc, RenderStageDesc, ShaderSet};

use super::noise::unorm8;
use super::{display_sampler, DemoConfig};

const COMPUTE_SHADER: &str = include_str!("../../shaders/raymarch_compute.wgsl");
const DISPLAY_SHADER: &str = include_str!("../../shaders/fullscreen.wgsl");

/// File under the shader directory read when the mouse variant starts.
pub const MOUSE_SHADER_FILE: &str = "raymarch_mouse.wgsl";

pub const LOCAL_SIZE: [u32; 3] = [8, 8, 1];

const IMAGE: &str = "scene image";

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SceneParams {
    time: f32,
    _pad: f32,
    img_size: [f32; 2],
}

type Vec3 = [f32; 3];

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn normalize(a: Vec3) -> Vec3 {
    scale(a, 1.0 / dot(a, a).sqrt())
}

fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Ray/sphere entry distance, or `-1` on a miss. `sph` is center + radius.
fn hit_sphere(ro: Vec3, rd: Vec3, sph: [f32; 4]) -> f32 {
    let oc = sub(ro, [sph[0], sph[1], sph[2]]);
    let b = 2.0 * dot(oc, rd);
    let c = dot(oc, oc) - sph[3] * sph[3];
    let h = b * b - 4.0 * c;
    if h < 0.0 {
        return -1.0;
    }
    (-b - h.sqrt()) / 2.0
}

/// Shades pixel `(x, y)` of a `size` image: a unit sphere orbiting above the
/// `y = 0` plane, which carries its contact shadow.
pub fn scene_texel(x: u32, y: u32, size: [f32; 2], time: f32) -> [f32; 4] {
    let light = normalize([0.57, 0.57, 0.57]);
    let sph = [0.5 * time.cos(), 1.0, 0.5 * time.sin(), 1.0];

    let u = x as f32 / size[0];
    let v = 1.0 - y as f32 / size[1];
    let aspect = size[0] / size[1];

    let ro = [0.0, 0.5, 3.0];
    let rd = normalize([(-1.0 + 2.0 * u) * aspect, -1.0 + 2.0 * v, -1.0]);

    let mut t = 1000.0;
    let mut hit = None;
    let t_sph = hit_sphere(ro, rd, sph);
    if t_sph > 0.0 {
        hit = Some(Surface::Sphere);
        t = t_sph;
    }
    let t_pla = -ro[1] / rd[1];
    if t_pla > 0.0 && t_pla < t {
        hit = Some(Surface::Plane);
        t = t_pla;
    }

    let pos = add(ro, scale(rd, t));
    let color = match hit {
        Some(Surface::Sphere) => {
            let nor = scale(sub(pos, [sph[0], sph[1], sph[2]]), 1.0 / sph[3]);
            let dif = dot(nor, light).clamp(0.0, 1.0);
            let ao = 0.5 + 0.5 * nor[1];
            add(scale([1.0, 0.8, 0.6], dif * ao), scale([0.5, 0.6, 0.7], ao))
        }
        Some(Surface::Plane) => {
            let dx = pos[0] - sph[0];
            let dz = pos[2] - sph[2];
            let amb = smoothstep(0.0, 2.0 * sph[3], dx.hypot(dz));
            [amb * 0.7; 3]
        }
        None => [0.0; 3],
    };
    [color[0], color[1], color[2], 1.0]
}

#[derive(Debug, Copy, Clone)]
enum Surface {
    Sphere,
    Plane,
}

fn scene_kernel(ctx: &mut KernelCtx<'_>) {
    let Some(params) = ctx.params_as::<SceneParams>() else {
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
        img.put_rgba8(x, y, scene_texel(x, y, params.img_size, params.time).map(unorm8));
    }
}

fn display_stage(label: &str, cfg: &DemoConfig) -> RenderStageDesc {
    RenderStageDesc::new(label, ShaderSet::wgsl(DISPLAY_SHADER))
        .bind(BindingDecl::sampled_image(0, IMAGE))
        .bind(BindingDecl::sampler(1, "sampler"))
        .draw(6, 1)
        .clear_color(cfg.clear)
}

fn image_spec(name: &str, cfg: &DemoConfig, compute: ComputeStageDesc) -> PipelineSpec {
    let (w, h) = cfg.size;
    PipelineSpec::new(name, cfg.size, display_stage(&format!("{name} display"), cfg))
        .image(IMAGE, ImageDesc::storage_target(IMAGE, w, h, ImageFormat::Rgba8Unorm))
        .sampler("sampler", display_sampler())
        .compute(compute.target(0, IMAGE).local_size(LOCAL_SIZE).problem_size([w, h, 1]))
}

/// Analytic sphere over a plane, animated by accumulated time.
pub fn spec(cfg: &DemoConfig) -> Result<PipelineSpec> {
    let params = ParamLayout::builder()
        .field("time", ParamKind::F32, ParamSource::Elapsed)
        .field("img_size", ParamKind::Vec2, ParamSource::Resolution)
        .build()?;

    let compute = ComputeStageDesc::new("raymarch", ShaderSet::wgsl(COMPUTE_SHADER).with_host(scene_kernel))
        .params(params);
    Ok(image_spec("raymarch", cfg, compute))
}

/// SDF raymarcher with an orbit camera following the pointer.
///
/// The shader is read from `cfg.shader_dir` during pipeline creation and has
/// no host kernel, so this variant needs the wgpu backend.
pub fn mouse_spec(cfg: &DemoConfig) -> Result<PipelineSpec> {
    let params = ParamLayout::builder()
        .field("iTime", ParamKind::Vec2, ParamSource::ElapsedDelta)
        .field("iResolution", ParamKind::Vec2, ParamSource::Resolution)
        .field("iMouse", ParamKind::Vec4, ParamSource::Pointer)
        .build()?;

    let shader = ShaderSet::wgsl_file(cfg.shader_dir.join(MOUSE_SHADER_FILE));
    let compute = ComputeStageDesc::new("raymarch-mouse", shader).params(params);
    Ok(image_spec("raymarch-mouse", cfg, compute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_engine::backend::SoftwareBackend;
    use tandem_engine::pipeline::FrameOrchestrator;
    use tandem_engine::registry::RegistryError;
    use tandem_engine::stage::{declared_workgroup_size, ShaderCode};

    const SIZE: [f32; 2] = [800.0, 600.0];

    // ── scene ──────────────────────────────────────────────────────────────

    #[test]
    fn top_of_frame_is_background() {
        assert_eq!(scene_texel(0, 0, SIZE, 0.0), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn center_ray_hits_the_sphere() {
        // Facing away from the light: only the sky-tinted occlusion term remains.
        let c = scene_texel(400, 300, SIZE, 0.0);
        assert!(c[0] > 0.0 && c[0] < c[1] && c[1] < c[2], "{c:?}");
    }

    #[test]
    fn floor_is_grey_and_bounded() {
        let near = scene_texel(400, 599, SIZE, 0.0);
        let far = scene_texel(0, 599, SIZE, 0.0);
        assert_eq!(near[0], near[1]);
        assert_eq!(near[1], near[2]);
        assert!(far[0] >= near[0]);
        assert!(far[0] <= 0.7 + 1e-6);
    }

    #[test]
    fn sphere_orbits_with_time() {
        assert_ne!(scene_texel(300, 300, SIZE, 0.0), scene_texel(300, 300, SIZE, 2.0));
    }

    // ── pipeline ───────────────────────────────────────────────────────────

    #[test]
    fn compute_image_matches_host_scene() {
        let cfg = DemoConfig {
            size: (32, 24),
            ..DemoConfig::default()
        };
        let mut backend = SoftwareBackend::new(32, 24);
        let mut orch = FrameOrchestrator::new(spec(&cfg).unwrap());
        orch.on_init(&mut backend).unwrap();
        orch.on_frame(&mut backend, 0.5);

        let texels = orch.image(IMAGE).unwrap().read_texels();
        let (x, y) = (16u32, 12u32);
        let at = ((y * 32 + x) * 4) as usize;
        let expected = scene_texel(x, y, [32.0, 24.0], 0.5).map(unorm8);
        assert_eq!(&texels[at..at + 4], &expected);
    }

    #[test]
    fn mouse_shader_loads_from_the_shader_dir() {
        let spec = mouse_spec(&DemoConfig::default()).unwrap();
        let compute = spec.compute.as_ref().unwrap();
        let code = compute.shader.wgsl.as_ref().unwrap();
        assert!(matches!(code, ShaderCode::File(p) if p.ends_with(MOUSE_SHADER_FILE)));

        let source = code.load().unwrap();
        assert_eq!(declared_workgroup_size("raymarch-mouse", &source, "cs_main").unwrap(), LOCAL_SIZE);
        assert!(source.contains("iMouse: vec4<f32>"));
    }

    #[test]
    fn mouse_params_follow_shadertoy_order() {
        let spec = mouse_spec(&DemoConfig::default()).unwrap();
        let layout = spec.compute.as_ref().unwrap().params.as_ref().unwrap();
        let offsets: Vec<u32> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(layout.size(), 32);
    }

    fn init_error(spec: PipelineSpec) -> anyhow::Error {
        let mut backend = SoftwareBackend::new(8, 8);
        let mut orch = FrameOrchestrator::new(spec);
        let err = orch.on_init(&mut backend).unwrap_err();
        orch.on_shutdown(&mut backend);
        err
    }

    fn is_unreadable_file(err: &anyhow::Error) -> bool {
        err.chain()
            .any(|e| matches!(e.downcast_ref::<RegistryError>(), Some(RegistryError::ShaderFile { .. })))
    }

    #[test]
    fn missing_shader_dir_fails_at_init_naming_the_file() {
        let cfg = DemoConfig {
            shader_dir: "/no/such/dir".into(),
            ..DemoConfig::default()
        };
        let err = init_error(mouse_spec(&cfg).unwrap());
        assert!(is_unreadable_file(&err), "{err:#}");
        assert!(format!("{err:#}").contains("/no/such/dir/raymarch_mouse.wgsl"), "{err:#}");
    }

    #[test]
    fn unreadable_shader_fails_even_with_a_host_kernel() {
        let params = ParamLayout::builder()
            .field("time", ParamKind::F32, ParamSource::Elapsed)
            .field("img_size", ParamKind::Vec2, ParamSource::Resolution)
            .build()
            .unwrap();
        let shader = ShaderSet::wgsl_file("/no/such/dir/raymarch_compute.wgsl").with_host(scene_kernel);
        let compute = ComputeStageDesc::new("raymarch", shader).params(params);
        let cfg = DemoConfig {
            size: (8, 8),
            ..DemoConfig::default()
        };

        let err = init_error(image_spec("raymarch", &cfg, compute));
        assert!(is_unreadable_file(&err), "{err:#}");
        assert!(format!("{err:#}").contains("/no/such/dir/raymarch_compute.wgsl"));
    }

    #[test]
    fn bundled_shaders_declare_the_local_size() {
        let mouse = std::fs::read_to_string(DemoConfig::default().shader_dir.join(MOUSE_SHADER_FILE)).unwrap();
        let sources = [
            COMPUTE_SHADER,
            include_str!("../../shaders/noise_compute.wgsl"),
            mouse.as_str(),
        ];
        for src in sources {
            assert_eq!(declared_workgroup_size("bundled", src, "cs_main").unwrap(), LOCAL_SIZE);
        }
    }
}
