use bytemuck::{Pod, Zeroable};
use tandem_engine::pipeline::PipelineSpec;
use tandem_engine::registry::{BufferDesc, VertexFormat, VertexLayout};
use tandem_engine::stage::{RenderStageDesc, ShaderSet};

use super::DemoConfig;

const SHADER: &str = include_str!("../../shaders/triangle.wgsl");

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub pos: [f32; 3],
    pub color: [f32; 4],
}

pub const VERTICES: [ColorVertex; 3] = [
    ColorVertex { pos: [0.0, 0.5, 0.5], color: [1.0, 0.0, 0.0, 1.0] },
    ColorVertex { pos: [0.5, -0.5, 0.5], color: [0.0, 1.0, 0.0, 1.0] },
    ColorVertex { pos: [-0.5, -0.5, 0.5], color: [0.0, 0.0, 1.0, 1.0] },
];

/// Render-only pipeline: no compute stage, one immutable vertex buffer.
pub fn spec(cfg: &DemoConfig) -> PipelineSpec {
    let layout = VertexLayout::packed(&[VertexFormat::Float32x3, VertexFormat::Float32x4]);

    PipelineSpec::new(
        "triangle",
        cfg.size,
        RenderStageDesc::new("triangle", ShaderSet::wgsl(SHADER))
            .vertex_buffer("vertices", layout)
            .draw(3, 1)
            .clear_color(cfg.clear),
    )
    .buffer("vertices", BufferDesc::vertex("triangle vertices", &VERTICES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_engine::backend::{Command, SoftwareBackend};
    use tandem_engine::pipeline::{FrameOrchestrator, FrameOutcome};

    #[test]
    fn vertex_layout_is_position_then_color() {
        let spec = spec(&DemoConfig::default());
        let layout = &spec.render.vertex_buffers[0].layout;
        assert_eq!(layout.stride, 28);
        assert_eq!(layout.attributes[1].offset, 12);
        assert_eq!(std::mem::size_of::<ColorVertex>(), 28);
    }

    #[test]
    fn frames_have_no_dispatch() {
        let mut backend = SoftwareBackend::new(800, 600);
        let mut orch = FrameOrchestrator::new(spec(&DemoConfig::default()));
        orch.on_init(&mut backend).unwrap();

        assert_eq!(orch.on_frame(&mut backend, 0.016), FrameOutcome::Presented);
        assert!(!backend.log().iter().any(|c| matches!(c, Command::Dispatch { .. })));

        let frame = backend.last_frame().unwrap();
        assert_eq!(frame.bytes, bytemuck::cast_slice::<_, u8>(&VERTICES));
    }
}
