/// How the render stage's output values are encoded on the surface.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum OutputEncoding {
    /// Shader output is written as is; no sRGB conversion on store.
    #[default]
    Linear,
    /// The surface converts linear shader output to sRGB.
    Srgb,
}

/// Device and surface options for the wgpu backend.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub encoding: OutputEncoding,

    /// FIFO presentation when set, otherwise the lowest-latency supported mode.
    pub vsync: bool,

    pub power: wgpu::PowerPreference,

    /// Requested alpha mode; an unsupported request falls back to the first
    /// mode the surface reports.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub features: wgpu::Features,
    pub limits: wgpu::Limits,

    /// Hint only; backends may ignore it.
    pub frame_latency: u32,
}

impl GpuInit {
    /// Options for pipelines whose shaders write final colors directly.
    pub fn linear_output() -> Self {
        Self::default()
    }

    pub fn with_encoding(mut self, encoding: OutputEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub(crate) fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            encoding: OutputEncoding::Linear,
            vsync: true,
            power: wgpu::PowerPreference::HighPerformance,
            alpha_mode: None,
            features: wgpu::Features::empty(),
            limits: wgpu::Limits::default(),
            frame_latency: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_linear_and_paced() {
        let init = GpuInit::linear_output();
        assert_eq!(init.encoding, OutputEncoding::Linear);
        assert_eq!(init.present_mode(), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn vsync_off_uncaps_presentation() {
        let init = GpuInit::default().with_vsync(false).with_encoding(OutputEncoding::Srgb);
        assert_eq!(init.present_mode(), wgpu::PresentMode::AutoNoVsync);
        assert_eq!(init.encoding, OutputEncoding::Srgb);
    }
}
