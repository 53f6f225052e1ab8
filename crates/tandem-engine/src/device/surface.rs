use winit::dpi::PhysicalSize;

use super::OutputEncoding;

/// What the frame loop does after the surface failed to hand out a texture.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceRecovery {
    /// The surface was reconfigured; the next frame can try again.
    Reconfigured,
    /// Transient; drop this frame only.
    SkipFrame,
    /// Out of memory; end the run.
    Fatal,
}

impl SurfaceRecovery {
    pub(crate) fn for_error(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => SurfaceRecovery::Reconfigured,
            wgpu::SurfaceError::OutOfMemory => SurfaceRecovery::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => SurfaceRecovery::SkipFrame,
        }
    }
}

/// Picks the surface format for `encoding`, falling back to whatever the
/// surface lists first.
pub(crate) fn pick_format(formats: &[wgpu::TextureFormat], encoding: OutputEncoding) -> Option<wgpu::TextureFormat> {
    use wgpu::TextureFormat as F;

    let wanted = match encoding {
        OutputEncoding::Linear => [F::Bgra8Unorm, F::Rgba8Unorm],
        OutputEncoding::Srgb => [F::Bgra8UnormSrgb, F::Rgba8UnormSrgb],
    };
    wanted
        .into_iter()
        .find(|f| formats.contains(f))
        .or_else(|| formats.first().copied())
}

pub(crate) fn pick_alpha_mode(
    modes: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    match requested {
        Some(m) if modes.contains(&m) => m,
        _ => modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
    }
}

/// Whether the surface can be configured at `size`; wgpu rejects zero extents.
pub(crate) fn is_drawable(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgpu::{CompositeAlphaMode as Alpha, TextureFormat as Fmt};

    // ── format ─────────────────────────────────────────────────────────────

    #[test]
    fn srgb_encoding_picks_srgb_when_present() {
        let formats = [Fmt::Bgra8Unorm, Fmt::Bgra8UnormSrgb];
        assert_eq!(pick_format(&formats, OutputEncoding::Srgb), Some(Fmt::Bgra8UnormSrgb));
    }

    #[test]
    fn linear_encoding_avoids_srgb() {
        let formats = [Fmt::Bgra8UnormSrgb, Fmt::Rgba8Unorm];
        assert_eq!(pick_format(&formats, OutputEncoding::Linear), Some(Fmt::Rgba8Unorm));
    }

    #[test]
    fn falls_back_to_first_format() {
        assert_eq!(pick_format(&[Fmt::Rgba16Float], OutputEncoding::Srgb), Some(Fmt::Rgba16Float));
        assert_eq!(pick_format(&[], OutputEncoding::Linear), None);
    }

    // ── alpha ──────────────────────────────────────────────────────────────

    #[test]
    fn unsupported_alpha_request_falls_back() {
        let modes = [Alpha::Opaque, Alpha::PreMultiplied];
        assert_eq!(pick_alpha_mode(&modes, Some(Alpha::PostMultiplied)), Alpha::Opaque);
        assert_eq!(pick_alpha_mode(&modes, Some(Alpha::PreMultiplied)), Alpha::PreMultiplied);
        assert_eq!(pick_alpha_mode(&[], None), Alpha::Auto);
    }

    // ── recovery ───────────────────────────────────────────────────────────

    #[test]
    fn surface_errors_map_to_recovery() {
        use wgpu::SurfaceError as E;
        assert_eq!(SurfaceRecovery::for_error(&E::Lost), SurfaceRecovery::Reconfigured);
        assert_eq!(SurfaceRecovery::for_error(&E::Outdated), SurfaceRecovery::Reconfigured);
        assert_eq!(SurfaceRecovery::for_error(&E::OutOfMemory), SurfaceRecovery::Fatal);
        assert_eq!(SurfaceRecovery::for_error(&E::Timeout), SurfaceRecovery::SkipFrame);
        assert_eq!(SurfaceRecovery::for_error(&E::Other), SurfaceRecovery::SkipFrame);
    }

    #[test]
    fn zero_extent_is_not_drawable() {
        assert!(is_drawable(PhysicalSize::new(800, 600)));
        assert!(!is_drawable(PhysicalSize::new(0, 600)));
        assert!(!is_drawable(PhysicalSize::new(800, 0)));
    }
}
