/// Straight-alpha linear RGBA color, used for surface clears.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn black() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Parses `"r,g,b"` or `"r,g,b,a"` with components in `[0, 1]`.
    ///
    /// Missing alpha defaults to `1.0`. Components are clamped.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f32> = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;

        let c = |v: f32| v.clamp(0.0, 1.0);
        match parts.as_slice() {
            [r, g, b] => Some(Self::new(c(*r), c(*g), c(*b), 1.0)),
            [r, g, b, a] => Some(Self::new(c(*r), c(*g), c(*b), c(*a))),
            _ => None,
        }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
            a: self.a as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── parse ──────────────────────────────────────────────────────────────

    #[test]
    fn parse_rgb_defaults_alpha() {
        assert_eq!(ColorRgba::parse("0.2,0.3,0.3"), Some(ColorRgba::new(0.2, 0.3, 0.3, 1.0)));
    }

    #[test]
    fn parse_rgba_with_spaces() {
        assert_eq!(ColorRgba::parse(" 1, 0 ,0.5, 0.25"), Some(ColorRgba::new(1.0, 0.0, 0.5, 0.25)));
    }

    #[test]
    fn parse_clamps_components() {
        assert_eq!(ColorRgba::parse("2,-1,0.5"), Some(ColorRgba::new(1.0, 0.0, 0.5, 1.0)));
    }

    #[test]
    fn parse_rejects_wrong_arity_and_garbage() {
        assert_eq!(ColorRgba::parse("1,2"), None);
        assert_eq!(ColorRgba::parse("1,2,3,4,5"), None);
        assert_eq!(ColorRgba::parse("red,0,0"), None);
    }
}
