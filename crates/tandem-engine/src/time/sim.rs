/// Simulation time fed into parameter blocks.
///
/// Elapsed time accumulates in `f64` so long runs keep sub-millisecond
/// resolution; shaders receive it as `f32`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct SimTime {
    elapsed: f64,
    delta: f32,
    frame: u64,
}

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `dt` seconds and records it as the latest delta.
    pub fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.elapsed += dt as f64;
        self.delta = dt;
        self.frame += 1;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed as f32
    }

    pub fn delta(&self) -> f32 {
        self.delta
    }

    /// Number of `advance` calls so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_keeps_last_delta() {
        let mut t = SimTime::new();
        for _ in 0..60 {
            t.advance(1.0 / 60.0);
        }
        assert!((t.elapsed() - 1.0).abs() < 1e-5);
        assert_eq!(t.delta(), 1.0 / 60.0);
        assert_eq!(t.frame(), 60);
    }

    #[test]
    fn negative_delta_is_treated_as_zero() {
        let mut t = SimTime::new();
        t.advance(-1.0);
        assert_eq!(t.elapsed(), 0.0);
        assert_eq!(t.delta(), 0.0);
    }
}
