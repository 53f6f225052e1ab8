use std::time::{Duration, Instant};

/// Smallest wall-clock delta handed out; tight loops can otherwise report 0.
pub const MIN_DT: Duration = Duration::from_micros(100);
/// Largest wall-clock delta handed out, so a stall (debugger, minimized
/// window) does not become one huge simulation step.
pub const MAX_DT: Duration = Duration::from_millis(250);

/// One clock tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick.
    pub dt: f32,
    pub now: Instant,
    /// Index of this tick, starting at 0.
    pub frame_index: u64,
}

#[derive(Debug, Clone)]
enum Pacing {
    Wall { last: Instant, min: Duration, max: Duration },
    Fixed(Duration),
}

/// Produces per-frame deltas, either from wall time (clamped) or as a fixed
/// step for headless runs and tests.
#[derive(Debug, Clone)]
pub struct FrameClock {
    pacing: Pacing,
    ticks: u64,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(MIN_DT, MAX_DT)
    }

    pub fn with_clamps(min: Duration, max: Duration) -> Self {
        debug_assert!(min <= max);
        Self {
            pacing: Pacing::Wall {
                last: Instant::now(),
                min,
                max,
            },
            ticks: 0,
        }
    }

    /// A clock that reports `step` on every tick regardless of wall time.
    pub fn fixed(step: Duration) -> Self {
        Self {
            pacing: Pacing::Fixed(step),
            ticks: 0,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.pacing, Pacing::Fixed(_))
    }

    /// Restarts the wall-clock baseline, e.g. after the window was suspended.
    pub fn reset(&mut self) {
        if let Pacing::Wall { last, .. } = &mut self.pacing {
            *last = Instant::now();
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = match &mut self.pacing {
            Pacing::Fixed(step) => *step,
            Pacing::Wall { last, min, max } => {
                let dt = now.saturating_duration_since(*last).clamp(*min, *max);
                *last = now;
                dt
            }
        };

        let frame_index = self.ticks;
        self.ticks = self.ticks.wrapping_add(1);
        FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index,
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_repeats_its_step() {
        let mut clock = FrameClock::fixed(Duration::from_secs_f64(1.0 / 60.0));
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.dt, b.dt);
        assert!((a.dt - 1.0 / 60.0).abs() < 1e-7);
        assert_eq!((a.frame_index, b.frame_index), (0, 1));
        assert!(clock.is_fixed());
    }

    #[test]
    fn stalls_are_clamped_to_the_maximum() {
        let mut clock = FrameClock::with_clamps(Duration::from_micros(1), Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        assert!((clock.tick().dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn back_to_back_ticks_get_the_minimum() {
        let mut clock = FrameClock::with_clamps(Duration::from_secs(1), Duration::from_secs(2));
        assert_eq!(clock.tick().dt, 1.0);
    }

    #[test]
    fn wall_clock_tick_stays_within_default_clamps() {
        let mut clock = FrameClock::new();
        clock.reset();
        let ft = clock.tick();
        assert!(ft.dt >= MIN_DT.as_secs_f32() && ft.dt <= MAX_DT.as_secs_f32());
        assert!(!clock.is_fixed());
    }
}
