//! Time subsystem.
//!
//! Provides stable, testable frame timing utilities without coupling to the runtime.
//! Intended usage:
//! - one `FrameClock` per window (or per headless loop); `tick()` once per frame
//! - the orchestrator folds each tick's delta into its `SimTime`

mod frame_clock;
mod sim;

pub use frame_clock::{FrameClock, FrameTime};
pub use sim::SimTime;
