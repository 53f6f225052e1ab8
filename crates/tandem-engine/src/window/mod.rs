//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the GPU backend and
//! the frame orchestrator.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
