//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Runtime code translates platform events into `InputEvent`s (see `platform`)
//! and feeds them to a `PointerState`.

pub mod platform;

mod pointer;
mod types;

pub use pointer::{DragPhase, PointerState, ReleasePolicy};
pub use types::{InputEvent, MouseButton};
