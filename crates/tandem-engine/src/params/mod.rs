//! Parameter blocks.
//!
//! A parameter block is a small fixed-size record mirrored byte-for-byte between
//! host and shader. `ParamLayout` fixes the field order and offsets once (WGSL
//! uniform alignment); `ParamBlock` holds the marshaled bytes rebuilt every frame
//! from `ParamInputs`.

mod block;
mod layout;
mod source;

pub use block::ParamBlock;
pub use layout::{LayoutError, ParamField, ParamKind, ParamLayout, ParamLayoutBuilder};
pub use source::{ParamInputs, ParamSource, ParamValue};
