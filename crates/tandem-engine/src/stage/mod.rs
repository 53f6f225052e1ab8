//! Compute and render stages.
//!
//! Stage descriptors are plain data; `ComputeStage` and `RenderStage` are the
//! per-frame entry points built from them once the registry has created the
//! pipelines. Shader conventions: `@group(0)` holds the manifest bindings at
//! their slot numbers, `@group(1) @binding(0)` the parameter block.

mod compute;
mod desc;
mod render;
mod shader;

pub use compute::{workgroup_grid, ComputeDone, ComputeStage};
pub use desc::{BindingDecl, BindingKind, ComputeStageDesc, RenderStageDesc, VertexBufferDecl};
pub use render::{DrawCall, RenderStage};
pub use shader::{declared_workgroup_size, ShaderCode, ShaderSet};
pub(crate) use shader::check_local_size;
