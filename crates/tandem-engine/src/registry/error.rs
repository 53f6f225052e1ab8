use std::path::PathBuf;

/// Errors raised while creating backend objects.
///
/// Every variant is a startup configuration error: the run cannot continue.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid {kind} descriptor `{label}`: {reason}")]
    InvalidDescriptor {
        kind: &'static str,
        label: String,
        reason: String,
    },

    #[error("unknown {kind} handle #{index}")]
    UnknownHandle { kind: &'static str, index: u32 },

    #[error("stage `{stage}` binds slot {slot} more than once")]
    SlotConflict { stage: String, slot: u32 },

    #[error("stage `{stage}` binds the same {kind} at slots {first} and {second}")]
    AliasedBinding {
        stage: String,
        kind: &'static str,
        first: u32,
        second: u32,
    },

    #[error("stage `{stage}` has no shader artifact for the {backend} backend")]
    MissingShader { stage: String, backend: &'static str },

    #[error("failed to read shader file {}", .path.display())]
    ShaderFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader for `{stage}` declares @workgroup_size{declared:?} but the stage dispatches with {expected:?}")]
    WorkgroupMismatch {
        stage: String,
        declared: [u32; 3],
        expected: [u32; 3],
    },

    #[error("stage `{stage}` has no compute entry point `{entry}`")]
    MissingEntryPoint { stage: String, entry: String },

    #[error("shader compilation failed for `{label}`: {message}")]
    ShaderCompile { label: String, message: String },

    #[error("resource registry was already destroyed")]
    Destroyed,
}

impl RegistryError {
    pub(crate) fn invalid(kind: &'static str, label: &str, reason: impl Into<String>) -> Self {
        RegistryError::InvalidDescriptor {
            kind,
            label: label.to_string(),
            reason: reason.into(),
        }
    }
}
