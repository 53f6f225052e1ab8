use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::backend::HostKernel;
use crate::registry::RegistryError;

/// WGSL program text, inline or loaded from disk at pipeline creation.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderCode {
    Inline(Cow<'static, str>),
    File(PathBuf),
}

impl ShaderCode {
    /// Returns the program text, reading the file if needed.
    pub fn load(&self) -> Result<Cow<'_, str>, RegistryError> {
        match self {
            ShaderCode::Inline(src) => Ok(Cow::Borrowed(src.as_ref())),
            ShaderCode::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| RegistryError::ShaderFile {
                    path: path.clone(),
                    source,
                }),
        }
    }
}

/// Per-backend shader artifacts for one stage.
///
/// The wgpu backend uses `wgsl`; the software backend runs `host` but still
/// loads a declared `wgsl` and checks its compute local size. A backend that
/// finds no artifact for itself fails pipeline creation.
#[derive(Clone, Default)]
pub struct ShaderSet {
    pub wgsl: Option<ShaderCode>,
    pub host: Option<HostKernel>,
}

impl ShaderSet {
    pub fn wgsl(source: impl Into<Cow<'static, str>>) -> Self {
        Self {
            wgsl: Some(ShaderCode::Inline(source.into())),
            host: None,
        }
    }

    pub fn wgsl_file(path: impl AsRef<Path>) -> Self {
        Self {
            wgsl: Some(ShaderCode::File(path.as_ref().to_path_buf())),
            host: None,
        }
    }

    pub fn host(kernel: HostKernel) -> Self {
        Self {
            wgsl: None,
            host: Some(kernel),
        }
    }

    pub fn with_host(mut self, kernel: HostKernel) -> Self {
        self.host = Some(kernel);
        self
    }
}

impl fmt::Debug for ShaderSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderSet")
            .field("wgsl", &self.wgsl)
            .field("host", &self.host.is_some())
            .finish()
    }
}

/// Workgroup size of the compute entry point `entry`, read from the parsed
/// module so comments and other functions cannot shadow it.
///
/// Fails when the source does not parse or has no compute entry by that name.
pub fn declared_workgroup_size(stage: &str, source: &str, entry: &str) -> Result<[u32; 3], RegistryError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| RegistryError::ShaderCompile {
        label: stage.to_string(),
        message: e.emit_to_string(source),
    })?;

    let ep = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry && ep.stage == naga::ShaderStage::Compute)
        .ok_or_else(|| RegistryError::MissingEntryPoint {
            stage: stage.to_string(),
            entry: entry.to_string(),
        })?;

    // Override-sized workgroups are only known at pipeline creation.
    if ep.workgroup_size.contains(&0) {
        return Err(RegistryError::ShaderCompile {
            label: stage.to_string(),
            message: format!("`{entry}` sizes its workgroup with pipeline overrides"),
        });
    }
    Ok(ep.workgroup_size)
}

/// Checks the compute entry's workgroup size against the host's local size.
pub(crate) fn check_local_size(stage: &str, source: &str, entry: &str, expected: [u32; 3]) -> Result<(), RegistryError> {
    let declared = declared_workgroup_size(stage, source, entry)?;
    if declared != expected {
        return Err(RegistryError::WorkgroupMismatch {
            stage: stage.to_string(),
            declared,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTICLES: &str = "
struct Particle { pos: vec2<f32>, vel: vec2<f32>, color: vec4<f32> };

@group(0) @binding(0) var<storage, read_write> particles: array<Particle>;

@compute @workgroup_size(64)
fn cs_main(@builtin(global_invocation_id) gid: vec3<u32>) {}
";

    // ── workgroup size ─────────────────────────────────────────────────────

    #[test]
    fn one_axis_defaults_rest_to_one() {
        assert_eq!(declared_workgroup_size("p", PARTICLES, "cs_main").unwrap(), [64, 1, 1]);
    }

    #[test]
    fn two_axes_with_suffixes() {
        let src = "@compute @workgroup_size(8u, 8u, 1)\nfn cs_main() {}";
        assert_eq!(declared_workgroup_size("s", src, "cs_main").unwrap(), [8, 8, 1]);
    }

    #[test]
    fn picks_the_attribute_of_the_named_entry() {
        let src = "
@compute @workgroup_size(4, 4)
fn first() {}

@compute @workgroup_size(16)
fn second() {}
";
        assert_eq!(declared_workgroup_size("s", src, "first").unwrap(), [4, 4, 1]);
        assert_eq!(declared_workgroup_size("s", src, "second").unwrap(), [16, 1, 1]);
    }

    #[test]
    fn const_expressions_are_evaluated() {
        let src = "const N = 64u;\n@compute @workgroup_size(N, 2)\nfn cs_main() {}";
        assert_eq!(declared_workgroup_size("s", src, "cs_main").unwrap(), [64, 2, 1]);
    }

    #[test]
    fn commented_out_sizes_are_ignored() {
        let src = "@compute @workgroup_size(64)\n// was @workgroup_size(32) before tuning\nfn cs_main() {}";
        assert_eq!(declared_workgroup_size("s", src, "cs_main").unwrap(), [64, 1, 1]);

        let src = "// helper for fn cs_main below\nfn helper() {}\n@compute @workgroup_size(16)\nfn cs_main() {}";
        assert_eq!(declared_workgroup_size("s", src, "cs_main").unwrap(), [16, 1, 1]);
    }

    #[test]
    fn missing_compute_entry_is_an_error() {
        let err = declared_workgroup_size("p", PARTICLES, "nope").unwrap_err();
        assert!(matches!(err, RegistryError::MissingEntryPoint { ref entry, .. } if entry == "nope"));

        let vertex_only = "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }";
        let err = declared_workgroup_size("v", vertex_only, "vs_main").unwrap_err();
        assert!(matches!(err, RegistryError::MissingEntryPoint { .. }));
    }

    #[test]
    fn unparsable_source_is_a_compile_error() {
        let err = declared_workgroup_size("bad", "@compute @workgroup_size(1) fn cs_main( {}", "cs_main").unwrap_err();
        assert!(matches!(err, RegistryError::ShaderCompile { ref label, .. } if label == "bad"));
    }

    #[test]
    fn prefix_names_do_not_match() {
        let src = "@compute @workgroup_size(2)\nfn cs_main_helper() {}\n@compute @workgroup_size(32)\nfn cs_main() {}";
        assert_eq!(declared_workgroup_size("s", src, "cs_main").unwrap(), [32, 1, 1]);
    }

    #[test]
    fn local_size_mismatch_is_rejected() {
        assert!(check_local_size("p", PARTICLES, "cs_main", [64, 1, 1]).is_ok());
        let err = check_local_size("p", PARTICLES, "cs_main", [32, 1, 1]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::WorkgroupMismatch { declared: [64, 1, 1], expected: [32, 1, 1], .. }
        ));
    }

    // ── loading ────────────────────────────────────────────────────────────

    #[test]
    fn missing_file_names_the_path() {
        let code = ShaderCode::File(PathBuf::from("/definitely/not/here.wgsl"));
        let err = code.load().unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.wgsl"));
    }
}
