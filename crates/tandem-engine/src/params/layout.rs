use std::collections::HashSet;
use std::fmt;

use super::source::ParamSource;

/// Shader-visible field type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ParamKind {
    F32,
    I32,
    U32,
    Vec2,
    Vec4,
}

impl ParamKind {
    /// Size in bytes.
    pub const fn size(self) -> u32 {
        match self {
            ParamKind::F32 | ParamKind::I32 | ParamKind::U32 => 4,
            ParamKind::Vec2 => 8,
            ParamKind::Vec4 => 16,
        }
    }

    /// Alignment in the WGSL uniform address space.
    pub const fn align(self) -> u32 {
        // Scalars and vectors of these widths are aligned to their own size.
        self.size()
    }

    pub const fn wgsl_name(self) -> &'static str {
        match self {
            ParamKind::F32 => "f32",
            ParamKind::I32 => "i32",
            ParamKind::U32 => "u32",
            ParamKind::Vec2 => "vec2<f32>",
            ParamKind::Vec4 => "vec4<f32>",
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wgsl_name())
    }
}

/// Uniform blocks are sized in 16-byte steps.
const BLOCK_ALIGN: u32 = 16;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LayoutError {
    #[error("parameter layout has no fields")]
    Empty,

    #[error("parameter field `{0}` declared more than once")]
    DuplicateField(String),

    #[error("parameter field `{field}` is {kind} but {from:?} cannot fill it")]
    SourceKindMismatch {
        field: String,
        kind: ParamKind,
        from: ParamSource,
    },
}

/// One field of a parameter block.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamField {
    pub name: String,
    pub kind: ParamKind,
    /// Byte offset inside the block.
    pub offset: u32,
    pub source: ParamSource,
}

/// Fixed field order and offsets of a parameter block.
///
/// Immutable once built; offsets never change across frames.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamLayout {
    fields: Vec<ParamField>,
    size: u32,
}

impl ParamLayout {
    pub fn builder() -> ParamLayoutBuilder {
        ParamLayoutBuilder::default()
    }

    pub fn fields(&self) -> &[ParamField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ParamField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Total block size in bytes (multiple of 16).
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Renders the matching WGSL struct declaration.
    pub fn wgsl_struct(&self, name: &str) -> String {
        let mut out = format!("struct {name} {{\n");
        for f in &self.fields {
            out.push_str(&format!("    {}: {},\n", f.name, f.kind.wgsl_name()));
        }
        out.push('}');
        out
    }
}

/// Collects fields in declaration order and computes offsets on `build`.
#[derive(Debug, Default, Clone)]
pub struct ParamLayoutBuilder {
    fields: Vec<(String, ParamKind, ParamSource)>,
}

impl ParamLayoutBuilder {
    pub fn field(mut self, name: impl Into<String>, kind: ParamKind, source: ParamSource) -> Self {
        self.fields.push((name.into(), kind, source));
        self
    }

    pub fn build(self) -> Result<ParamLayout, LayoutError> {
        if self.fields.is_empty() {
            return Err(LayoutError::Empty);
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut cursor = 0u32;

        for (name, kind, source) in self.fields {
            if !seen.insert(name.clone()) {
                return Err(LayoutError::DuplicateField(name));
            }
            if !source.accepts(kind) {
                return Err(LayoutError::SourceKindMismatch { field: name, kind, from: source });
            }

            let offset = cursor.next_multiple_of(kind.align());
            cursor = offset + kind.size();
            fields.push(ParamField { name, kind, offset, source });
        }

        Ok(ParamLayout {
            fields,
            size: cursor.next_multiple_of(BLOCK_ALIGN),
        })
    }
}
