use super::layout::ParamKind;

/// A single typed parameter value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
}

impl ParamValue {
    pub const fn kind(&self) -> ParamKind {
        match self {
            ParamValue::F32(_) => ParamKind::F32,
            ParamValue::I32(_) => ParamKind::I32,
            ParamValue::U32(_) => ParamKind::U32,
            ParamValue::Vec2(_) => ParamKind::Vec2,
            ParamValue::Vec4(_) => ParamKind::Vec4,
        }
    }
}

/// Where a field's value comes from when the block is rebuilt for a frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamSource {
    /// Accumulated simulation time in seconds.
    Elapsed,
    /// Delta time of the current frame in seconds.
    Delta,
    /// `(elapsed, delta)`.
    ElapsedDelta,
    /// Output resolution in pixels.
    Resolution,
    /// `(active.x, active.y, primary, secondary)` from the pointer state.
    Pointer,
    /// Problem size along x (element count).
    ElementCount,
    Constant(ParamValue),
}

impl ParamSource {
    /// Returns whether this source can fill a field of `kind`.
    pub fn accepts(&self, kind: ParamKind) -> bool {
        match self {
            ParamSource::Elapsed | ParamSource::Delta => kind == ParamKind::F32,
            ParamSource::ElapsedDelta | ParamSource::Resolution => kind == ParamKind::Vec2,
            ParamSource::Pointer => kind == ParamKind::Vec4,
            ParamSource::ElementCount => matches!(kind, ParamKind::U32 | ParamKind::I32),
            ParamSource::Constant(v) => v.kind() == kind,
        }
    }

    /// Resolves the value for a field of `kind`.
    ///
    /// `kind` must have been checked with [`accepts`](Self::accepts).
    pub fn resolve(&self, kind: ParamKind, inputs: &ParamInputs) -> ParamValue {
        match self {
            ParamSource::Elapsed => ParamValue::F32(inputs.elapsed),
            ParamSource::Delta => ParamValue::F32(inputs.delta),
            ParamSource::ElapsedDelta => ParamValue::Vec2([inputs.elapsed, inputs.delta]),
            ParamSource::Resolution => ParamValue::Vec2(inputs.resolution),
            ParamSource::Pointer => ParamValue::Vec4(inputs.pointer),
            ParamSource::ElementCount => match kind {
                ParamKind::I32 => ParamValue::I32(inputs.element_count.min(i32::MAX as u32) as i32),
                _ => ParamValue::U32(inputs.element_count),
            },
            ParamSource::Constant(v) => *v,
        }
    }
}

/// Per-frame inputs folded into parameter blocks.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct ParamInputs {
    pub elapsed: f32,
    pub delta: f32,
    pub resolution: [f32; 2],
    pub pointer: [f32; 4],
    pub element_count: u32,
}
