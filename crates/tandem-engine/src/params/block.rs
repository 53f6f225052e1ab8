use super::layout::{ParamField, ParamKind, ParamLayout};
use super::source::{ParamInputs, ParamValue};

/// Marshaled bytes of one parameter block.
///
/// Sized to its layout at construction; rebuilt in place every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBlock {
    bytes: Vec<u8>,
}

impl ParamBlock {
    /// Creates a zeroed block for `layout`.
    pub fn new(layout: &ParamLayout) -> Self {
        Self {
            bytes: vec![0; layout.size() as usize],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Rewrites every field of `layout` from its source.
    pub fn fill(&mut self, layout: &ParamLayout, inputs: &ParamInputs) {
        debug_assert_eq!(self.bytes.len(), layout.size() as usize);
        for field in layout.fields() {
            let value = field.source.resolve(field.kind, inputs);
            self.set(field, value);
        }
    }

    /// Writes `value` at the field's offset.
    ///
    /// A value whose kind differs from the field is ignored (logged at debug).
    pub fn set(&mut self, field: &ParamField, value: ParamValue) {
        if value.kind() != field.kind {
            log::debug!(
                "param `{}` expects {} but got {}; ignored",
                field.name,
                field.kind,
                value.kind()
            );
            return;
        }

        let at = field.offset as usize;
        let dst = &mut self.bytes[at..at + field.kind.size() as usize];
        match value {
            ParamValue::F32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            ParamValue::I32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            ParamValue::U32(v) => dst.copy_from_slice(bytemuck::bytes_of(&v)),
            ParamValue::Vec2(v) => dst.copy_from_slice(bytemuck::cast_slice(&v)),
            ParamValue::Vec4(v) => dst.copy_from_slice(bytemuck::cast_slice(&v)),
        }
    }

    /// Reads the field back out of the marshaled bytes.
    pub fn get(&self, field: &ParamField) -> ParamValue {
        let at = field.offset as usize;
        let src = &self.bytes[at..at + field.kind.size() as usize];
        match field.kind {
            ParamKind::F32 => ParamValue::F32(bytemuck::pod_read_unaligned(src)),
            ParamKind::I32 => ParamValue::I32(bytemuck::pod_read_unaligned(src)),
            ParamKind::U32 => ParamValue::U32(bytemuck::pod_read_unaligned(src)),
            ParamKind::Vec2 => ParamValue::Vec2(bytemuck::pod_read_unaligned(src)),
            ParamKind::Vec4 => ParamValue::Vec4(bytemuck::pod_read_unaligned(src)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{ParamKind, ParamSource};

    fn mouse_layout() -> ParamLayout {
        ParamLayout::builder()
            .field("iTime", ParamKind::Vec2, ParamSource::ElapsedDelta)
            .field("iResolution", ParamKind::Vec2, ParamSource::Resolution)
            .field("iMouse", ParamKind::Vec4, ParamSource::Pointer)
            .build()
            .unwrap()
    }

    // ── round trip ─────────────────────────────────────────────────────────

    #[test]
    fn zero_time_zero_input_round_trips() {
        let layout = mouse_layout();
        let inputs = ParamInputs {
            resolution: [800.0, 600.0],
            ..ParamInputs::default()
        };

        let mut block = ParamBlock::new(&layout);
        block.fill(&layout, &inputs);

        assert_eq!(block.as_bytes().len(), 32);
        assert_eq!(block.get(layout.field("iTime").unwrap()), ParamValue::Vec2([0.0, 0.0]));
        assert_eq!(
            block.get(layout.field("iResolution").unwrap()),
            ParamValue::Vec2([800.0, 600.0])
        );
        assert_eq!(block.get(layout.field("iMouse").unwrap()), ParamValue::Vec4([0.0; 4]));
    }

    #[test]
    fn bytes_match_repr_c_mirror() {
        #[repr(C)]
        #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
        struct Mirror {
            dt: f32,
            num_particles: i32,
            _pad: [f32; 2],
        }

        let layout = ParamLayout::builder()
            .field("dt", ParamKind::F32, ParamSource::Delta)
            .field("num_particles", ParamKind::I32, ParamSource::ElementCount)
            .build()
            .unwrap();

        let mut block = ParamBlock::new(&layout);
        block.fill(
            &layout,
            &ParamInputs {
                delta: 1.0 / 60.0,
                element_count: 8192,
                ..ParamInputs::default()
            },
        );

        let mirror: Mirror = bytemuck::pod_read_unaligned(block.as_bytes());
        assert_eq!(mirror.dt, 1.0 / 60.0);
        assert_eq!(mirror.num_particles, 8192);
    }

    #[test]
    fn offsets_stay_stable_across_refills() {
        let layout = mouse_layout();
        let mut block = ParamBlock::new(&layout);

        block.fill(&layout, &ParamInputs { elapsed: 1.0, delta: 0.5, ..ParamInputs::default() });
        let first = block.clone();
        block.fill(&layout, &ParamInputs { elapsed: 1.0, delta: 0.5, ..ParamInputs::default() });

        assert_eq!(first, block);
        assert_eq!(block.get(layout.field("iTime").unwrap()), ParamValue::Vec2([1.0, 0.5]));
    }

    // ── set ────────────────────────────────────────────────────────────────

    #[test]
    fn set_with_wrong_kind_is_ignored() {
        let layout = mouse_layout();
        let field = layout.field("iMouse").unwrap();
        let mut block = ParamBlock::new(&layout);

        block.set(field, ParamValue::F32(3.0));
        assert_eq!(block.get(field), ParamValue::Vec4([0.0; 4]));

        block.set(field, ParamValue::Vec4([1.0, 2.0, 1.0, 0.0]));
        assert_eq!(block.get(field), ParamValue::Vec4([1.0, 2.0, 1.0, 0.0]));
    }

    #[test]
    fn constant_source_is_written_verbatim() {
        let layout = ParamLayout::builder()
            .field("resolution", ParamKind::Vec2, ParamSource::Resolution)
            .field("point_size", ParamKind::F32, ParamSource::Constant(ParamValue::F32(20.0)))
            .build()
            .unwrap();
        let mut block = ParamBlock::new(&layout);
        block.fill(&layout, &ParamInputs::default());

        assert_eq!(block.get(layout.field("point_size").unwrap()), ParamValue::F32(20.0));
    }
}
