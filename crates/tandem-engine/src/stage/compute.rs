use crate::backend::Backend;
use crate::params::ParamBlock;
use crate::registry::{ComputePipelineHandle, ResourceRegistry};

/// Workgroups needed to cover `problem` with groups of `local` invocations.
///
/// `ceil(problem / local)` per axis. A zero local axis yields zero groups.
pub fn workgroup_grid(problem: [u32; 3], local: [u32; 3]) -> [u32; 3] {
    std::array::from_fn(|i| {
        if local[i] == 0 {
            0
        } else {
            problem[i].div_ceil(local[i])
        }
    })
}

/// Proof that this frame's compute work has been recorded.
///
/// Only `ComputeStage::dispatch` (or the orchestrator, for pipelines without a
/// compute stage) produces one, and `RenderStage::draw` consumes it.
#[must_use = "pass the token to RenderStage::draw"]
#[derive(Debug)]
pub struct ComputeDone {
    _private: (),
}

impl ComputeDone {
    pub(crate) fn without_compute() -> Self {
        Self { _private: () }
    }
}

/// One compute dispatch per frame over a fixed problem size.
#[derive(Debug, Clone)]
pub struct ComputeStage {
    label: String,
    pipeline: ComputePipelineHandle,
    problem_size: [u32; 3],
    local_size: [u32; 3],
    grid: [u32; 3],
}

impl ComputeStage {
    pub fn new(
        label: impl Into<String>,
        pipeline: ComputePipelineHandle,
        problem_size: [u32; 3],
        local_size: [u32; 3],
    ) -> Self {
        Self {
            label: label.into(),
            pipeline,
            problem_size,
            local_size,
            grid: workgroup_grid(problem_size, local_size),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pipeline(&self) -> ComputePipelineHandle {
        self.pipeline
    }

    pub fn problem_size(&self) -> [u32; 3] {
        self.problem_size
    }

    pub fn local_size(&self) -> [u32; 3] {
        self.local_size
    }

    pub fn grid(&self) -> [u32; 3] {
        self.grid
    }

    /// Uploads `params` and issues exactly one dispatch covering the problem.
    pub fn dispatch<B: Backend>(
        &self,
        backend: &mut B,
        registry: &ResourceRegistry<B>,
        params: Option<&ParamBlock>,
    ) -> ComputeDone {
        match registry.compute_pipeline(self.pipeline) {
            Some(pipeline) => {
                log::trace!("dispatch `{}` grid {:?}", self.label, self.grid);
                backend.dispatch(pipeline, params.map(ParamBlock::as_bytes), self.grid);
            }
            None => log::error!("compute stage `{}` has no live pipeline", self.label),
        }
        ComputeDone { _private: () }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── grid ───────────────────────────────────────────────────────────────

    #[test]
    fn particle_grid() {
        assert_eq!(workgroup_grid([8192, 1, 1], [64, 1, 1]), [128, 1, 1]);
    }

    #[test]
    fn image_grid_rounds_up_on_both_axes() {
        assert_eq!(workgroup_grid([800, 600, 1], [8, 8, 1]), [100, 75, 1]);
        assert_eq!(workgroup_grid([801, 601, 1], [8, 8, 1]), [101, 76, 1]);
    }

    #[test]
    fn partial_group_still_dispatched() {
        assert_eq!(workgroup_grid([1, 1, 1], [64, 1, 1]), [1, 1, 1]);
        assert_eq!(workgroup_grid([65, 1, 1], [64, 1, 1]), [2, 1, 1]);
    }

    #[test]
    fn empty_problem_and_zero_local_axis() {
        assert_eq!(workgroup_grid([0, 1, 1], [64, 1, 1]), [0, 1, 1]);
        assert_eq!(workgroup_grid([10, 1, 1], [0, 1, 1]), [0, 1, 1]);
    }

    #[test]
    fn grid_times_local_covers_problem() {
        for n in [1u32, 63, 64, 65, 1000, 8191, 8192, 8193] {
            let [gx, _, _] = workgroup_grid([n, 1, 1], [64, 1, 1]);
            assert!(gx * 64 >= n);
            assert!((gx - 1) * 64 < n);
        }
    }
}
