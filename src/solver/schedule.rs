use crate::error::*;

/// Step count and snapshot cadence of a run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Schedule {
    pub steps: usize,
    pub save_frequency: usize,
    pub output_enabled: bool,
}

impl Schedule {
    pub fn new(steps: usize, save_frequency: usize) -> HeatResult<Self> {
        if save_frequency == 0 {
            return Err(HeatError::config("save frequency must be positive"));
        }
        Ok(Schedule {
            steps,
            save_frequency,
            output_enabled: true,
        })
    }

    pub fn without_output(mut self) -> Self {
        self.output_enabled = false;
        self
    }

    /// Whether the mesh is gathered and recorded after `step`.
    /// Only depends on `step`, so every worker agrees on it.
    #[inline]
    pub fn is_snapshot_step(&self, step: usize) -> bool {
        self.output_enabled && step % self.save_frequency == 0
    }

    /// Number of snapshots a full run records.
    pub fn snapshot_count(&self) -> usize {
        match self.output_enabled {
            true => self.steps.div_ceil(self.save_frequency),
            false => 0,
        }
    }
}
