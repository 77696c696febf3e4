//! Concurrency models driving the stencil kernel.
//!
//! Every model runs the same accumulate / finalize pair per step and must
//! produce the temperatures of the serial reference.

pub mod distributed;
pub mod fork_join;
pub mod schedule;
pub mod serial;

pub use distributed::*;
pub use fork_join::*;
pub use schedule::*;
pub use serial::*;

use crate::error::*;
use crate::mesh::*;
use crate::output::*;
use clap::ValueEnum;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Default)]
pub enum Model {
    /// Single worker reference loop.
    Serial,
    /// Isolated workers exchanging ghost units over channels.
    Distributed,
    /// Threads sharing the mesh, synchronized by barriers.
    #[default]
    ForkJoin,
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Model::Serial => "serial",
            Model::Distributed => "distributed",
            Model::ForkJoin => "fork-join",
        };
        write!(f, "{name}")
    }
}

pub trait Solver {
    fn name(&self) -> &'static str;

    fn workers(&self) -> usize;

    /// Run every step of `schedule` on `mesh`, recording snapshot steps
    /// into `sink`, and return the final mesh.
    fn solve(
        &self,
        mesh: Mesh,
        schedule: &Schedule,
        sink: &mut (dyn SnapshotSink + Send),
    ) -> HeatResult<Mesh>;

    fn print_report(&self);
}

/// Worker count used when none is requested, honours `RAYON_NUM_THREADS`.
pub fn default_workers() -> usize {
    rayon::current_num_threads()
}

/// Pick the error that caused a failed run over the ones it cascaded into.
pub(crate) fn root_cause(errors: Vec<HeatError>) -> Option<HeatError> {
    let mut errors = errors.into_iter();
    let first = errors.next()?;
    if !matches!(first, HeatError::WorkerLost { .. }) {
        return Some(first);
    }
    Some(
        errors
            .find(|e| !matches!(e, HeatError::WorkerLost { .. }))
            .unwrap_or(first),
    )
}

pub fn build(model: Model, workers: usize, conductivity: f64) -> HeatResult<Box<dyn Solver>> {
    if workers == 0 {
        return Err(HeatError::config("worker count must be positive"));
    }
    if !(conductivity.is_finite() && conductivity > 0.0) {
        return Err(HeatError::config(format!(
            "conductivity must be positive, got {conductivity}"
        )));
    }
    Ok(match model {
        Model::Serial => Box::new(SerialSolver::new(conductivity)),
        Model::Distributed => Box::new(DistributedSolver::new(workers, conductivity)),
        Model::ForkJoin => Box::new(ForkJoinSolver::new(workers, conductivity)),
    })
}
