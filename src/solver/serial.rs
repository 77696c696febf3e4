use crate::error::*;
use crate::kernel::*;
use crate::mesh::*;
use crate::output::*;
use crate::solver::*;

/// Single worker loop over the whole mesh, the reference the other
/// models are compared against.
#[derive(Debug, Copy, Clone)]
pub struct SerialSolver {
    conductivity: f64,
}

impl SerialSolver {
    pub fn new(conductivity: f64) -> Self {
        SerialSolver { conductivity }
    }
}

impl Default for SerialSolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONDUCTIVITY)
    }
}

impl Solver for SerialSolver {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn workers(&self) -> usize {
        1
    }

    fn solve(
        &self,
        mut mesh: Mesh,
        schedule: &Schedule,
        sink: &mut (dyn SnapshotSink + Send),
    ) -> HeatResult<Mesh> {
        let params = KernelParams::for_mesh(&mesh).with_conductivity(self.conductivity);
        let n = mesh.len();
        for step in 0..schedule.steps {
            accumulate(&mut mesh, 0..n);
            finalize(&mut mesh, 0..n, &params);
            if schedule.is_snapshot_step(step) {
                sink.record(step, mesh.shape(), mesh.nodes())?;
            }
        }
        Ok(mesh)
    }

    fn print_report(&self) {
        println!("Serial Solver Report:");
        println!("  - workers: 1");
        println!("  - conductivity: {}", self.conductivity);
    }
}
