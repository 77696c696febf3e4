//! Distributed memory model.
//!
//! Each worker owns a private copy of its strip plus one halo unit on each
//! side and only learns about the rest of the mesh through messages.
//! Ghost units are refreshed after every finalize, so the halo always holds
//! the temperatures of the step the next accumulate reads.

use crate::error::*;
use crate::exchange::*;
use crate::kernel::*;
use crate::mesh::*;
use crate::output::*;
use crate::partition::*;
use crate::solver::*;
use crate::util::*;

/// Private window of a worker: the owned range and its halo.
pub struct LocalDomain {
    shape: MeshShape,
    owned: Partition,
    window: Partition,
    nodes: Vec<Node>,
}

impl LocalDomain {
    /// Copy the owned range of `mesh` and one unit on each side.
    pub fn new(mesh: &Mesh, owned: Partition) -> Self {
        let shape = *mesh.shape();
        let unit_len = shape.unit_len();
        let window = if owned.is_empty() {
            owned
        } else {
            Partition::new(
                owned.low.saturating_sub(unit_len),
                (owned.high + unit_len).min(shape.len()),
            )
        };
        LocalDomain {
            shape,
            owned,
            window,
            nodes: mesh.nodes()[window.range()].to_vec(),
        }
    }

    #[inline]
    pub fn owned(&self) -> Partition {
        self.owned
    }

    #[inline]
    pub fn window(&self) -> Partition {
        self.window
    }

    #[inline]
    fn local(&self, index: usize) -> usize {
        debug_assert!(self.window.contains(index), "{index} outside {}", self.window);
        index - self.window.low
    }

    fn unit_temperatures(&self, low: usize) -> Vec<f64> {
        let low = self.local(low);
        self.nodes[low..low + self.shape.unit_len()]
            .iter()
            .map(|n| n.temperature)
            .collect()
    }

    /// Temperatures of the first owned unit, empty when nothing is owned.
    pub fn first_unit(&self) -> Vec<f64> {
        if self.owned.is_empty() {
            return Vec::new();
        }
        self.unit_temperatures(self.owned.low)
    }

    /// Temperatures of the last owned unit, empty when nothing is owned.
    pub fn last_unit(&self) -> Vec<f64> {
        if self.owned.is_empty() {
            return Vec::new();
        }
        self.unit_temperatures(self.owned.high - self.shape.unit_len())
    }

    pub fn owned_temperatures(&self) -> Vec<f64> {
        let low = self.owned.low - self.window.low;
        self.nodes[low..low + self.owned.len()]
            .iter()
            .map(|n| n.temperature)
            .collect()
    }

    fn set_unit(&mut self, low: usize, temperatures: &[f64]) {
        debug_assert_eq!(temperatures.len(), self.shape.unit_len());
        let low = self.local(low);
        for (node, t) in self.nodes[low..].iter_mut().zip(temperatures) {
            node.temperature = *t;
        }
    }

    /// Store received ghost units in the halo.
    pub fn apply_ghosts(&mut self, ghosts: &Ghosts) {
        let unit_len = self.shape.unit_len();
        if let Some(left) = &ghosts.left {
            self.set_unit(self.owned.low - unit_len, left);
        }
        if let Some(right) = &ghosts.right {
            self.set_unit(self.owned.high, right);
        }
    }

    pub fn step(&mut self, params: &KernelParams) {
        let owned = self.owned.range();
        accumulate(self, owned.clone());
        finalize(self, owned, params);
    }
}

impl TemperatureLookup for LocalDomain {
    #[inline]
    fn shape(&self) -> &MeshShape {
        &self.shape
    }

    #[inline]
    fn temperature(&self, index: usize) -> Option<f64> {
        if !self.window.contains(index) {
            return None;
        }
        let node = &self.nodes[index - self.window.low];
        node.is_active().then_some(node.temperature)
    }
}

impl NodeStore for LocalDomain {
    #[inline]
    fn participates(&self, index: usize) -> bool {
        self.nodes[self.local(index)].is_free()
    }

    #[inline]
    fn add_to_accumulator(&mut self, index: usize, value: f64) {
        let i = self.local(index);
        self.nodes[i].accumulator += value;
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node {
        debug_assert!(self.owned.contains(index));
        let i = self.local(index);
        &mut self.nodes[i]
    }
}

/// Copy gathered temperatures into the root's copy of the mesh.
fn assemble(frame: &mut Mesh, messages: &[GatherMessage]) {
    for m in messages {
        frame.set_temperatures(m.low, &m.temperatures);
    }
}

/// Root only state of a worker.
struct RootState<'a> {
    frame: Mesh,
    sink: &'a mut (dyn SnapshotSink + Send),
}

/// Step loop of a single worker. The root returns the assembled final mesh.
fn run_worker<C: Communicator>(
    comm: &mut C,
    mut local: LocalDomain,
    mut root: Option<RootState<'_>>,
    schedule: &Schedule,
    params: &KernelParams,
) -> HeatResult<Option<Mesh>> {
    log::debug!(
        "worker {}/{} owns {} of {} nodes",
        comm.rank(),
        comm.size(),
        local.owned(),
        local.shape.len()
    );
    for step in 0..schedule.steps {
        local.step(params);
        let ghosts = comm.exchange(step, &local.first_unit(), &local.last_unit())?;
        local.apply_ghosts(&ghosts);

        if schedule.is_snapshot_step(step) {
            let gathered =
                comm.gather(step, local.owned().low, &local.owned_temperatures())?;
            if let (Some(messages), Some(root)) = (gathered, root.as_mut()) {
                assemble(&mut root.frame, &messages);
                root.sink
                    .record(step, root.frame.shape(), root.frame.nodes())?;
            }
        }
    }

    let gathered = comm.gather(
        schedule.steps,
        local.owned().low,
        &local.owned_temperatures(),
    )?;
    Ok(match (gathered, root) {
        (Some(messages), Some(mut root)) => {
            assemble(&mut root.frame, &messages);
            Some(root.frame)
        }
        _ => None,
    })
}

#[derive(Debug, Copy, Clone)]
pub struct DistributedSolver {
    workers: usize,
    conductivity: f64,
}

impl DistributedSolver {
    pub fn new(workers: usize, conductivity: f64) -> Self {
        DistributedSolver {
            workers,
            conductivity,
        }
    }
}

impl Solver for DistributedSolver {
    fn name(&self) -> &'static str {
        "distributed"
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn solve(
        &self,
        mesh: Mesh,
        schedule: &Schedule,
        sink: &mut (dyn SnapshotSink + Send),
    ) -> HeatResult<Mesh> {
        let params = KernelParams::for_mesh(&mesh).with_conductivity(self.conductivity);
        let shape = *mesh.shape();
        let world = ChannelCommunicator::world(shape.units(), shape.unit_len(), self.workers)?;
        let locals: Vec<LocalDomain> = world
            .iter()
            .map(|comm| LocalDomain::new(&mesh, comm.partition()))
            .collect();
        let mut root = Some(RootState { frame: mesh, sink });

        let results: Vec<HeatResult<Option<Mesh>>> = std::thread::scope(|s| {
            let mut handles = Vec::with_capacity(self.workers);
            for (mut comm, local) in world.into_iter().zip(locals) {
                let rank = comm.rank();
                log::debug!(
                    "worker {rank} exchanges with {:?} and {:?}",
                    comm.left_partner(),
                    comm.right_partner()
                );
                let root_state = if rank == ROOT { root.take() } else { None };
                let params = &params;
                let spawned = std::thread::Builder::new()
                    .name(format!("heat-worker-{rank}"))
                    .spawn_scoped(s, move || {
                        run_worker(&mut comm, local, root_state, schedule, params)
                    });
                handles.push((rank, spawned));
            }
            handles
                .into_iter()
                .map(|(rank, spawned)| match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or(Err(HeatError::WorkerLost { rank })),
                    Err(e) => Err(HeatError::Io(e)),
                })
                .collect()
        });

        let mut errors = Vec::new();
        let mut result = None;
        for r in results {
            match r {
                Ok(Some(mesh)) => result = Some(mesh),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        if let Some(e) = root_cause(errors) {
            return Err(e);
        }
        result.ok_or(HeatError::WorkerLost { rank: ROOT })
    }

    fn print_report(&self) {
        println!("Distributed Solver Report:");
        println!("  - workers: {}", self.workers);
        println!("  - conductivity: {}", self.conductivity);
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn local_domain_window_test() {
        let mesh = Mesh::initialize(&MeshSpec::plate(4, 6, 400.0, 200.0)).unwrap();
        let parts = partitions(6, 3).unwrap();

        let first = LocalDomain::new(&mesh, parts[0].scaled(4));
        assert_eq!(first.owned(), Partition::new(0, 8));
        assert_eq!(first.window(), Partition::new(0, 12));

        let middle = LocalDomain::new(&mesh, parts[1].scaled(4));
        assert_eq!(middle.window(), Partition::new(4, 20));
        assert_eq!(middle.first_unit(), mesh.temperatures()[8..12].to_vec());
        assert_eq!(middle.last_unit(), mesh.temperatures()[12..16].to_vec());
        assert_eq!(middle.temperature(3), None);
        assert_eq!(middle.temperature(4), Some(400.0));

        let last = LocalDomain::new(&mesh, parts[2].scaled(4));
        assert_eq!(last.window(), Partition::new(12, 24));

        let empty = LocalDomain::new(&mesh, Partition::new(8, 8));
        assert!(empty.first_unit().is_empty());
        assert!(empty.owned_temperatures().is_empty());
    }

    #[test]
    fn apply_ghosts_test() {
        let mesh = Mesh::initialize(&MeshSpec::bar(9, 400.0, 200.0)).unwrap();
        let mut local = LocalDomain::new(&mesh, Partition::new(3, 6));
        local.apply_ghosts(&Ghosts {
            left: Some(vec![1.0]),
            right: Some(vec![2.0]),
        });
        assert_eq!(local.temperature(2), Some(1.0));
        assert_eq!(local.temperature(6), Some(2.0));
        assert_eq!(local.owned_temperatures(), vec![200.0; 3]);
    }

    #[test]
    fn matches_serial_test() {
        let spec = MeshSpec::bar(17, 400.0, 100.0);
        let schedule = Schedule::new(40, 10).unwrap().without_output();
        let serial = SerialSolver::default()
            .solve(Mesh::initialize(&spec).unwrap(), &schedule, &mut NullSink)
            .unwrap();
        for workers in [1, 2, 5, 17, 20] {
            let distributed = DistributedSolver::new(workers, DEFAULT_CONDUCTIVITY)
                .solve(Mesh::initialize(&spec).unwrap(), &schedule, &mut NullSink)
                .unwrap();
            assert_eq!(
                serial.temperatures(),
                distributed.temperatures(),
                "workers: {workers}"
            );
        }
    }

    #[test]
    fn sink_failure_test() {
        struct Failing;
        impl SnapshotSink for Failing {
            fn record(&mut self, _: usize, _: &MeshShape, _: &[Node]) -> HeatResult<()> {
                Err(HeatError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "disk full",
                )))
            }
        }

        let mesh = Mesh::initialize(&MeshSpec::plate(6, 12, 400.0, 200.0)).unwrap();
        let schedule = Schedule::new(30, 5).unwrap();
        let r = DistributedSolver::new(4, DEFAULT_CONDUCTIVITY).solve(
            mesh,
            &schedule,
            &mut Failing,
        );
        assert!(matches!(r, Err(HeatError::Io(_))));
    }
}
