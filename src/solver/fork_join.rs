//! Shared memory model.
//!
//! A fixed set of threads is forked once per run and works on the mesh in
//! place. Per step every thread accumulates its strip, waits, finalizes its
//! strip and waits again. A thread that fails or panics tears the barrier
//! down so the others leave instead of waiting forever.
//! During accumulate a thread reads the
//! temperatures of nodes owned by others, but writes only the accumulators
//! of its own nodes. During finalize it only touches its own nodes.
//! Node accesses go through raw places so no reference ever covers a node
//! another thread may be writing.

use crate::error::*;
use crate::kernel::*;
use crate::mesh::*;
use crate::output::*;
use crate::partition::*;
use crate::solver::*;
use crate::util::*;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, PoisonError};
use sync_ptr::SyncMutPtr;

/// Window of one thread onto the shared node buffer.
pub struct SharedView<'a> {
    nodes: SyncMutPtr<Node>,
    len: usize,
    shape: MeshShape,
    owned: Partition,
    _lifetime: PhantomData<&'a mut [Node]>,
}

impl<'a> SharedView<'a> {
    /// One view per partition over the nodes of `mesh`.
    /// Partitions must not overlap.
    fn split(mesh: &'a mut Mesh, parts: &[Partition]) -> Vec<SharedView<'a>> {
        let shape = *mesh.shape();
        let nodes = mesh.nodes_mut();
        let len = nodes.len();
        let ptr = nodes.as_mut_ptr();
        parts
            .iter()
            .map(|owned| {
                debug_assert!(owned.high <= len);
                SharedView {
                    nodes: unsafe { SyncMutPtr::new(ptr) },
                    len,
                    shape,
                    owned: *owned,
                    _lifetime: PhantomData,
                }
            })
            .collect()
    }

    #[inline]
    fn place(&self, index: usize) -> *mut Node {
        debug_assert!(index < self.len);
        unsafe { self.nodes.inner().add(index) }
    }

    /// Whole mesh, only valid while every other thread waits at a barrier.
    unsafe fn all_nodes(&self) -> &[Node] {
        std::slice::from_raw_parts(self.nodes.inner() as *const Node, self.len)
    }
}

impl TemperatureLookup for SharedView<'_> {
    #[inline]
    fn shape(&self) -> &MeshShape {
        &self.shape
    }

    #[inline]
    fn temperature(&self, index: usize) -> Option<f64> {
        let p = self.place(index);
        // Activity is immutable and temperatures are only written in finalize
        unsafe { (*p).is_active.then_some((*p).temperature) }
    }
}

impl NodeStore for SharedView<'_> {
    #[inline]
    fn participates(&self, index: usize) -> bool {
        let p = self.place(index);
        unsafe { (*p).is_active && (*p).class != NodeClass::Fixed }
    }

    #[inline]
    fn add_to_accumulator(&mut self, index: usize, value: f64) {
        debug_assert!(self.owned.contains(index));
        let p = self.place(index);
        unsafe { (*p).accumulator += value }
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node {
        debug_assert!(self.owned.contains(index));
        unsafe { &mut *self.place(index) }
    }
}

/// Reusable barrier that can be aborted.
struct StepBarrier {
    parties: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

struct BarrierState {
    arrived: usize,
    generation: u64,
    aborted: bool,
}

impl StepBarrier {
    fn new(parties: usize) -> Self {
        StepBarrier {
            parties,
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                aborted: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Block until every party arrives. Returns false once aborted.
    fn wait(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.aborted {
            return false;
        }
        let generation = state.generation;
        state.arrived += 1;
        if state.arrived == self.parties {
            state.arrived = 0;
            state.generation = state.generation.wrapping_add(1);
            self.released.notify_all();
            return true;
        }
        let state = self
            .released
            .wait_while(state, |s| s.generation == generation && !s.aborted)
            .unwrap_or_else(PoisonError::into_inner);
        state.generation != generation
    }

    /// Release every waiting party, now and for all later waits.
    fn abort(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.aborted = true;
        self.released.notify_all();
    }
}

/// Snapshot duty of worker 0.
struct Recorder<'a> {
    sink: &'a mut (dyn SnapshotSink + Send),
    error: Option<HeatError>,
}

fn run_worker(
    id: usize,
    mut view: SharedView<'_>,
    mut recorder: Option<Recorder<'_>>,
    barrier: &StepBarrier,
    schedule: &Schedule,
    params: &KernelParams,
) -> Option<HeatError> {
    log::debug!("thread {id} owns {}", view.owned);
    let owned = view.owned;
    for step in 0..schedule.steps {
        accumulate(&mut view, owned.range());
        if !barrier.wait() {
            break;
        }
        finalize(&mut view, owned.range(), params);
        if !barrier.wait() {
            break;
        }

        if schedule.is_snapshot_step(step) {
            if let Some(r) = recorder.as_mut() {
                let nodes = unsafe { view.all_nodes() };
                if let Err(e) = r.sink.record(step, &view.shape, nodes) {
                    r.error = Some(e);
                    barrier.abort();
                    break;
                }
            }
            if !barrier.wait() {
                break;
            }
        }
    }
    recorder.and_then(|r| r.error)
}

/// Run one worker, turning a panic into an aborted barrier and a lost worker.
fn guarded_worker(
    id: usize,
    view: SharedView<'_>,
    recorder: Option<Recorder<'_>>,
    barrier: &StepBarrier,
    schedule: &Schedule,
    params: &KernelParams,
) -> Option<HeatError> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        run_worker(id, view, recorder, barrier, schedule, params)
    }));
    outcome.unwrap_or_else(|_| {
        log::error!("thread {id} panicked, aborting the run");
        barrier.abort();
        Some(HeatError::WorkerLost { rank: id })
    })
}

#[derive(Debug, Copy, Clone)]
pub struct ForkJoinSolver {
    workers: usize,
    conductivity: f64,
}

impl ForkJoinSolver {
    pub fn new(workers: usize, conductivity: f64) -> Self {
        ForkJoinSolver {
            workers,
            conductivity,
        }
    }
}

impl Solver for ForkJoinSolver {
    fn name(&self) -> &'static str {
        "fork-join"
    }

    fn workers(&self) -> usize {
        self.workers
    }

    fn solve(
        &self,
        mut mesh: Mesh,
        schedule: &Schedule,
        sink: &mut (dyn SnapshotSink + Send),
    ) -> HeatResult<Mesh> {
        if self.workers == 0 {
            return Err(HeatError::config("worker count must be positive"));
        }
        let params = KernelParams::for_mesh(&mesh).with_conductivity(self.conductivity);
        let shape = *mesh.shape();
        let parts: Vec<Partition> = (0..self.workers)
            .map(|w| strip_partition(&shape, self.workers, w))
            .collect::<HeatResult<_>>()?;

        let barrier = StepBarrier::new(self.workers);
        let mut recorder = Some(Recorder { sink, error: None });

        let views = SharedView::split(&mut mesh, &parts);
        let errors: Vec<HeatError> = std::thread::scope(|s| {
            let mut errors = Vec::new();
            let mut handles = Vec::with_capacity(self.workers);
            for (id, view) in views.into_iter().enumerate() {
                let recorder = if id == 0 { recorder.take() } else { None };
                let (barrier, params) = (&barrier, &params);
                let spawned = std::thread::Builder::new()
                    .name(format!("heat-thread-{id}"))
                    .spawn_scoped(s, move || {
                        guarded_worker(id, view, recorder, barrier, schedule, params)
                    });
                match spawned {
                    Ok(handle) => handles.push((id, handle)),
                    Err(e) => {
                        log::error!("cannot spawn thread {id}: {e}");
                        barrier.abort();
                        errors.push(HeatError::Io(e));
                        break;
                    }
                }
            }
            for (id, handle) in handles {
                match handle.join() {
                    Ok(Some(e)) => errors.push(e),
                    Ok(None) => {}
                    Err(_) => errors.push(HeatError::WorkerLost { rank: id }),
                }
            }
            errors
        });

        match root_cause(errors) {
            Some(e) => Err(e),
            None => Ok(mesh),
        }
    }

    fn print_report(&self) {
        println!("Fork-Join Solver Report:");
        println!("  - workers: {}", self.workers);
        println!("  - conductivity: {}", self.conductivity);
    }
}
