//! Two phase Jacobi update shared by every solver.
//!
//! Accumulate sums the temperatures of a node's live neighbors into its
//! accumulator, finalize turns the sum into the new temperature.
//! All temperature reads of a step happen in accumulate, so running
//! accumulate over the whole mesh before finalizing any node gives a
//! Jacobi update regardless of how the ranges are split.

use crate::mesh::*;
use crate::util::*;
use std::ops::Range;

pub const DEFAULT_CONDUCTIVITY: f64 = 50.0;

/// Neighbor direction of a stencil pass.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Axis {
    /// Left and right neighbors in the same row.
    Row,
    /// Neighbors above and below in the same column.
    Column,
}

impl Axis {
    /// `[row, col]` offsets of the two neighbors along the axis.
    #[inline]
    pub fn offsets(&self) -> [Coord; 2] {
        match self {
            Axis::Row => [vector![0, -1], vector![0, 1]],
            Axis::Column => [vector![-1, 0], vector![1, 0]],
        }
    }
}

/// Axes the stencil walks for a mesh dimension.
pub fn axes(dimension: usize) -> &'static [Axis] {
    match dimension {
        1 => &[Axis::Row],
        _ => &[Axis::Row, Axis::Column],
    }
}

/// Read access to temperatures by global index.
pub trait TemperatureLookup {
    fn shape(&self) -> &MeshShape;

    /// Temperature at `index`, `None` when the node is inactive
    /// or not visible to the caller.
    fn temperature(&self, index: usize) -> Option<f64>;
}

/// Storage the kernel can update in place.
pub trait NodeStore: TemperatureLookup {
    /// Whether the stencil updates the node at `index`.
    fn participates(&self, index: usize) -> bool;

    fn add_to_accumulator(&mut self, index: usize, value: f64);

    fn node_mut(&mut self, index: usize) -> &mut Node;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct KernelParams {
    pub spacing: f64,
    pub conductivity: f64,
}

impl KernelParams {
    pub fn new(spacing: f64, conductivity: f64) -> Self {
        KernelParams {
            spacing,
            conductivity,
        }
    }

    pub fn for_mesh(mesh: &Mesh) -> Self {
        Self::new(mesh.spacing(), DEFAULT_CONDUCTIVITY)
    }

    pub fn with_conductivity(mut self, conductivity: f64) -> Self {
        self.conductivity = conductivity;
        self
    }

    /// Contribution of a heat source to the accumulated sum.
    #[inline]
    pub fn source_term(&self, heat_source: f64) -> f64 {
        heat_source * self.spacing * self.spacing / self.conductivity
    }
}

/// Sum of the available neighbor temperatures of `index` along `axis`.
#[inline]
pub fn gather_sum<L: TemperatureLookup + ?Sized>(
    lookup: &L,
    index: usize,
    axis: Axis,
) -> f64 {
    let shape = lookup.shape();
    let mut sum = 0.0;
    for offset in axis.offsets() {
        if let Some(t) = shape
            .neighbor(index, &offset)
            .and_then(|n| lookup.temperature(n))
        {
            sum += t;
        }
    }
    sum
}

/// Accumulate one axis over a range of global indices.
pub fn accumulate_pass<S: NodeStore + ?Sized>(
    store: &mut S,
    range: Range<usize>,
    axis: Axis,
) {
    for i in range {
        if store.participates(i) {
            let sum = gather_sum(&*store, i, axis);
            store.add_to_accumulator(i, sum);
        }
    }
}

/// Accumulate every axis of the mesh over a range of global indices.
pub fn accumulate<S: NodeStore + ?Sized>(store: &mut S, range: Range<usize>) {
    profiling::scope!("kernel::accumulate");
    let dimension = store.shape().dimension();
    for axis in axes(dimension) {
        accumulate_pass(store, range.clone(), *axis);
    }
}

/// Average a single node and reset its accumulator.
/// Fixed and inactive nodes are left untouched.
#[inline]
pub fn finalize_node(node: &mut Node, dimension: usize, params: &KernelParams) {
    if !node.is_free() {
        return;
    }
    if let Some(divisor) = node.class().divisor(dimension) {
        let sum = node.accumulator + params.source_term(node.heat_source());
        node.temperature = sum / divisor;
        node.accumulator = 0.0;
    }
}

pub fn finalize<S: NodeStore + ?Sized>(
    store: &mut S,
    range: Range<usize>,
    params: &KernelParams,
) {
    profiling::scope!("kernel::finalize");
    let dimension = store.shape().dimension();
    for i in range {
        finalize_node(store.node_mut(i), dimension, params);
    }
}

impl TemperatureLookup for Mesh {
    #[inline]
    fn shape(&self) -> &MeshShape {
        Mesh::shape(self)
    }

    #[inline]
    fn temperature(&self, index: usize) -> Option<f64> {
        let node = self.node(index);
        node.is_active().then_some(node.temperature)
    }
}

impl NodeStore for Mesh {
    #[inline]
    fn participates(&self, index: usize) -> bool {
        self.node(index).is_free()
    }

    #[inline]
    fn add_to_accumulator(&mut self, index: usize, value: f64) {
        self.nodes_mut()[index].accumulator += value;
    }

    #[inline]
    fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes_mut()[index]
    }
}
