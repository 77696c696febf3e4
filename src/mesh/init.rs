use crate::error::*;
use crate::kernel::*;
use crate::mesh::*;
use crate::par_slice;
use crate::util::*;
use rayon::prelude::*;

/// Smallest cavity mesh with a non empty band around the cut-out.
pub(crate) const CAVITY_MIN_SIZE: usize = 10;

/// Diamond around the centre node.
const HOT_SPOT_OFFSETS: [[i32; 2]; 13] = [
    [0, 0],
    [0, 1],
    [0, -1],
    [1, 0],
    [-1, 0],
    [0, 2],
    [0, -2],
    [2, 0],
    [-2, 0],
    [1, 1],
    [-1, -1],
    [1, -1],
    [-1, 1],
];

pub(crate) fn build(spec: &MeshSpec) -> HeatResult<Mesh> {
    let shape = spec.shape()?;
    for (name, t) in [
        ("left", spec.left_temperature),
        ("right", spec.right_temperature),
        ("default", spec.default_temperature),
    ] {
        if !t.is_finite() {
            return Err(HeatError::config(format!(
                "{name} temperature must be finite, got {t}"
            )));
        }
    }
    if let Some(strength) = spec.hot_spot {
        if !strength.is_finite() {
            return Err(HeatError::config(format!(
                "hot spot strength must be finite, got {strength}"
            )));
        }
    }

    let spacing = 1.0 / (shape.width() - 1) as f64;
    let mut nodes = vec![Node::default(); shape.len()];
    let node_gen = |i: usize| -> Node {
        match spec.topology {
            Topology::Bar => bar_node(spec, &shape, spacing, i),
            Topology::Plate => plate_node(spec, &shape, spacing, i),
            Topology::Insulated => insulated_node(spec, &shape, spacing, i),
            Topology::Cavity => cavity_node(spec, &shape, spacing, i),
        }
    };
    par_slice::set_from_index(&mut nodes, node_gen, MESH_CHUNK_SIZE);

    classify(&shape, &mut nodes)?;
    if let Some(strength) = spec.hot_spot {
        seed_hot_spot(&shape, &mut nodes, strength);
    }
    generate_ic(&mut nodes, spec.initial_condition);

    let mesh = Mesh::from_parts(shape, spacing, nodes);
    log::debug!(
        "initialized {:?} mesh {}x{}: {} nodes, {} active, {} fixed",
        spec.topology,
        shape.width(),
        shape.height(),
        mesh.len(),
        mesh.active_count(),
        mesh.fixed_count()
    );
    Ok(mesh)
}

fn position(shape: &MeshShape, spacing: f64, index: usize) -> Position {
    let c = shape.coord(index);
    vector![c[1] as f64 * spacing, c[0] as f64 * spacing]
}

fn free_or_fixed(
    spec: &MeshSpec,
    fixed: Option<f64>,
    position: Position,
) -> Node {
    match fixed {
        Some(t) => Node::new(t, position, NodeClass::Fixed),
        None => Node::new(spec.default_temperature, position, NodeClass::Interior),
    }
}

fn bar_node(spec: &MeshSpec, shape: &MeshShape, spacing: f64, i: usize) -> Node {
    let fixed = if i == 0 {
        Some(spec.left_temperature)
    } else if i == shape.len() - 1 {
        Some(spec.right_temperature)
    } else {
        None
    };
    free_or_fixed(spec, fixed, position(shape, spacing, i))
}

fn plate_node(spec: &MeshSpec, shape: &MeshShape, spacing: f64, i: usize) -> Node {
    let c = shape.coord(i);
    let (row, col) = (c[0] as usize, c[1] as usize);
    let fixed = if row == 0 {
        Some(spec.left_temperature)
    } else if row == shape.height() - 1 {
        Some(spec.right_temperature)
    } else if col == 0 {
        Some(spec.left_temperature)
    } else if col == shape.width() - 1 {
        Some(spec.right_temperature)
    } else {
        None
    };
    free_or_fixed(spec, fixed, position(shape, spacing, i))
}

fn insulated_node(
    spec: &MeshSpec,
    shape: &MeshShape,
    spacing: f64,
    i: usize,
) -> Node {
    let fixed = if i == 0 {
        Some(spec.left_temperature)
    } else if i == shape.len() - 1 {
        Some(spec.right_temperature)
    } else {
        None
    };
    free_or_fixed(spec, fixed, position(shape, spacing, i))
}

fn cavity_node(spec: &MeshSpec, shape: &MeshShape, spacing: f64, i: usize) -> Node {
    let n = shape.width();
    let band = n / 10;
    let c = shape.coord(i);
    let (row, col) = (c[0] as usize, c[1] as usize);
    let p = position(shape, spacing, i);

    if row >= band && row < n - band && col < n - band {
        return Node::inactive(p);
    }

    let fixed = if col == 0 && row < band {
        Some(spec.left_temperature)
    } else if col == 0 && row >= n - band {
        Some(spec.right_temperature)
    } else {
        None
    };
    free_or_fixed(spec, fixed, p)
}

/// Count in-bounds active neighbors.
pub(crate) fn live_neighbor_count(
    shape: &MeshShape,
    nodes: &[Node],
    index: usize,
) -> usize {
    axes(shape.dimension())
        .iter()
        .flat_map(|axis| axis.offsets())
        .filter_map(|offset| shape.neighbor(index, &offset))
        .filter(|n| nodes[*n].is_active())
        .count()
}

/// Derive each free node's class from its live neighbors.
fn classify(shape: &MeshShape, nodes: &mut [Node]) -> HeatResult<()> {
    let view: &[Node] = nodes;
    let counts: Vec<usize> = (0..view.len())
        .into_par_iter()
        .map(|i| live_neighbor_count(shape, view, i))
        .collect();

    for (i, node) in nodes.iter_mut().enumerate() {
        if !node.is_free() {
            continue;
        }
        node.class = NodeClass::from_live_neighbors(counts[i], shape.dimension())
            .ok_or_else(|| {
                let c = shape.coord(i);
                HeatError::config(format!(
                    "node ({}, {}) has {} live neighbors, cannot average",
                    c[0], c[1], counts[i]
                ))
            })?;
    }
    Ok(())
}

/// Place the hot spot pattern around the centre, skipping nodes that
/// are fixed or inactive.
fn seed_hot_spot(shape: &MeshShape, nodes: &mut [Node], strength: f64) {
    let center = shape.index(shape.height() / 2, shape.width() / 2);
    let offsets: &[[i32; 2]] = match shape.dimension() {
        1 => &HOT_SPOT_OFFSETS[0..1],
        _ => &HOT_SPOT_OFFSETS,
    };
    for o in offsets {
        if let Some(i) = shape.neighbor(center, &vector![o[0], o[1]]) {
            if nodes[i].is_free() {
                nodes[i].heat_source = strength;
            }
        }
    }
}
