use crate::mesh::*;
use rand::prelude::*;
use rand::rngs::StdRng;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum ICType {
    /// Every free node starts at the default temperature.
    #[default]
    Uniform,
    /// Free nodes start at the default temperature plus a uniform
    /// perturbation in `[-spread, spread]`.
    Rand { seed: u64, spread: f64 },
}

/// Perturb free node temperatures, seeded so the mesh only depends
/// on `seed`.
pub(crate) fn rand_ic(nodes: &mut [Node], seed: u64, spread: f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let spread = spread.abs();
    for node in nodes.iter_mut().filter(|n| n.is_free()) {
        node.temperature += rng.gen_range(-spread..=spread);
    }
}

pub(crate) fn generate_ic(nodes: &mut [Node], ic_type: ICType) {
    match ic_type {
        // Nodes are initialized to the default temperature
        ICType::Uniform => {}
        ICType::Rand { seed, spread } => {
            rand_ic(nodes, seed, spread);
        }
    }
}
