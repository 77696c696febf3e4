//! The mesh is a contiguous buffer of nodes addressed row-major.
//! Every other component addresses nodes by their global linear index,
//! which never changes during a run.

mod init;
mod initial_conditions;
mod node;

pub use initial_conditions::*;
pub use node::*;

use crate::error::*;
use crate::util::*;
use clap::ValueEnum;

/// Chunk size for parallel work over the node buffer.
pub(crate) const MESH_CHUNK_SIZE: usize = 4096;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Default)]
pub enum Topology {
    /// 1D chain with fixed end points.
    #[default]
    Bar,
    /// Rectangle with a fixed perimeter.
    Plate,
    /// Rectangle with only two opposite corners fixed.
    Insulated,
    /// Square with a rectangular cut-out, open to the left side.
    Cavity,
}

/// Everything needed to build the initial mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshSpec {
    pub topology: Topology,
    pub width: usize,
    pub height: Option<usize>,
    pub left_temperature: f64,
    pub right_temperature: f64,
    pub default_temperature: f64,
    /// Strength of the optional hot spot in the middle of the mesh.
    pub hot_spot: Option<f64>,
    pub initial_condition: ICType,
}

impl MeshSpec {
    pub const DEFAULT_TEMPERATURE: f64 = 200.0;

    pub fn new(
        topology: Topology,
        width: usize,
        height: Option<usize>,
        left_temperature: f64,
        right_temperature: f64,
    ) -> Self {
        MeshSpec {
            topology,
            width,
            height,
            left_temperature,
            right_temperature,
            default_temperature: Self::DEFAULT_TEMPERATURE,
            hot_spot: None,
            initial_condition: ICType::default(),
        }
    }

    pub fn bar(n: usize, left_temperature: f64, right_temperature: f64) -> Self {
        Self::new(Topology::Bar, n, None, left_temperature, right_temperature)
    }

    pub fn plate(
        width: usize,
        height: usize,
        left_temperature: f64,
        right_temperature: f64,
    ) -> Self {
        Self::new(
            Topology::Plate,
            width,
            Some(height),
            left_temperature,
            right_temperature,
        )
    }

    pub fn insulated(
        width: usize,
        height: usize,
        left_temperature: f64,
        right_temperature: f64,
    ) -> Self {
        Self::new(
            Topology::Insulated,
            width,
            Some(height),
            left_temperature,
            right_temperature,
        )
    }

    pub fn cavity(n: usize, left_temperature: f64, right_temperature: f64) -> Self {
        Self::new(Topology::Cavity, n, None, left_temperature, right_temperature)
    }

    pub fn with_default_temperature(mut self, t: f64) -> Self {
        self.default_temperature = t;
        self
    }

    pub fn with_hot_spot(mut self, strength: f64) -> Self {
        self.hot_spot = Some(strength);
        self
    }

    pub fn with_initial_condition(mut self, ic: ICType) -> Self {
        self.initial_condition = ic;
        self
    }

    /// Mesh dimensions, validated for the topology.
    pub fn shape(&self) -> HeatResult<MeshShape> {
        if self.width < 2 {
            return Err(HeatError::config(format!(
                "mesh width must be at least 2, got {}",
                self.width
            )));
        }
        let height = match self.topology {
            Topology::Bar => 1,
            _ => self.height.unwrap_or(self.width),
        };
        let max = i32::MAX as usize;
        if self.width > max || height > max {
            return Err(HeatError::config(format!(
                "mesh dimensions must not exceed {max}, got {}x{height}",
                self.width
            )));
        }
        if self.width.checked_mul(height).is_none() {
            return Err(HeatError::config(format!(
                "mesh of {}x{height} nodes overflows the node count",
                self.width
            )));
        }
        match self.topology {
            Topology::Bar => match self.height {
                None | Some(1) => Ok(MeshShape::chain(self.width)),
                Some(h) => Err(HeatError::config(format!(
                    "a bar has no height, got {h}"
                ))),
            },
            Topology::Plate | Topology::Insulated => {
                let height = self.height.unwrap_or(self.width);
                if height < 2 {
                    return Err(HeatError::config(format!(
                        "mesh height must be at least 2, got {height}"
                    )));
                }
                Ok(MeshShape::grid(self.width, height))
            }
            Topology::Cavity => {
                if let Some(h) = self.height {
                    if h != self.width {
                        return Err(HeatError::config(format!(
                            "cavity mesh must be square, got {}x{h}",
                            self.width
                        )));
                    }
                }
                if self.width < init::CAVITY_MIN_SIZE {
                    return Err(HeatError::config(format!(
                        "cavity mesh needs at least {} nodes per side, got {}",
                        init::CAVITY_MIN_SIZE,
                        self.width
                    )));
                }
                Ok(MeshShape::grid(self.width, self.width))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    shape: MeshShape,
    spacing: f64,
    nodes: Vec<Node>,
}

impl Mesh {
    /// Build a fully populated mesh, or fail without producing one.
    pub fn initialize(spec: &MeshSpec) -> HeatResult<Self> {
        init::build(spec)
    }

    pub(crate) fn from_parts(shape: MeshShape, spacing: f64, nodes: Vec<Node>) -> Self {
        debug_assert_eq!(shape.len(), nodes.len());
        Mesh {
            shape,
            spacing,
            nodes,
        }
    }

    #[inline]
    pub fn shape(&self) -> &MeshShape {
        &self.shape
    }

    /// Distance between adjacent nodes.
    #[inline]
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    #[track_caller]
    #[inline]
    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Only `temperature` and `accumulator` are writable from outside.
    #[track_caller]
    #[inline]
    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.nodes[index]
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.nodes.iter().map(|n| n.temperature).collect()
    }

    /// Overwrite the temperatures starting at global index `low`.
    pub(crate) fn set_temperatures(&mut self, low: usize, temperatures: &[f64]) {
        for (node, t) in self.nodes[low..low + temperatures.len()]
            .iter_mut()
            .zip(temperatures)
        {
            node.temperature = *t;
        }
    }

    pub fn fixed_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_fixed()).count()
    }

    pub fn active_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_active()).count()
    }

    pub fn accumulators_are_zero(&self) -> bool {
        self.nodes.iter().all(|n| n.accumulator == 0.0)
    }

}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn shape_validation_test() {
        assert!(MeshSpec::bar(1, 400.0, 200.0).shape().is_err());
        assert!(MeshSpec::bar(2, 400.0, 200.0).shape().is_ok());
        assert!(MeshSpec::plate(5, 1, 400.0, 200.0).shape().is_err());
        assert!(MeshSpec::plate(1, 5, 400.0, 200.0).shape().is_err());
        assert_eq!(
            MeshSpec::plate(5, 3, 400.0, 200.0).shape().unwrap(),
            MeshShape::grid(5, 3)
        );
        assert!(MeshSpec::cavity(9, 400.0, 200.0).shape().is_err());
        assert!(MeshSpec::cavity(10, 400.0, 200.0).shape().is_ok());

        let mut spec = MeshSpec::bar(10, 400.0, 200.0);
        spec.height = Some(4);
        assert!(matches!(spec.shape(), Err(HeatError::Configuration(_))));
    }

    #[test]
    fn oversized_shape_test() {
        let too_wide = i32::MAX as usize + 1;
        for spec in [
            MeshSpec::bar(too_wide, 400.0, 200.0),
            MeshSpec::plate(too_wide, too_wide, 400.0, 200.0),
            MeshSpec::plate(10, too_wide, 400.0, 200.0),
            MeshSpec::insulated(too_wide, 3, 400.0, 200.0),
            MeshSpec::cavity(too_wide, 400.0, 200.0),
            MeshSpec::plate(usize::MAX, usize::MAX, 400.0, 200.0),
        ] {
            assert!(matches!(spec.shape(), Err(HeatError::Configuration(_))));
            assert!(matches!(
                Mesh::initialize(&spec),
                Err(HeatError::Configuration(_))
            ));
        }
        let widest = i32::MAX as usize;
        assert_eq!(
            MeshSpec::bar(widest, 400.0, 200.0).shape().unwrap().len(),
            widest
        );
    }

    #[test]
    fn set_temperatures_test() {
        let mut mesh = Mesh::initialize(&MeshSpec::bar(6, 400.0, 200.0)).unwrap();
        mesh.set_temperatures(2, &[1.0, 2.0]);
        assert_eq!(
            mesh.temperatures(),
            vec![400.0, 200.0, 1.0, 2.0, 200.0, 200.0]
        );
    }
}
