use crate::util::*;

/// How many live neighbors a node averages over.
/// Fixed nodes hold their temperature for the whole run.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum NodeClass {
    /// Every geometric neighbor is live.
    #[default]
    Interior,
    /// Three live neighbors (2D only).
    Edge,
    /// Two live neighbors (2D only).
    Corner,
    Fixed,
}

impl NodeClass {
    /// Derive the class from the live neighbor count of a free node.
    pub fn from_live_neighbors(count: usize, dimension: usize) -> Option<Self> {
        match (dimension, count) {
            (1, 2) => Some(NodeClass::Interior),
            (2, 4) => Some(NodeClass::Interior),
            (2, 3) => Some(NodeClass::Edge),
            (2, 2) => Some(NodeClass::Corner),
            _ => None,
        }
    }

    /// Averaging divisor, `None` for fixed nodes.
    #[inline]
    pub fn divisor(&self, dimension: usize) -> Option<f64> {
        match self {
            NodeClass::Interior => Some(2.0 * dimension as f64),
            NodeClass::Edge => Some(3.0),
            NodeClass::Corner => Some(2.0),
            NodeClass::Fixed => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Node {
    pub temperature: f64,

    /// Scratch sum for the step in flight, zero outside of it.
    pub accumulator: f64,

    pub(crate) position: Position,
    pub(crate) class: NodeClass,
    pub(crate) is_active: bool,
    pub(crate) heat_source: f64,
}

impl Default for Node {
    fn default() -> Self {
        Node::new(0.0, Position::zeros(), NodeClass::default())
    }
}

impl Node {
    pub fn new(temperature: f64, position: Position, class: NodeClass) -> Self {
        Node {
            temperature,
            accumulator: 0.0,
            position,
            class,
            is_active: true,
            heat_source: 0.0,
        }
    }

    /// Node excluded from the stencil and from output.
    pub fn inactive(position: Position) -> Self {
        Node {
            is_active: false,
            ..Node::new(0.0, position, NodeClass::Interior)
        }
    }

    #[inline]
    pub fn position(&self) -> &Position {
        &self.position
    }

    #[inline]
    pub fn class(&self) -> NodeClass {
        self.class
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    #[inline]
    pub fn heat_source(&self) -> f64 {
        self.heat_source
    }

    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.class == NodeClass::Fixed
    }

    /// Whether the node is updated by the stencil.
    #[inline]
    pub fn is_free(&self) -> bool {
        self.is_active && !self.is_fixed()
    }
}
