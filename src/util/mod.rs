pub mod indexing;
mod shape;

pub use indexing::*;
pub use nalgebra::vector;
pub use shape::*;

/// Grid coordinate, `[row, col]`.
pub type Coord = nalgebra::Vector2<i32>;

/// Physical location of a node, `[x, y]`.
pub type Position = nalgebra::Vector2<f64>;
