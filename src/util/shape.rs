use crate::util::*;

/// Extent of a mesh and its row-major addressing.
/// A 1D chain is stored as a single row.
#[derive(Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct MeshShape {
    width: usize,
    height: usize,
    dimension: usize,
}

impl MeshShape {
    pub fn chain(len: usize) -> Self {
        MeshShape {
            width: len,
            height: 1,
            dimension: 1,
        }
    }

    pub fn grid(width: usize, height: usize) -> Self {
        MeshShape {
            width,
            height,
            dimension: 2,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of nodes in one decomposition unit,
    /// a single node for chains and a full row for grids.
    #[inline]
    pub fn unit_len(&self) -> usize {
        match self.dimension {
            1 => 1,
            _ => self.width,
        }
    }

    /// Number of decomposition units.
    #[inline]
    pub fn units(&self) -> usize {
        self.len() / self.unit_len()
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.height && col < self.width);
        coord_to_linear(&vector![row as i32, col as i32], self.width)
    }

    #[inline]
    pub fn coord(&self, index: usize) -> Coord {
        debug_assert!(index < self.len());
        linear_to_coord(index, self.width)
    }

    /// Linear index of the node at `offset` from `index`, if it exists.
    #[inline]
    pub fn neighbor(&self, index: usize, offset: &Coord) -> Option<usize> {
        offset_in_bounds(&self.coord(index), offset, self.width, self.height)
            .map(|c| coord_to_linear(&c, self.width))
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn units_test() {
        let chain = MeshShape::chain(17);
        assert_eq!(chain.len(), 17);
        assert_eq!(chain.unit_len(), 1);
        assert_eq!(chain.units(), 17);
        assert_eq!(chain.dimension(), 1);

        let grid = MeshShape::grid(7, 5);
        assert_eq!(grid.len(), 35);
        assert_eq!(grid.unit_len(), 7);
        assert_eq!(grid.units(), 5);
        assert_eq!(grid.dimension(), 2);
    }

    #[test]
    fn neighbor_test() {
        let grid = MeshShape::grid(4, 3);
        let i = grid.index(1, 3);
        assert_eq!(i, 7);
        assert_eq!(grid.neighbor(i, &vector![0, 1]), None);
        assert_eq!(grid.neighbor(i, &vector![0, -1]), Some(6));
        assert_eq!(grid.neighbor(i, &vector![-1, 0]), Some(3));
        assert_eq!(grid.neighbor(i, &vector![1, 0]), Some(11));

        let chain = MeshShape::chain(3);
        assert_eq!(chain.neighbor(0, &vector![0, -1]), None);
        assert_eq!(chain.neighbor(0, &vector![0, 1]), Some(1));
        assert_eq!(chain.neighbor(2, &vector![0, 1]), None);
    }
}
