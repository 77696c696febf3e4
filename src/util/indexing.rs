use crate::util::*;

/// Row-major linear index, columns go the fastest.
#[inline]
pub fn coord_to_linear(coord: &Coord, width: usize) -> usize {
    debug_assert!(coord[0] >= 0 && coord[1] >= 0);
    debug_assert!((coord[1] as usize) < width);
    coord[0] as usize * width + coord[1] as usize
}

#[inline]
pub fn linear_to_coord(linear_index: usize, width: usize) -> Coord {
    vector![(linear_index / width) as i32, (linear_index % width) as i32]
}

/// Apply `offset` to `coord`, returning `None` when the result leaves
/// the `height x width` box.
#[inline]
pub fn offset_in_bounds(
    coord: &Coord,
    offset: &Coord,
    width: usize,
    height: usize,
) -> Option<Coord> {
    let c = coord + offset;
    if c[0] < 0 || c[1] < 0 {
        return None;
    }
    if c[0] as usize >= height || c[1] as usize >= width {
        return None;
    }
    Some(c)
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn coord_to_linear_test() {
        assert_eq!(coord_to_linear(&vector![5, 7], 20), 5 * 20 + 7);
        assert_eq!(coord_to_linear(&vector![0, 5], 20), 5);
        assert_eq!(coord_to_linear(&vector![0, 0], 1), 0);
    }

    #[test]
    fn linear_to_coord_test() {
        assert_eq!(linear_to_coord(67, 10), vector![6, 7]);
        assert_eq!(linear_to_coord(67, 100), vector![0, 67]);
        assert_eq!(linear_to_coord(0, 7), vector![0, 0]);

        for i in 0..200 {
            let c = linear_to_coord(i, 13);
            assert_eq!(coord_to_linear(&c, 13), i);
        }
    }

    #[test]
    fn offset_in_bounds_test() {
        let c = vector![0, 0];
        assert_eq!(offset_in_bounds(&c, &vector![-1, 0], 5, 5), None);
        assert_eq!(offset_in_bounds(&c, &vector![0, -1], 5, 5), None);
        assert_eq!(
            offset_in_bounds(&c, &vector![1, 0], 5, 5),
            Some(vector![1, 0])
        );

        let c = vector![4, 2];
        assert_eq!(offset_in_bounds(&c, &vector![1, 0], 3, 5), None);
        assert_eq!(offset_in_bounds(&c, &vector![0, 1], 3, 5), None);
    }
}
