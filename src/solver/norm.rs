//! Default convergence metric and source term
use crate::grid::Grid;
use crate::types::RealScalar;
use itertools::iproduct;

/// Euclidean norm of `curr - prev`.
///
/// With `exclude_outer_ring` the outermost ring of cells is skipped.
pub fn euclidean_norm<T: RealScalar>(prev: &Grid<T>, curr: &Grid<T>, exclude_outer_ring: bool) -> T {
    debug_assert_eq!(prev.shape(), curr.shape());
    let skip = usize::from(exclude_outer_ring);
    let rows = skip..prev.rows().saturating_sub(skip);
    let cols = skip..prev.cols().saturating_sub(skip);
    iproduct!(rows, cols)
        .map(|(i, j)| {
            let d = curr[(i, j)] - prev[(i, j)];
            d * d
        })
        .fold(T::zero(), |acc, v| acc + v)
        .sqrt()
}

/// The Laplace source: zero everywhere.
pub fn zero_source<T: RealScalar>(_i: usize, _j: usize) -> T {
    T::zero()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm() {
        let prev = Grid::<f64>::new(3, 3);
        let mut curr = Grid::<f64>::new(3, 3);
        curr.fill(1.0);
        assert_relative_eq!(euclidean_norm(&prev, &curr, false), 3.0);
        assert_relative_eq!(euclidean_norm(&prev, &curr, true), 1.0);
        assert_eq!(euclidean_norm(&curr, &curr, false), 0.0);
    }

    #[test]
    fn test_norm_tiny_grid() {
        let prev = Grid::<f32>::new(1, 1);
        let curr = Grid::<f32>::from_data(1, 1, vec![2.0]).unwrap();
        assert_eq!(euclidean_norm(&prev, &curr, true), 0.0);
        assert_relative_eq!(euclidean_norm(&prev, &curr, false), 2.0);
    }
}
