//! Boundary conditions over global grid coordinates
use crate::types::BoundaryType;
use std::fmt;
use std::sync::Arc;

/// Predicate over global `(row, col)` coordinates.
pub type Condition = Arc<dyn Fn(usize, usize) -> bool + Send + Sync>;
/// Value function over global `(row, col)` coordinates.
pub type ValueFunction<T> = Arc<dyn Fn(usize, usize) -> T + Send + Sync>;

/// A fixed-value condition: every cell matching `condition` takes `value`.
pub struct Boundary<T> {
    condition: Condition,
    value: ValueFunction<T>,
}

impl<T> Boundary<T> {
    /// Create a boundary from a predicate and a value function.
    pub fn new(
        condition: impl Fn(usize, usize) -> bool + Send + Sync + 'static,
        value: impl Fn(usize, usize) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            condition: Arc::new(condition),
            value: Arc::new(value),
        }
    }

    /// Create a boundary with the same value on every matching cell.
    pub fn constant(
        condition: impl Fn(usize, usize) -> bool + Send + Sync + 'static,
        value: T,
    ) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self::new(condition, move |_, _| value.clone())
    }

    /// Does the predicate hold at `(i, j)`?
    pub fn applies(&self, i: usize, j: usize) -> bool {
        (self.condition)(i, j)
    }

    /// Value at `(i, j)`
    pub fn value(&self, i: usize, j: usize) -> T {
        (self.value)(i, j)
    }
}

impl<T> Clone for Boundary<T> {
    fn clone(&self) -> Self {
        Self {
            condition: Arc::clone(&self.condition),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> fmt::Debug for Boundary<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Boundary").finish_non_exhaustive()
    }
}

/// Ordered collection of boundaries. The first matching entry wins.
#[derive(Debug)]
pub struct Bound<T> {
    boundary_type: BoundaryType,
    boundaries: Vec<Boundary<T>>,
}

impl<T> Default for Bound<T> {
    fn default() -> Self {
        Self::new(BoundaryType::Dirichlet)
    }
}

impl<T> Clone for Bound<T> {
    fn clone(&self) -> Self {
        Self {
            boundary_type: self.boundary_type,
            boundaries: self.boundaries.clone(),
        }
    }
}

impl<T> Bound<T> {
    /// Create an empty bound of the given type.
    pub fn new(boundary_type: BoundaryType) -> Self {
        Self {
            boundary_type,
            boundaries: vec![],
        }
    }

    /// Create a bound from an existing list of boundaries.
    pub fn from_boundaries(boundary_type: BoundaryType, boundaries: Vec<Boundary<T>>) -> Self {
        Self {
            boundary_type,
            boundaries,
        }
    }

    /// The boundary type
    pub fn boundary_type(&self) -> BoundaryType {
        self.boundary_type
    }

    /// Set the boundary type
    pub fn set_boundary_type(&mut self, boundary_type: BoundaryType) {
        self.boundary_type = boundary_type;
    }

    /// Boundaries in insertion order
    pub fn boundaries(&self) -> &[Boundary<T>] {
        &self.boundaries
    }

    /// Number of boundaries
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Is the bound empty?
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Append a boundary. It takes effect only where no earlier entry matches.
    pub fn add_boundary(&mut self, boundary: Boundary<T>) {
        self.boundaries.push(boundary);
    }

    /// The first matching boundary at global `(i, j)`, if any.
    pub fn find(&self, i: usize, j: usize) -> Option<&Boundary<T>> {
        self.boundaries.iter().find(|b| b.applies(i, j))
    }

    /// The fixed value at global `(i, j)`, or `None` if the cell is free.
    pub fn value_at(&self, i: usize, j: usize) -> Option<T> {
        self.find(i, j).map(|b| b.value(i, j))
    }

    /// Keep only the boundaries that match at least one cell of the block
    /// `rows x cols` starting at global `(row_offset, col_offset)`.
    ///
    /// Order is preserved, so evaluation inside the block is unchanged.
    pub fn restrict_to_block(
        &self,
        row_offset: usize,
        col_offset: usize,
        rows: usize,
        cols: usize,
    ) -> Self {
        let boundaries = self
            .boundaries
            .iter()
            .filter(|b| {
                (row_offset..row_offset + rows)
                    .any(|i| (col_offset..col_offset + cols).any(|j| b.applies(i, j)))
            })
            .cloned()
            .collect();
        Self {
            boundary_type: self.boundary_type,
            boundaries,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grid::Grid;

    #[test]
    fn test_default_type() {
        let bound = Bound::<f64>::default();
        assert_eq!(bound.boundary_type(), BoundaryType::Dirichlet);
        assert!(bound.is_empty());
    }

    #[test]
    fn test_first_match_wins() {
        let mut bound = Bound::new(BoundaryType::Dirichlet);
        bound.add_boundary(Boundary::constant(|i, _| i == 0, 1.0));
        bound.add_boundary(Boundary::constant(|i, _| i == 1, 2.0));
        bound.add_boundary(Boundary::constant(|i, _| i <= 1, 5.0));

        let mut grid = Grid::<f64>::square(4);
        for i in 0..4 {
            for j in 0..4 {
                if let Some(v) = bound.value_at(i, j) {
                    grid[(i, j)] = v;
                }
            }
        }
        for j in 0..4 {
            assert_eq!(grid[(0, j)], 1.0);
            assert_eq!(grid[(1, j)], 2.0);
            assert_eq!(grid[(2, j)], 0.0);
            assert_eq!(grid[(3, j)], 0.0);
        }
    }

    #[test]
    fn test_value_function() {
        let bound = Bound::from_boundaries(
            BoundaryType::Dirichlet,
            vec![Boundary::new(|_, j| j == 3, |i, _| i as f64 * 0.5)],
        );
        assert_eq!(bound.value_at(4, 3), Some(2.0));
        assert_eq!(bound.value_at(4, 2), None);
    }

    #[test]
    fn test_restrict_to_block() {
        let mut bound = Bound::new(BoundaryType::Dirichlet);
        bound.add_boundary(Boundary::constant(|i, _| i == 0, 1.0));
        bound.add_boundary(Boundary::constant(|_, j| j == 7, 2.0));
        bound.add_boundary(Boundary::constant(|i, j| i == 5 && j == 5, 3.0));

        // lower left 4x4 block of an 8x8 grid
        let local = bound.restrict_to_block(4, 0, 4, 4);
        assert_eq!(local.len(), 0);

        // lower right block touches the right edge and the single cell
        let local = bound.restrict_to_block(4, 4, 4, 4);
        assert_eq!(local.len(), 2);
        assert_eq!(local.value_at(5, 7), Some(2.0));
        assert_eq!(local.value_at(5, 5), Some(3.0));

        // evaluation inside the block is unchanged
        let local = bound.restrict_to_block(0, 4, 4, 4);
        for i in 0..4 {
            for j in 4..8 {
                assert_eq!(local.value_at(i, j), bound.value_at(i, j));
            }
        }
    }
}
