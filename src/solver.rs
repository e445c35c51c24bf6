//! Jacobi solver for the Poisson equation
//!
//! Each process relaxes the tile of the global grid it owns. One iteration
//! is a fixed sequence: exchange the ghost ring with the neighbouring tiles,
//! update every owned cell from the previous iterate, compute the local part
//! of the convergence metric, sum it over all processes, and stop once the
//! total drops below epsilon or the iteration cap is reached.
mod halo;
pub mod norm;

use crate::bound::Bound;
use crate::grid::Grid;
use crate::topology::{ProcessTopology, TileExtent};
use crate::transport::SerialTransport;
use crate::traits::Transport;
use crate::types::{BoundaryType, Error, Execution, RealScalar, Result, SolveStatus};
use log::{debug, info, trace, warn};
use rayon::prelude::*;
use std::sync::Arc;

/// Convergence metric `(prev, curr, exclude_outer_ring) -> value` over owned tiles.
pub type NormFunction<T> = Arc<dyn Fn(&Grid<T>, &Grid<T>, bool) -> T + Send + Sync>;
/// Source term over global `(row, col)` coordinates.
pub type SourceFunction<T> = Arc<dyn Fn(usize, usize) -> T + Send + Sync>;

/// Options of a [Solver]
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions<T: RealScalar> {
    /// Stop once the global metric is below this value
    epsilon: T,
    /// Maximum number of iterations
    max_iter: usize,
    /// How the cell update runs inside one process
    execution: Execution,
    /// Skip the outermost ring of each owned tile when evaluating the metric
    exclude_outer_ring: bool,
}

impl<T: RealScalar> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            epsilon: T::from(1e-6).unwrap_or_else(T::epsilon),
            max_iter: 100,
            execution: Execution::Sequential,
            exclude_outer_ring: false,
        }
    }
}

impl<T: RealScalar> SolverOptions<T> {
    /// Convergence threshold
    pub fn epsilon(&self) -> T {
        self.epsilon
    }
    /// Set the convergence threshold
    pub fn set_epsilon(&mut self, epsilon: T) -> &mut Self {
        self.epsilon = epsilon;
        self
    }
    /// Iteration cap
    pub fn max_iter(&self) -> usize {
        self.max_iter
    }
    /// Set the iteration cap
    pub fn set_max_iter(&mut self, max_iter: usize) -> &mut Self {
        self.max_iter = max_iter;
        self
    }
    /// Execution strategy of the cell update
    pub fn execution(&self) -> Execution {
        self.execution
    }
    /// Set the execution strategy of the cell update
    pub fn set_execution(&mut self, execution: Execution) -> &mut Self {
        self.execution = execution;
        self
    }
    /// Is the outermost ring of each owned tile skipped by the metric?
    pub fn exclude_outer_ring(&self) -> bool {
        self.exclude_outer_ring
    }
    /// Choose whether the metric skips the outermost ring of each owned tile
    pub fn set_exclude_outer_ring(&mut self, exclude: bool) -> &mut Self {
        self.exclude_outer_ring = exclude;
        self
    }
}

/// Outcome of a solve on one process.
#[derive(Debug, Clone)]
pub struct SolveReport<T> {
    /// Final values of the owned tile, without ghost cells
    pub field: Grid<T>,
    /// The tile of the global grid that `field` covers
    pub tile: TileExtent,
    /// How the iteration ended
    pub status: SolveStatus,
    /// Number of iterations performed
    pub iterations: usize,
    /// Global metric of the last iteration, `None` if none ran
    pub residual: Option<T>,
}

impl<T> SolveReport<T> {
    /// Did the solve converge?
    pub fn converged(&self) -> bool {
        self.status == SolveStatus::Converged
    }
}

/// Jacobi relaxation of the 2D Poisson equation with a 5-point stencil.
pub struct Solver<T: RealScalar> {
    options: SolverOptions<T>,
    norm: NormFunction<T>,
    source: SourceFunction<T>,
}

impl<T: RealScalar> Default for Solver<T> {
    fn default() -> Self {
        Self::with_options(SolverOptions::default())
    }
}

impl<T: RealScalar> Solver<T> {
    /// Create a solver with the given threshold and iteration cap.
    pub fn new(epsilon: T, max_iter: usize) -> Self {
        let mut options = SolverOptions::default();
        options.set_epsilon(epsilon).set_max_iter(max_iter);
        Self::with_options(options)
    }

    /// Create a solver from options, with the Euclidean metric and zero source.
    pub fn with_options(options: SolverOptions<T>) -> Self {
        Self {
            options,
            norm: Arc::new(norm::euclidean_norm::<T>),
            source: Arc::new(norm::zero_source::<T>),
        }
    }

    /// Options
    pub fn options(&self) -> &SolverOptions<T> {
        &self.options
    }
    /// Mutable options
    pub fn options_mut(&mut self) -> &mut SolverOptions<T> {
        &mut self.options
    }
    /// Convergence threshold
    pub fn epsilon(&self) -> T {
        self.options.epsilon
    }
    /// Set the convergence threshold
    pub fn set_epsilon(&mut self, epsilon: T) {
        self.options.epsilon = epsilon;
    }
    /// Iteration cap
    pub fn max_iter(&self) -> usize {
        self.options.max_iter
    }
    /// Set the iteration cap
    pub fn set_max_iter(&mut self, max_iter: usize) {
        self.options.max_iter = max_iter;
    }

    /// Replace the convergence metric.
    ///
    /// On each process the metric sees the previous and current values of
    /// the owned tile only, without ghost cells, together with the
    /// `exclude_outer_ring` option. The per-process values are summed.
    pub fn set_norm(&mut self, norm: impl Fn(&Grid<T>, &Grid<T>, bool) -> T + Send + Sync + 'static) {
        self.norm = Arc::new(norm);
    }

    /// Replace the source term.
    pub fn set_source(&mut self, source: impl Fn(usize, usize) -> T + Send + Sync + 'static) {
        self.source = Arc::new(source);
    }

    /// Evaluate the convergence metric.
    pub fn norm(&self, prev: &Grid<T>, curr: &Grid<T>, exclude_outer_ring: bool) -> T {
        (self.norm)(prev, curr, exclude_outer_ring)
    }

    /// Evaluate the source term at global `(i, j)`.
    pub fn source(&self, i: usize, j: usize) -> T {
        (self.source)(i, j)
    }

    /// Solve on a `rows x cols` grid held by this process alone.
    pub fn solve(&self, rows: usize, cols: usize, bound: &Bound<T>) -> Result<SolveReport<T>> {
        self.solve_distributed(rows, cols, bound, &ProcessTopology::new(SerialTransport))
    }

    /// Solve on a `global_rows x global_cols` grid split over the processes of `topology`.
    ///
    /// Every process of the group must call this with the same arguments.
    /// Returns this process's tile. Both extents must divide evenly over
    /// the process mesh; otherwise this fails before any communication.
    pub fn solve_distributed<C: Transport>(
        &self,
        global_rows: usize,
        global_cols: usize,
        bound: &Bound<T>,
        topology: &ProcessTopology<C>,
    ) -> Result<SolveReport<T>> {
        if bound.boundary_type() == BoundaryType::Periodic {
            return Err(Error::Configuration(
                "Periodic boundaries are not supported".to_string(),
            ));
        }
        let tile = topology.tile(global_rows, global_cols)?;
        let local_bound =
            bound.restrict_to_block(tile.row_offset, tile.col_offset, tile.rows, tile.cols);
        debug!(
            "Rank {}: tile {}x{} at ({}, {}), {} of {} boundaries relevant",
            topology.rank(),
            tile.rows,
            tile.cols,
            tile.row_offset,
            tile.col_offset,
            local_bound.len(),
            bound.len()
        );

        let descriptors = topology.halo_descriptors::<T>(tile.rows, tile.cols);

        let mut prev_owned = Grid::new(tile.rows, tile.cols);
        prev_owned.fill_with(|i, j| {
            let (gi, gj) = tile.global(i, j);
            self.source(gi, gj)
        });
        let mut next_owned = Grid::new(tile.rows, tile.cols);
        let mut prev = prev_owned.clone();
        prev.resize_with_offset(tile.rows + 2, tile.cols + 2, (1, 1));
        let mut next = Grid::new(tile.rows + 2, tile.cols + 2);

        let mut status = SolveStatus::MaxIterReached;
        let mut iterations = 0;
        let mut residual = None;
        while iterations < self.options.max_iter {
            halo::exchange(&mut prev, topology, &descriptors);
            self.update(&prev, &mut next, &tile, &local_bound);
            strip_ghost_ring(&next, &mut next_owned);
            let partial = self.norm(&prev_owned, &next_owned, self.options.exclude_outer_ring);
            let metric = topology.transport().all_reduce_sum(partial);
            iterations += 1;
            residual = Some(metric);
            trace!("Iteration {}: metric {}", iterations, metric);

            std::mem::swap(&mut prev, &mut next);
            std::mem::swap(&mut prev_owned, &mut next_owned);
            if metric < self.options.epsilon {
                status = SolveStatus::Converged;
                break;
            }
        }

        match status {
            SolveStatus::Converged => info!(
                "Converged after {} iterations, metric {:?}",
                iterations, residual
            ),
            SolveStatus::MaxIterReached => warn!(
                "Stopped at the iteration cap of {}, metric {:?}",
                self.options.max_iter, residual
            ),
        }

        Ok(SolveReport {
            field: prev_owned,
            tile,
            status,
            iterations,
            residual,
        })
    }

    /// One Jacobi sweep over the owned cells of a ghosted tile.
    fn update(&self, prev: &Grid<T>, next: &mut Grid<T>, tile: &TileExtent, bound: &Bound<T>) {
        let pitch = tile.cols + 2;
        let two = T::one() + T::one();
        let quarter = T::one() / (two * two);
        let p = prev.data();

        let update_row = |i: usize, row: &mut [T]| {
            for j in 1..=tile.cols {
                let (gi, gj) = tile.global(i - 1, j - 1);
                row[j] = match bound.value_at(gi, gj) {
                    Some(value) => value,
                    None => {
                        let c = i * pitch + j;
                        quarter
                            * (p[c - pitch] + p[c + pitch] + p[c - 1] + p[c + 1] + self.source(gi, gj))
                    }
                };
            }
        };

        match self.options.execution {
            Execution::Sequential => next
                .data_mut()
                .chunks_mut(pitch)
                .enumerate()
                .skip(1)
                .take(tile.rows)
                .for_each(|(i, row)| update_row(i, row)),
            Execution::Parallel => next
                .data_mut()
                .par_chunks_mut(pitch)
                .enumerate()
                .skip(1)
                .take(tile.rows)
                .for_each(|(i, row)| update_row(i, row)),
        }
    }

    /// Central difference gradient `(d/dcol, d/drow)` of a field held by this process alone.
    pub fn gradient(&self, field: &Grid<T>) -> Grid<(T, T)> {
        self.gradient_distributed(field, &ProcessTopology::new(SerialTransport))
    }

    /// Central difference gradient `(d/dcol, d/drow)` of this process's tile.
    ///
    /// Neighbouring values come from one ghost ring exchange, so every
    /// process of the group must call this. On the edge of the global grid
    /// the derivative across that edge is left at zero.
    pub fn gradient_distributed<C: Transport>(
        &self,
        field: &Grid<T>,
        topology: &ProcessTopology<C>,
    ) -> Grid<(T, T)> {
        let rows = field.rows();
        let cols = field.cols();
        let descriptors = topology.halo_descriptors::<T>(rows, cols);
        let mut ghosted = field.clone();
        ghosted.resize_with_offset(rows + 2, cols + 2, (1, 1));
        halo::exchange(&mut ghosted, topology, &descriptors);

        let half = T::one() / (T::one() + T::one());
        let mut gradient = Grid::new(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                let (gi, gj) = (i + 1, j + 1);
                let at_edge_x = (j == 0 && topology.left().is_none())
                    || (j + 1 == cols && topology.right().is_none());
                let at_edge_y = (i == 0 && topology.top().is_none())
                    || (i + 1 == rows && topology.bottom().is_none());
                let x = if at_edge_x {
                    T::zero()
                } else {
                    (ghosted[(gi, gj + 1)] - ghosted[(gi, gj - 1)]) * half
                };
                let y = if at_edge_y {
                    T::zero()
                } else {
                    (ghosted[(gi + 1, gj)] - ghosted[(gi - 1, gj)]) * half
                };
                gradient[(i, j)] = (x, y);
            }
        }
        gradient
    }

    /// Velocity of the flow whose stream function has the given gradient.
    ///
    /// `velocity = (grad.y, -grad.x)`, except that a zero `grad.x` gives a
    /// zero (never negative zero) second component.
    pub fn velocity(&self, gradient: &Grid<(T, T)>) -> Grid<(T, T)> {
        let mut velocity = Grid::new(gradient.rows(), gradient.cols());
        for (v, (gx, gy)) in velocity.data_mut().iter_mut().zip(gradient.data()) {
            let second = if *gx == T::zero() { T::zero() } else { -*gx };
            *v = (*gy, second);
        }
        velocity
    }
}

/// Copy the owned cells of a tile with a one-cell ghost ring into `owned`.
fn strip_ghost_ring<T: RealScalar>(ghosted: &Grid<T>, owned: &mut Grid<T>) {
    let cols = owned.cols();
    let pitch = cols + 2;
    let source = ghosted.data();
    for (i, row) in owned.data_mut().chunks_mut(cols).enumerate() {
        let start = (i + 1) * pitch + 1;
        row.copy_from_slice(&source[start..start + cols]);
    }
}
