//! Poisson2d
//!
//! Distributed Jacobi relaxation of the 2D Poisson equation on a rectangular
//! grid with Dirichlet boundary conditions, plus the gradient and the rotated
//! velocity field derived from the converged potential.
#![cfg_attr(feature = "strict", deny(warnings))]
#![warn(missing_docs)]

#[cfg(feature = "mpi")]
#[macro_use]
extern crate lazy_static;

pub mod bound;
pub mod config;
pub mod grid;
pub mod io;
pub mod solver;
pub mod topology;
pub mod traits;
pub mod transport;
pub mod types;

pub use bound::{Bound, Boundary};
pub use config::RunParameters;
pub use grid::Grid;
pub use solver::{SolveReport, Solver, SolverOptions};
pub use topology::ProcessTopology;
pub use types::{BoundaryType, Error, Execution, RealScalar, Result, SolveStatus};
