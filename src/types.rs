//! General type definitions
use num::Float;
use std::fmt::{Debug, Display};
use std::path::PathBuf;

/// Real scalar types the solver operates on.
#[cfg(not(feature = "mpi"))]
pub trait RealScalar: Float + Default + Debug + Display + Send + Sync + 'static {}
#[cfg(not(feature = "mpi"))]
impl<T: Float + Default + Debug + Display + Send + Sync + 'static> RealScalar for T {}

/// Real scalar types the solver operates on.
///
/// With MPI enabled the type must also map onto a predefined MPI datatype.
#[cfg(feature = "mpi")]
pub trait RealScalar:
    Float
    + Default
    + Debug
    + Display
    + Send
    + Sync
    + 'static
    + mpi::traits::Equivalence<Out = mpi::datatype::SystemDatatype>
{
}
#[cfg(feature = "mpi")]
impl<T> RealScalar for T where
    T: Float
        + Default
        + Debug
        + Display
        + Send
        + Sync
        + 'static
        + mpi::traits::Equivalence<Out = mpi::datatype::SystemDatatype>
{
}

/// Kind of boundary condition held by a [crate::bound::Bound].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryType {
    /// Fixed values on the cells matched by each predicate.
    #[default]
    Dirichlet,
    /// Declared for completeness. Solving with it is rejected.
    Periodic,
}

/// Terminal state of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// The global metric dropped below epsilon.
    Converged,
    /// The iteration cap was reached first.
    MaxIterReached,
}

/// How the per-cell update is executed inside one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// Single threaded sweep.
    #[default]
    Sequential,
    /// Rows of the tile are updated on the rayon thread pool.
    Parallel,
}

/// Generic error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Invalid decomposition, grid shape or process group setup.
    #[error("Configuration Error: {0}")]
    Configuration(String),
    /// A writer could not create or write its target.
    #[error("IO Error on {}: {source}", .path.display())]
    Io {
        /// Target of the failed operation
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
}

/// Result Type
pub type Result<T> = std::result::Result<T, Error>;
