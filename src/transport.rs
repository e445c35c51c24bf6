//! Transport implementations
mod local;
#[cfg(feature = "mpi")]
mod mpi_comm;
#[cfg(feature = "mpi")]
pub mod runtime;
mod serial;

pub use local::{LocalDescriptor, LocalGroup, LocalTransport};
#[cfg(feature = "mpi")]
pub use mpi_comm::{MpiDescriptor, MpiTransport};
pub use serial::{SerialDescriptor, SerialTransport};
