//! Trait definitions

mod transport;

pub use transport::{Layout, TransferDescriptor, Transport};
