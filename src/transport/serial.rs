//! Single process transport
use crate::traits::{Layout, TransferDescriptor, Transport};
use crate::types::RealScalar;

/// Transport for a group of one process.
///
/// There are no neighbours and every reduction is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialTransport;

/// Descriptor of a [SerialTransport]
#[derive(Debug, Clone, Copy)]
pub struct SerialDescriptor(Layout);

impl TransferDescriptor for SerialDescriptor {
    fn layout(&self) -> Layout {
        self.0
    }
}

impl Transport for SerialTransport {
    type Descriptor = SerialDescriptor;

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }
    fn create_descriptor<T: RealScalar>(&self, layout: Layout) -> SerialDescriptor {
        SerialDescriptor(layout)
    }
    fn send_receive<T: RealScalar>(
        &self,
        data: &[T],
        offset: usize,
        descriptor: &SerialDescriptor,
        destination: Option<usize>,
        recv: &mut [T],
        source: Option<usize>,
    ) {
        // The only possible partner is this process itself.
        if destination.is_some() && source.is_some() {
            descriptor.0.gather(data, offset, recv);
        }
    }
    fn all_reduce_sum<T: RealScalar>(&self, value: T) -> T {
        value
    }
    fn broadcast_words(&self, _words: &mut [u64], _root: usize) {}
    fn barrier(&self) {}
}
