//! MPI transport
use super::runtime::Runtime;
use crate::traits::{Layout, TransferDescriptor, Transport};
use crate::types::{RealScalar, Result};
use log::trace;
use mpi::collective::SystemOperation;
use mpi::datatype::{UserDatatype, View};
use mpi::point_to_point::send_receive_into;
use mpi::topology::SimpleCommunicator;
use mpi::traits::{Communicator, CommunicatorCollectives, Destination, Equivalence, Root, Source};
use mpi::Count;

/// A committed MPI vector datatype together with its layout.
///
/// The datatype is freed when the descriptor is dropped.
pub struct MpiDescriptor {
    layout: Layout,
    datatype: UserDatatype,
}

impl TransferDescriptor for MpiDescriptor {
    fn layout(&self) -> Layout {
        self.layout
    }
}

/// Transport over an MPI communicator.
pub struct MpiTransport {
    comm: SimpleCommunicator,
    _runtime: Runtime,
}

impl MpiTransport {
    /// Transport over `MPI_COMM_WORLD`, initialising MPI if needed.
    pub fn world() -> Result<Self> {
        let runtime = Runtime::acquire()?;
        Ok(Self {
            comm: runtime.world(),
            _runtime: runtime,
        })
    }

    /// The underlying communicator
    pub fn comm(&self) -> &SimpleCommunicator {
        &self.comm
    }
}

impl Transport for MpiTransport {
    type Descriptor = MpiDescriptor;

    fn rank(&self) -> usize {
        self.comm.rank() as usize
    }
    fn size(&self) -> usize {
        self.comm.size() as usize
    }
    fn create_descriptor<T: RealScalar>(&self, layout: Layout) -> MpiDescriptor {
        trace!("Creating MPI vector type {:?}", layout);
        MpiDescriptor {
            layout,
            datatype: UserDatatype::vector(
                layout.count as Count,
                1,
                layout.stride as Count,
                &T::equivalent_datatype(),
            ),
        }
    }
    fn send_receive<T: RealScalar>(
        &self,
        data: &[T],
        offset: usize,
        descriptor: &MpiDescriptor,
        destination: Option<usize>,
        recv: &mut [T],
        source: Option<usize>,
    ) {
        let buffer = &data[offset..offset + descriptor.layout.extent()];
        // SAFETY: the slice spans exactly the extent of one vector datatype element.
        let send = unsafe { View::with_count_and_datatype(buffer, 1, &descriptor.datatype) };
        match (destination, source) {
            (Some(to), Some(from)) => {
                let _status = send_receive_into(
                    &send,
                    &self.comm.process_at_rank(to as i32),
                    recv,
                    &self.comm.process_at_rank(from as i32),
                );
            }
            (Some(to), None) => self.comm.process_at_rank(to as i32).send(&send),
            (None, Some(from)) => {
                let _status = self.comm.process_at_rank(from as i32).receive_into(recv);
            }
            (None, None) => {}
        }
    }
    fn all_reduce_sum<T: RealScalar>(&self, value: T) -> T {
        let mut total = T::zero();
        self.comm
            .all_reduce_into(&value, &mut total, SystemOperation::sum());
        total
    }
    fn broadcast_words(&self, words: &mut [u64], root: usize) {
        self.comm.process_at_rank(root as i32).broadcast_into(words);
    }
    fn barrier(&self) {
        self.comm.barrier();
    }
}
