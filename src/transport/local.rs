//! Ranks emulated by threads of one process
//!
//! Each rank is a [LocalTransport] endpoint that is moved into its own
//! thread. Endpoints talk over one channel per ordered pair of ranks, so
//! messages between two ranks arrive in the order they were sent.
use crate::traits::{Layout, TransferDescriptor, Transport};
use crate::types::{Error, RealScalar, Result};
use std::any::Any;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Barrier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Halo,
    Reduce,
    Broadcast,
}

struct Message {
    tag: Tag,
    payload: Box<dyn Any + Send>,
}

/// Factory for a group of connected [LocalTransport] endpoints.
pub struct LocalGroup;

impl LocalGroup {
    /// Create `size` endpoints; endpoint `r` has rank `r`.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(size: usize) -> Result<Vec<LocalTransport>> {
        if size == 0 {
            return Err(Error::Configuration(
                "A process group needs at least one rank".to_string(),
            ));
        }
        let barrier = Arc::new(Barrier::new(size));

        // channels[from][to]
        let mut senders: Vec<Vec<Option<Sender<Message>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        let mut receivers: Vec<Vec<Option<Receiver<Message>>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for from in 0..size {
            for to in 0..size {
                let (tx, rx) = channel();
                senders[from][to] = Some(tx);
                receivers[to][from] = Some(rx);
            }
        }

        Ok(senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outbox, inbox))| LocalTransport {
                rank,
                size,
                outbox: outbox.into_iter().flatten().collect(),
                inbox: inbox.into_iter().flatten().collect(),
                barrier: Arc::clone(&barrier),
            })
            .collect())
    }
}

/// One rank of a thread-emulated process group.
pub struct LocalTransport {
    rank: usize,
    size: usize,
    outbox: Vec<Sender<Message>>,
    inbox: Vec<Receiver<Message>>,
    barrier: Arc<Barrier>,
}

/// Descriptor of a [LocalTransport]
#[derive(Debug, Clone, Copy)]
pub struct LocalDescriptor(Layout);

impl TransferDescriptor for LocalDescriptor {
    fn layout(&self) -> Layout {
        self.0
    }
}

impl LocalTransport {
    fn post<P: Any + Send>(&self, to: usize, tag: Tag, payload: P) {
        self.outbox[to]
            .send(Message {
                tag,
                payload: Box::new(payload),
            })
            .unwrap_or_else(|_| panic!("Rank {} hung up on rank {}", to, self.rank));
    }

    fn take<P: Any>(&self, from: usize, tag: Tag) -> P {
        let message = self.inbox[from]
            .recv()
            .unwrap_or_else(|_| panic!("Rank {} hung up on rank {}", from, self.rank));
        assert_eq!(
            message.tag, tag,
            "Rank {} expected a {:?} message from rank {}",
            self.rank, tag, from
        );
        match message.payload.downcast::<P>() {
            Ok(payload) => *payload,
            Err(_) => panic!(
                "Rank {} received a payload of the wrong type from rank {}",
                self.rank, from
            ),
        }
    }
}

impl Transport for LocalTransport {
    type Descriptor = LocalDescriptor;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }
    fn create_descriptor<T: RealScalar>(&self, layout: Layout) -> LocalDescriptor {
        LocalDescriptor(layout)
    }
    fn send_receive<T: RealScalar>(
        &self,
        data: &[T],
        offset: usize,
        descriptor: &LocalDescriptor,
        destination: Option<usize>,
        recv: &mut [T],
        source: Option<usize>,
    ) {
        // Channels are unbounded, so posting first cannot block.
        if let Some(to) = destination {
            let mut packed = vec![T::zero(); descriptor.0.count];
            descriptor.0.gather(data, offset, &mut packed);
            self.post(to, Tag::Halo, packed);
        }
        if let Some(from) = source {
            let values: Vec<T> = self.take(from, Tag::Halo);
            recv.copy_from_slice(&values);
        }
    }
    fn all_reduce_sum<T: RealScalar>(&self, value: T) -> T {
        // Summed on rank 0 in rank order so every rank sees the same bits.
        if self.rank == 0 {
            let mut total = value;
            for from in 1..self.size {
                total = total + self.take::<T>(from, Tag::Reduce);
            }
            for to in 1..self.size {
                self.post(to, Tag::Reduce, total);
            }
            total
        } else {
            self.post(0, Tag::Reduce, value);
            self.take(0, Tag::Reduce)
        }
    }
    fn broadcast_words(&self, words: &mut [u64], root: usize) {
        if self.rank == root {
            for to in (0..self.size).filter(|r| *r != root) {
                self.post(to, Tag::Broadcast, words.to_vec());
            }
        } else {
            let values: Vec<u64> = self.take(root, Tag::Broadcast);
            words.copy_from_slice(&values);
        }
    }
    fn barrier(&self) {
        self.barrier.wait();
    }
}
