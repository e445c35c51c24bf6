//! Messaging between the processes of a decomposition
use crate::types::RealScalar;

/// A run of `count` elements spaced `stride` apart in a row-major buffer.
///
/// A grid row is a run with stride 1; a grid column uses the row pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Number of elements
    pub count: usize,
    /// Distance between consecutive elements
    pub stride: usize,
}

impl Layout {
    /// `count` consecutive elements
    pub fn contiguous(count: usize) -> Self {
        Self { count, stride: 1 }
    }

    /// `count` elements, `stride` apart
    pub fn strided(count: usize, stride: usize) -> Self {
        Self { count, stride }
    }

    /// Number of buffer slots spanned from the first to the last element.
    pub fn extent(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            (self.count - 1) * self.stride + 1
        }
    }

    /// Copy the described elements of `data`, starting at `offset`, into `out`.
    pub fn gather<T: Copy>(&self, data: &[T], offset: usize, out: &mut [T]) {
        debug_assert!(offset + self.extent() <= data.len());
        for (k, value) in out.iter_mut().take(self.count).enumerate() {
            *value = data[offset + k * self.stride];
        }
    }

    /// Write `values` into the described elements of `data`, starting at `offset`.
    pub fn scatter<T: Copy>(&self, values: &[T], data: &mut [T], offset: usize) {
        debug_assert!(offset + self.extent() <= data.len());
        for (k, value) in values.iter().take(self.count).enumerate() {
            data[offset + k * self.stride] = *value;
        }
    }
}

/// A transfer descriptor created by a [Transport].
pub trait TransferDescriptor {
    /// The layout the descriptor was created for
    fn layout(&self) -> Layout;
}

/// The minimal messaging interface the solver needs.
///
/// Ranks are numbered `0..size()`. Every operation is blocking; collective
/// operations must be called by every rank in the same order.
pub trait Transport {
    /// Transfer descriptor type
    type Descriptor: TransferDescriptor;

    /// Rank of this process
    fn rank(&self) -> usize;

    /// Number of processes in the group
    fn size(&self) -> usize;

    /// Create a descriptor for sending `layout` worth of `T` values.
    ///
    /// The descriptor is released when dropped.
    fn create_descriptor<T: RealScalar>(&self, layout: Layout) -> Self::Descriptor;

    /// Send the elements `descriptor` selects from `data[offset..]` to
    /// `destination` while receiving the same number of elements from
    /// `source` into the contiguous buffer `recv`.
    ///
    /// `None` on either side means there is no partner in that direction.
    #[allow(clippy::too_many_arguments)]
    fn send_receive<T: RealScalar>(
        &self,
        data: &[T],
        offset: usize,
        descriptor: &Self::Descriptor,
        destination: Option<usize>,
        recv: &mut [T],
        source: Option<usize>,
    );

    /// Sum `value` over all ranks. Every rank receives the identical total.
    fn all_reduce_sum<T: RealScalar>(&self, value: T) -> T;

    /// Overwrite `words` on every rank with the values held by `root`.
    fn broadcast_words(&self, words: &mut [u64], root: usize);

    /// Block until every rank has arrived.
    fn barrier(&self);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_extent() {
        assert_eq!(Layout::contiguous(5).extent(), 5);
        assert_eq!(Layout::strided(3, 6).extent(), 13);
        assert_eq!(Layout::strided(0, 6).extent(), 0);
    }

    #[test]
    fn test_gather_scatter_column() {
        // 3x4 row-major buffer, column 2
        let data = (0..12).map(|v| v as f64).collect::<Vec<_>>();
        let layout = Layout::strided(3, 4);
        let mut column = vec![0.0; 3];
        layout.gather(&data, 2, &mut column);
        assert_eq!(column, vec![2.0, 6.0, 10.0]);

        let mut target = vec![0.0; 12];
        layout.scatter(&column, &mut target, 1);
        assert_eq!(target[1], 2.0);
        assert_eq!(target[5], 6.0);
        assert_eq!(target[9], 10.0);
        assert_eq!(target.iter().filter(|v| **v != 0.0).count(), 3);
    }
}
