//! Ghost ring exchange between neighbouring tiles
use crate::grid::Grid;
use crate::topology::{HaloDescriptors, ProcessTopology};
use crate::traits::{TransferDescriptor, Transport};
use crate::types::RealScalar;

/// Fill the ghost ring of `grid` with the edge values of the neighbouring tiles.
///
/// `grid` is a tile with a one-cell ghost ring. Rows are exchanged before
/// columns, and within each axis every rank first sends towards the lower
/// neighbour and then towards the upper one, so the blocking pairwise
/// exchanges always complete. Ghost cells with no neighbour are left alone.
pub(crate) fn exchange<T: RealScalar, C: Transport>(
    grid: &mut Grid<T>,
    topology: &ProcessTopology<C>,
    descriptors: &HaloDescriptors<C::Descriptor>,
) {
    let rows = grid.rows() - 2;
    let cols = grid.cols() - 2;
    let pitch = cols + 2;
    let transport = topology.transport();

    let mut row_buffer = vec![T::zero(); cols];
    let row = &descriptors.row;
    // first owned row up, bottom ghost row from below
    shift(
        transport,
        grid,
        row,
        pitch + 1,
        topology.top(),
        (rows + 1) * pitch + 1,
        topology.bottom(),
        &mut row_buffer,
    );
    // last owned row down, top ghost row from above
    shift(
        transport,
        grid,
        row,
        rows * pitch + 1,
        topology.bottom(),
        1,
        topology.top(),
        &mut row_buffer,
    );

    let mut column_buffer = vec![T::zero(); rows];
    let column = &descriptors.column;
    // first owned column left, right ghost column from the right
    shift(
        transport,
        grid,
        column,
        pitch + 1,
        topology.left(),
        pitch + cols + 1,
        topology.right(),
        &mut column_buffer,
    );
    // last owned column right, left ghost column from the left
    shift(
        transport,
        grid,
        column,
        pitch + cols,
        topology.right(),
        pitch,
        topology.left(),
        &mut column_buffer,
    );
}

/// One paired exchange: the values at `send_offset` go to `destination`,
/// the values from `source` land at `recv_offset`.
///
/// Values are received into `buffer` before being written back, so a rank
/// that is its own partner never overwrites what it is sending.
#[allow(clippy::too_many_arguments)]
fn shift<T: RealScalar, C: Transport>(
    transport: &C,
    grid: &mut Grid<T>,
    descriptor: &C::Descriptor,
    send_offset: usize,
    destination: Option<usize>,
    recv_offset: usize,
    source: Option<usize>,
    buffer: &mut [T],
) {
    transport.send_receive(
        grid.data(),
        send_offset,
        descriptor,
        destination,
        buffer,
        source,
    );
    if source.is_some() {
        descriptor
            .layout()
            .scatter(buffer, grid.data_mut(), recv_offset);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transport::LocalGroup;
    use std::thread;

    #[test]
    fn test_exchange_2x2() {
        // 4x4 global grid holding 10 * row + col, split into four 2x2 tiles
        let results = thread::scope(|s| {
            let handles = LocalGroup::new(4)
                .unwrap()
                .into_iter()
                .map(|t| {
                    s.spawn(move || {
                        let topology = ProcessTopology::new(t);
                        let tile = topology.tile(4, 4).unwrap();
                        let mut grid = Grid::<f64>::new(2, 2);
                        grid.fill_with(|i, j| {
                            let (gi, gj) = tile.global(i, j);
                            (10 * gi + gj) as f64
                        });
                        grid.resize_with_offset(4, 4, (1, 1));
                        let descriptors = topology.halo_descriptors::<f64>(2, 2);
                        exchange(&mut grid, &topology, &descriptors);
                        (topology.rank(), grid)
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .collect::<Vec<_>>()
        });

        for (rank, grid) in results {
            match rank {
                0 => {
                    // top left tile: bottom ghost row is global row 2, right ghost column is global column 2
                    assert_eq!(grid.row(3).unwrap(), &[0.0, 20.0, 21.0, 0.0]);
                    assert_eq!(grid[(1, 3)], 2.0);
                    assert_eq!(grid[(2, 3)], 12.0);
                    assert_eq!(grid.row(0).unwrap(), &[0.0; 4]);
                    assert_eq!(grid[(1, 0)], 0.0);
                }
                3 => {
                    // bottom right tile: top ghost row is global row 1, left ghost column is global column 1
                    assert_eq!(grid.row(0).unwrap(), &[0.0, 12.0, 13.0, 0.0]);
                    assert_eq!(grid[(1, 0)], 21.0);
                    assert_eq!(grid[(2, 0)], 31.0);
                    assert_eq!(grid.row(3).unwrap(), &[0.0; 4]);
                }
                _ => {}
            }
        }
    }
}
