//! Two dimensional Cartesian process mesh
use crate::traits::{Layout, TransferDescriptor, Transport};
use crate::types::{Error, RealScalar, Result};
use log::{debug, trace};

/// The most balanced factorisation of `size` into `[rows, cols]`, with `rows >= cols`.
pub fn balanced_dims(size: usize) -> [usize; 2] {
    let mut cols = 1;
    let mut f = 1;
    while f * f <= size {
        if size % f == 0 {
            cols = f;
        }
        f += 1;
    }
    [size / cols.max(1), cols]
}

/// The block of the global grid owned by one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileExtent {
    /// Owned rows
    pub rows: usize,
    /// Owned columns
    pub cols: usize,
    /// Global row of local row 0
    pub row_offset: usize,
    /// Global column of local column 0
    pub col_offset: usize,
    /// Rows of the global grid
    pub global_rows: usize,
    /// Columns of the global grid
    pub global_cols: usize,
}

impl TileExtent {
    /// Global coordinates of local `(i, j)`
    pub fn global(&self, i: usize, j: usize) -> (usize, usize) {
        (self.row_offset + i, self.col_offset + j)
    }
    /// Does the tile touch global row 0?
    pub fn at_top(&self) -> bool {
        self.row_offset == 0
    }
    /// Does the tile touch the last global row?
    pub fn at_bottom(&self) -> bool {
        self.row_offset + self.rows == self.global_rows
    }
    /// Does the tile touch global column 0?
    pub fn at_left(&self) -> bool {
        self.col_offset == 0
    }
    /// Does the tile touch the last global column?
    pub fn at_right(&self) -> bool {
        self.col_offset + self.cols == self.global_cols
    }
}

/// Row and column transfer descriptors for one solve or gradient call.
///
/// Both descriptors are released when this value is dropped.
pub struct HaloDescriptors<D: TransferDescriptor> {
    /// One owned row, contiguous
    pub row: D,
    /// One owned column, strided by the row pitch of the ghosted tile
    pub column: D,
}

impl<D: TransferDescriptor> Drop for HaloDescriptors<D> {
    fn drop(&mut self) {
        trace!(
            "Releasing halo descriptors {:?} and {:?}",
            self.row.layout(),
            self.column.layout()
        );
    }
}

/// Position of this process in a 2D mesh of processes.
///
/// The mesh shape depends only on the number of processes. Ranks are laid
/// out row by row, and processes on the edge of the mesh have no neighbour
/// on that side.
pub struct ProcessTopology<C: Transport> {
    transport: C,
    dims: [usize; 2],
    coords: [usize; 2],
    top: Option<usize>,
    bottom: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
}

#[cfg(feature = "mpi")]
impl ProcessTopology<crate::transport::MpiTransport> {
    /// Topology over `MPI_COMM_WORLD`, initialising MPI if needed.
    pub fn initialize() -> Result<Self> {
        Ok(Self::new(crate::transport::MpiTransport::world()?))
    }
}

impl<C: Transport> ProcessTopology<C> {
    /// Create the topology of the calling rank.
    pub fn new(transport: C) -> Self {
        let rank = transport.rank();
        let dims = balanced_dims(transport.size());
        let coords = [rank / dims[1], rank % dims[1]];
        let at = |row: usize, col: usize| row * dims[1] + col;

        let top = (coords[0] > 0).then(|| at(coords[0] - 1, coords[1]));
        let bottom = (coords[0] + 1 < dims[0]).then(|| at(coords[0] + 1, coords[1]));
        let left = (coords[1] > 0).then(|| at(coords[0], coords[1] - 1));
        let right = (coords[1] + 1 < dims[1]).then(|| at(coords[0], coords[1] + 1));

        debug!(
            "Rank {} of {}: mesh {:?}, coordinates {:?}",
            rank,
            transport.size(),
            dims,
            coords
        );
        Self {
            transport,
            dims,
            coords,
            top,
            bottom,
            left,
            right,
        }
    }

    /// The transport
    pub fn transport(&self) -> &C {
        &self.transport
    }
    /// Rank of this process
    pub fn rank(&self) -> usize {
        self.transport.rank()
    }
    /// Number of processes
    pub fn size(&self) -> usize {
        self.transport.size()
    }
    /// Mesh shape `[rows, cols]`
    pub fn dims(&self) -> [usize; 2] {
        self.dims
    }
    /// Mesh coordinates `[row, col]` of this process
    pub fn coords(&self) -> [usize; 2] {
        self.coords
    }
    /// Mesh row of this process
    pub fn row(&self) -> usize {
        self.coords[0]
    }
    /// Mesh column of this process
    pub fn col(&self) -> usize {
        self.coords[1]
    }
    /// Neighbour above
    pub fn top(&self) -> Option<usize> {
        self.top
    }
    /// Neighbour below
    pub fn bottom(&self) -> Option<usize> {
        self.bottom
    }
    /// Neighbour to the left
    pub fn left(&self) -> Option<usize> {
        self.left
    }
    /// Neighbour to the right
    pub fn right(&self) -> Option<usize> {
        self.right
    }

    /// Owned rows for a global grid of `global_rows` rows.
    pub fn local_rows(&self, global_rows: usize) -> Result<usize> {
        split(global_rows, self.dims[0], "rows")
    }

    /// Owned columns for a global grid of `global_cols` columns.
    pub fn local_cols(&self, global_cols: usize) -> Result<usize> {
        split(global_cols, self.dims[1], "columns")
    }

    /// Global row of local row `i`
    pub fn global_row(&self, i: usize, local_rows: usize) -> usize {
        self.coords[0] * local_rows + i
    }

    /// Global column of local column `j`
    pub fn global_col(&self, j: usize, local_cols: usize) -> usize {
        self.coords[1] * local_cols + j
    }

    /// The block of a `global_rows x global_cols` grid owned by this process.
    ///
    /// Fails unless both extents divide evenly over the mesh.
    pub fn tile(&self, global_rows: usize, global_cols: usize) -> Result<TileExtent> {
        let rows = self.local_rows(global_rows)?;
        let cols = self.local_cols(global_cols)?;
        Ok(TileExtent {
            rows,
            cols,
            row_offset: self.global_row(0, rows),
            col_offset: self.global_col(0, cols),
            global_rows,
            global_cols,
        })
    }

    /// Descriptors for exchanging one row and one column of a tile with a
    /// one-cell ghost ring, i.e. stored with a row pitch of `cols + 2`.
    pub fn halo_descriptors<T: RealScalar>(
        &self,
        rows: usize,
        cols: usize,
    ) -> HaloDescriptors<C::Descriptor> {
        trace!("Creating halo descriptors for a {}x{} tile", rows, cols);
        HaloDescriptors {
            row: self
                .transport
                .create_descriptor::<T>(Layout::contiguous(cols)),
            column: self
                .transport
                .create_descriptor::<T>(Layout::strided(rows, cols + 2)),
        }
    }
}

fn split(global: usize, parts: usize, what: &str) -> Result<usize> {
    if global == 0 {
        return Err(Error::Configuration(format!(
            "The global grid needs at least one of its {what}"
        )));
    }
    if global % parts != 0 {
        return Err(Error::Configuration(format!(
            "Cannot split {global} {what} evenly over {parts} processes"
        )));
    }
    Ok(global / parts)
}
