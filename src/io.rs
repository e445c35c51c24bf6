//! Writers for solution and velocity grids
//!
//! Binary output is row-major in native byte order with no header. A cell
//! holding a pair is written as its two components back to back.
use crate::grid::Grid;
use crate::topology::{ProcessTopology, TileExtent};
use crate::traits::Transport;
use crate::types::{Error, Result};
use log::debug;
use std::fmt::Display;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Cell types with a fixed size binary encoding.
pub trait CellBytes: Clone + Default {
    /// Size of one encoded cell in bytes
    const SIZE: usize;
    /// Append the native byte order encoding of this cell to `out`
    fn extend_bytes(&self, out: &mut Vec<u8>);
}

macro_rules! cell_bytes {
    ($($t:ty),+) => {
    $(
        impl CellBytes for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn extend_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }
        }

        impl CellBytes for ($t, $t) {
            const SIZE: usize = 2 * std::mem::size_of::<$t>();
            fn extend_bytes(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.0.to_ne_bytes());
                out.extend_from_slice(&self.1.to_ne_bytes());
            }
        }
    )*
    };
}

cell_bytes!(f32, f64);

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn encode_row<T: CellBytes>(row: &[T]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(row.len() * T::SIZE);
    for cell in row {
        cell.extend_bytes(&mut bytes);
    }
    bytes
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new).map_err(io_error(path))
}

/// Write a whole grid held by one process as raw binary.
pub fn write_binary<T: CellBytes>(grid: &Grid<T>, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    file.write_all(&encode_row(grid.data()))
        .and_then(|_| file.flush())
        .map_err(io_error(path))
}

/// Write a scalar grid as text, each cell as `"j i value "`.
pub fn write_text<T: Clone + Default + Display>(
    grid: &Grid<T>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let mut emit = || -> std::io::Result<()> {
        for i in 0..grid.rows() {
            for j in 0..grid.cols() {
                write!(file, "{} {} {} ", j, i, grid[(i, j)])?;
            }
        }
        file.flush()
    };
    emit().map_err(io_error(path))
}

/// Write a vector grid as text, one `"j i first second"` line per cell.
pub fn write_vector_text<T: Clone + Default + Display>(
    grid: &Grid<(T, T)>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let mut file = create(path)?;
    let mut emit = || -> std::io::Result<()> {
        for i in 0..grid.rows() {
            for j in 0..grid.cols() {
                let (first, second) = &grid[(i, j)];
                writeln!(file, "{} {} {} {}", j, i, first, second)?;
            }
        }
        file.flush()
    };
    emit().map_err(io_error(path))
}

/// Combine the outcome of one phase of a collective write over all processes.
///
/// Every process gets an error if any process failed, so no process goes on
/// to a later phase that the others skip.
fn agree<C: Transport>(topology: &ProcessTopology<C>, local: Result<()>) -> Result<()> {
    let failed = topology
        .transport()
        .all_reduce_sum(if local.is_err() { 1.0f64 } else { 0.0 });
    local?;
    if failed > 0.0 {
        return Err(Error::Configuration(format!(
            "{} processes failed during the tiled write",
            failed
        )));
    }
    Ok(())
}

/// Write the tiles of all processes into one binary file.
///
/// The result is byte for byte what [write_binary] produces for the
/// assembled global grid. Rank 0 creates or truncates the file, then every
/// process writes the rows of its tile at their global offsets. Every
/// process of the group must call this, and all of them return an error if
/// any of them fails.
pub fn write_binary_tiled<T: CellBytes, C: Transport>(
    grid: &Grid<T>,
    tile: &TileExtent,
    path: impl AsRef<Path>,
    topology: &ProcessTopology<C>,
) -> Result<()> {
    let path = path.as_ref();
    let shape = if grid.shape() == [tile.rows, tile.cols] {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "Tile is {}x{} but the grid holds {:?}",
            tile.rows,
            tile.cols,
            grid.shape()
        )))
    };

    let prepared = shape.and_then(|_| {
        if topology.rank() == 0 {
            let total = (tile.global_rows * tile.global_cols * T::SIZE) as u64;
            File::create(path)
                .and_then(|file| file.set_len(total))
                .map_err(io_error(path))
        } else {
            Ok(())
        }
    });
    agree(topology, prepared)?;

    let written = OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|mut file| {
            for i in 0..tile.rows {
                let (gi, gj) = tile.global(i, 0);
                let offset = ((gi * tile.global_cols + gj) * T::SIZE) as u64;
                let row = grid.row(i).unwrap_or(&[]);
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(&encode_row(row))?;
            }
            file.flush()
        })
        .map_err(io_error(path));
    agree(topology, written)?;
    debug!(
        "Rank {}: wrote {} rows to {}",
        topology.rank(),
        tile.rows,
        path.display()
    );
    Ok(())
}
