//! Dense row-major grid storage
use crate::types::{Error, Result};
use itertools::iproduct;
use std::ops::{Index, IndexMut};

/// A `rows x cols` dense array stored row by row.
///
/// The grid owns its storage and always holds exactly `rows * cols` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Grid<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone + Default> Grid<T> {
    /// Create a grid filled with the zero value of `T`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::default(); rows * cols],
            rows,
            cols,
        }
    }

    /// Create a `dim x dim` grid.
    pub fn square(dim: usize) -> Self {
        Self::new(dim, dim)
    }

    /// Create a grid that takes ownership of `data`.
    pub fn from_data(rows: usize, cols: usize, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::Configuration(format!(
                "Grid of shape {rows}x{cols} needs {} values, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { data, rows, cols })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Shape as `[rows, cols]`
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    /// The whole backing storage.
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// The whole backing storage, mutably.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Contiguous storage starting at `(i, j)` and running to the end of the grid.
    ///
    /// A row is the first `cols() - j` values; a column is every `cols()`-th value.
    pub fn slice_from(&self, i: usize, j: usize) -> Option<&[T]> {
        self.offset(i, j).map(|o| &self.data[o..])
    }

    /// Mutable version of [Grid::slice_from].
    pub fn slice_from_mut(&mut self, i: usize, j: usize) -> Option<&mut [T]> {
        self.offset(i, j).map(move |o| &mut self.data[o..])
    }

    /// Row `i`
    pub fn row(&self, i: usize) -> Option<&[T]> {
        if i < self.rows {
            Some(&self.data[i * self.cols..(i + 1) * self.cols])
        } else {
            None
        }
    }

    /// Position of `(i, j)` in the backing storage.
    pub fn offset(&self, i: usize, j: usize) -> Option<usize> {
        if i < self.rows && j < self.cols {
            Some(i * self.cols + j)
        } else {
            None
        }
    }

    /// Element `(i, j)`, or `None` if out of range.
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        self.offset(i, j).map(|o| &self.data[o])
    }

    /// Mutable element `(i, j)`, or `None` if out of range.
    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut T> {
        self.offset(i, j).map(move |o| &mut self.data[o])
    }

    /// Reshape the grid, keeping the values that overlap the old window.
    ///
    /// Old cell `(i, j)` lands at `(i + offset.0, j + offset.1)` when that
    /// position exists in the new shape. Every other cell is set to the zero
    /// value. An offset of `(1, 1)` with two extra rows and columns adds a
    /// one-cell ring; `(-1, -1)` with two fewer strips it again.
    pub fn resize_with_offset(&mut self, rows: usize, cols: usize, offset: (isize, isize)) {
        let mut data = vec![T::default(); rows * cols];
        for (i, j) in iproduct!(0..self.rows, 0..self.cols) {
            let ni = i as isize + offset.0;
            let nj = j as isize + offset.1;
            if ni < 0 || nj < 0 || ni as usize >= rows || nj as usize >= cols {
                continue;
            }
            data[ni as usize * cols + nj as usize] =
                std::mem::take(&mut self.data[i * self.cols + j]);
        }
        self.data = data;
        self.rows = rows;
        self.cols = cols;
    }

    /// Reshape the grid anchored at the origin.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        self.resize_with_offset(rows, cols, (0, 0));
    }

    /// Set every cell to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Replace the contents with row-major `values`.
    pub fn fill_from(&mut self, values: Vec<T>) -> Result<()> {
        if values.len() != self.data.len() {
            return Err(Error::Configuration(format!(
                "Cannot fill {} cells from {} values",
                self.data.len(),
                values.len()
            )));
        }
        self.data = values;
        Ok(())
    }

    /// Set every cell to `f(i, j)`.
    pub fn fill_with<F: Fn(usize, usize) -> T>(&mut self, f: F) {
        let cols = self.cols;
        for (index, value) in self.data.iter_mut().enumerate() {
            *value = f(index / cols, index % cols);
        }
    }

    /// Consume the grid and return its storage.
    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

impl<T> Index<(usize, usize)> for Grid<T> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &T {
        assert!(
            i < self.rows && j < self.cols,
            "Index ({i}, {j}) out of range for grid of shape {}x{}",
            self.rows,
            self.cols
        );
        &self.data[i * self.cols + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        assert!(
            i < self.rows && j < self.cols,
            "Index ({i}, {j}) out of range for grid of shape {}x{}",
            self.rows,
            self.cols
        );
        &mut self.data[i * self.cols + j]
    }
}
