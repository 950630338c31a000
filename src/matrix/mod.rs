//! Matrix containers and the exact reference multiply.
//!
//! [`Matrix`] is the user-facing linear layout (row- or column-major);
//! [`TiledBuffer`] is the tile-major layout the block multiply consumes.
//! The naive reference and transpose are the correctness baselines the
//! tiled pipeline is checked against.

pub mod naive;
pub mod tiled;
pub mod transpose;

pub use tiled::TiledBuffer;

use crate::error::{Error, Result};
use std::ops::Range;

/// Which dimension is contiguous in the linear buffer
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum LeadingDim {
    /// Rows are contiguous
    #[default]
    RowMajor,
    /// Columns are contiguous
    ColMajor,
}

impl LeadingDim {
    pub fn name(self) -> &'static str {
        match self {
            LeadingDim::RowMajor => "row-major",
            LeadingDim::ColMajor => "column-major",
        }
    }
}

/// A `rows x cols` matrix stored in one linear buffer.
///
/// The layout is fixed once the matrix exists; use [`Matrix::to_layout`] for a
/// transposed-storage copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix<T> {
    rows: usize,
    cols: usize,
    leading: LeadingDim,
    data: Vec<T>,
}

impl<T: Copy + Default> Matrix<T> {
    /// Wrap an existing buffer.
    ///
    /// # Example
    ///
    /// ```
    /// use aie_gemm::matrix::{LeadingDim, Matrix};
    ///
    /// let m = Matrix::new(2, 3, LeadingDim::RowMajor, vec![1, 2, 3, 4, 5, 6]).unwrap();
    /// assert_eq!(m.get(1, 0), 4);
    ///
    /// let t = m.to_layout(LeadingDim::ColMajor);
    /// assert_eq!(t.as_slice(), &[1, 4, 2, 5, 3, 6]);
    /// assert_eq!(t.get(1, 0), 4);
    /// ```
    pub fn new(rows: usize, cols: usize, leading: LeadingDim, data: Vec<T>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::BufferLengthMismatch {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            leading,
            data,
        })
    }

    pub fn zeros(rows: usize, cols: usize, leading: LeadingDim) -> Self {
        Self {
            rows,
            cols,
            leading,
            data: vec![T::default(); rows * cols],
        }
    }

    /// Build a matrix from a function of `(row, col)`.
    pub fn from_fn<F>(rows: usize, cols: usize, leading: LeadingDim, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut m = Self::zeros(rows, cols, leading);
        for r in 0..rows {
            for c in 0..cols {
                let idx = m.index_of(r, c);
                m.data[idx] = f(r, c);
            }
        }
        m
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn leading(&self) -> LeadingDim {
        self.leading
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Position of `(r, c)` in the linear buffer
    #[inline]
    pub fn index_of(&self, r: usize, c: usize) -> usize {
        match self.leading {
            LeadingDim::RowMajor => r * self.cols + c,
            LeadingDim::ColMajor => c * self.rows + r,
        }
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> T {
        self.data[self.index_of(r, c)]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: T) {
        let idx = self.index_of(r, c);
        self.data[idx] = value;
    }

    /// Same logical matrix with the other storage order.
    pub fn to_layout(&self, leading: LeadingDim) -> Self {
        if leading == self.leading {
            return self.clone();
        }
        let mut data = vec![T::default(); self.data.len()];
        let (runs, run_len) = match self.leading {
            LeadingDim::RowMajor => (self.rows, self.cols),
            LeadingDim::ColMajor => (self.cols, self.rows),
        };
        transpose::transpose(&self.data, &mut data, runs, run_len);
        Self {
            rows: self.rows,
            cols: self.cols,
            leading,
            data,
        }
    }

    /// Copy out a rectangular region, keeping the storage order.
    pub fn sub_matrix(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        assert!(
            rows.end <= self.rows && cols.end <= self.cols,
            "sub_matrix out of bounds"
        );
        let (r0, c0) = (rows.start, cols.start);
        Self::from_fn(rows.len(), cols.len(), self.leading, |r, c| {
            self.get(r0 + r, c0 + c)
        })
    }

    /// Copy `block` into this matrix with its top-left corner at `(row, col)`.
    pub fn write_block(&mut self, row: usize, col: usize, block: &Matrix<T>) {
        assert!(
            row + block.rows <= self.rows && col + block.cols <= self.cols,
            "write_block out of bounds"
        );
        for r in 0..block.rows {
            for c in 0..block.cols {
                self.set(row + r, col + c, block.get(r, c));
            }
        }
    }
}
