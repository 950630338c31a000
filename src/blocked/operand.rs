//! Views the block multiply reads tiles from and writes tiles to.
//!
//! An operand is either already tiled, in which case a tile is one slice
//! copy, or still linear, in which case the tile is gathered straight out
//! of the matrix. The second form is what lets a graph drop a redundant
//! tiler without changing a single output bit.

use crate::matrix::{LeadingDim, Matrix, TiledBuffer};

#[derive(Copy, Clone, Debug)]
pub enum Operand<'a, T> {
    Tiled(&'a TiledBuffer<T>),
    Linear(&'a Matrix<T>),
}

impl<T: Copy + Default> Operand<'_, T> {
    pub fn rows(&self) -> usize {
        match self {
            Operand::Tiled(t) => t.rows(),
            Operand::Linear(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            Operand::Tiled(t) => t.cols(),
            Operand::Linear(m) => m.cols(),
        }
    }

    /// Tile shape of a tiled operand; linear operands accept any shape
    pub fn tile_shape(&self) -> Option<(usize, usize)> {
        match self {
            Operand::Tiled(t) => Some((t.tile_rows(), t.tile_cols())),
            Operand::Linear(_) => None,
        }
    }

    /// Copy tile `(tr, tc)` of shape `tile_rows x tile_cols` into `dst`,
    /// row-major.
    #[inline]
    pub fn load_tile(
        &self,
        tr: usize,
        tc: usize,
        tile_rows: usize,
        tile_cols: usize,
        dst: &mut [T],
    ) {
        match self {
            Operand::Tiled(t) => dst.copy_from_slice(t.tile(tr, tc)),
            Operand::Linear(m) => {
                let (r0, c0) = (tr * tile_rows, tc * tile_cols);
                if m.leading() == LeadingDim::RowMajor {
                    for (i, row) in dst.chunks_exact_mut(tile_cols).enumerate() {
                        let start = m.index_of(r0 + i, c0);
                        row.copy_from_slice(&m.as_slice()[start..start + tile_cols]);
                    }
                } else {
                    for i in 0..tile_rows {
                        for j in 0..tile_cols {
                            dst[i * tile_cols + j] = m.get(r0 + i, c0 + j);
                        }
                    }
                }
            }
        }
    }
}

/// Where finished output tiles go
#[derive(Debug)]
pub enum OutputTarget<'a, T> {
    Tiled(&'a mut TiledBuffer<T>),
    Linear(&'a mut Matrix<T>),
}

impl<T: Copy + Default> OutputTarget<'_, T> {
    pub fn rows(&self) -> usize {
        match self {
            OutputTarget::Tiled(t) => t.rows(),
            OutputTarget::Linear(m) => m.rows(),
        }
    }

    pub fn cols(&self) -> usize {
        match self {
            OutputTarget::Tiled(t) => t.cols(),
            OutputTarget::Linear(m) => m.cols(),
        }
    }

    pub fn tile_shape(&self) -> Option<(usize, usize)> {
        match self {
            OutputTarget::Tiled(t) => Some((t.tile_rows(), t.tile_cols())),
            OutputTarget::Linear(_) => None,
        }
    }

    /// Write the row-major tile `src` at tile position `(tr, tc)`.
    #[inline]
    pub fn store_tile(
        &mut self,
        tr: usize,
        tc: usize,
        tile_rows: usize,
        tile_cols: usize,
        src: &[T],
    ) {
        match self {
            OutputTarget::Tiled(t) => t.tile_mut(tr, tc).copy_from_slice(src),
            OutputTarget::Linear(m) => {
                let (r0, c0) = (tr * tile_rows, tc * tile_cols);
                for i in 0..tile_rows {
                    for j in 0..tile_cols {
                        m.set(r0 + i, c0 + j, src[i * tile_cols + j]);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_and_tiled_loads_agree() {
        let m = Matrix::from_fn(4, 4, LeadingDim::RowMajor, |r, c| (r * 4 + c) as i32);
        let tiled = vec![0, 1, 4, 5, 2, 3, 6, 7, 8, 9, 12, 13, 10, 11, 14, 15];
        let t = TiledBuffer::new(4, 4, 2, 2, tiled).unwrap();
        let col = m.to_layout(LeadingDim::ColMajor);

        let mut x = [0; 4];
        let mut y = [0; 4];
        let mut z = [0; 4];
        for (tr, tc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
            Operand::Linear(&m).load_tile(tr, tc, 2, 2, &mut x);
            Operand::Tiled(&t).load_tile(tr, tc, 2, 2, &mut y);
            Operand::Linear(&col).load_tile(tr, tc, 2, 2, &mut z);
            assert_eq!(x, y);
            assert_eq!(x, z);
        }
    }

    #[test]
    fn test_store_tile_linear_column_major() {
        let mut m = Matrix::zeros(2, 4, LeadingDim::ColMajor);
        OutputTarget::Linear(&mut m)
            .store_tile(0, 1, 2, 2, &[1, 2, 3, 4]);
        assert_eq!(m.get(0, 2), 1);
        assert_eq!(m.get(1, 3), 4);
        assert_eq!(m.as_slice(), &[0, 0, 0, 0, 1, 3, 2, 4]);
    }
}
