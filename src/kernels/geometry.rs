//! Vector-block geometry shared by the tiler and the untiler.
//!
//! The tiler walks the matrix one *vector block* at a time: a
//! `rows_per_vector x cols_per_vector` region made of whole tiles. Each block
//! is gathered with a few contiguous loads, permuted into tile order, and
//! stored as one contiguous segment per tile-row band. The untiler runs the
//! same walk backwards.
//!
//! Inside a block, two orders matter:
//!
//! * *load order*: the loads concatenated in issue order. Row-major data is
//!   loaded row by row in `load_size` chunks, column-major data one column
//!   segment at a time.
//! * *tile order*: tile-row band by band, tile by tile along the band, each
//!   tile row-major. This is exactly the order of the block's tiles in a
//!   [`TiledBuffer`](crate::matrix::TiledBuffer).

use crate::dtype::DataType;
use crate::error::{Error, Result};
use crate::matrix::LeadingDim;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileGeometry {
    pub dtype: DataType,
    pub rows: usize,
    pub cols: usize,
    pub tile_rows: usize,
    pub tile_cols: usize,
    pub leading: LeadingDim,
    /// Elements per contiguous load
    pub load_size: usize,
    pub rows_per_vector: usize,
    pub cols_per_vector: usize,
}

impl TileGeometry {
    /// Work out the block geometry for a `rows x cols` matrix of `dtype`
    /// split into `tile_rows x tile_cols` tiles.
    ///
    /// Column-major `int16` with a tile width of 4 is rejected: the pair
    /// shuffle the hardware uses for 16-bit data can't express it.
    pub fn new(
        dtype: DataType,
        rows: usize,
        cols: usize,
        tile_rows: usize,
        tile_cols: usize,
        leading: LeadingDim,
    ) -> Result<Self> {
        for (name, value) in [
            ("rows", rows),
            ("cols", cols),
            ("tile_rows", tile_rows),
            ("tile_cols", tile_cols),
        ] {
            if value == 0 {
                return Err(Error::ZeroDimension { name });
            }
        }
        if rows % tile_rows != 0 {
            return Err(Error::DimensionNotMultipleOfTile {
                name: "rows",
                value: rows,
                multiple: tile_rows,
            });
        }
        if cols % tile_cols != 0 {
            return Err(Error::DimensionNotMultipleOfTile {
                name: "cols",
                value: cols,
                multiple: tile_cols,
            });
        }
        if dtype == DataType::Int16 && leading == LeadingDim::ColMajor && tile_cols == 4 {
            return Err(Error::UnsupportedLayoutForType {
                dtype,
                layout: leading.name(),
                tile_width: tile_cols,
            });
        }

        let granularity = dtype.load_granularity();
        let vector_size = dtype.vector_lanes();
        let (m, n) = (tile_rows, tile_cols);

        let (load_size, rows_per_vector, cols_per_vector) = match leading {
            LeadingDim::RowMajor => {
                let load = n * gcd(cols / n, granularity.max(n).div_ceil(n));
                let cols_pv = load * gcd(cols / load, (vector_size / (m * load)).max(1));
                let rows_pv = if cols_pv == cols && m * cols < vector_size {
                    m * gcd(rows / m, vector_size / (m * cols))
                } else {
                    m
                };
                (load, rows_pv, cols_pv)
            }
            LeadingDim::ColMajor => {
                let load = m * gcd(rows / m, granularity.max(m).div_ceil(m));
                let cols_pv = n * gcd(cols / n, (vector_size / (load * n)).max(1));
                (load, load, cols_pv)
            }
        };

        Ok(Self {
            dtype,
            rows,
            cols,
            tile_rows,
            tile_cols,
            leading,
            load_size,
            rows_per_vector,
            cols_per_vector,
        })
    }

    /// Elements in one vector block
    pub fn vector_len(&self) -> usize {
        self.rows_per_vector * self.cols_per_vector
    }

    pub fn loads_per_vector(&self) -> usize {
        self.vector_len() / self.load_size
    }

    pub fn blocks_down(&self) -> usize {
        self.rows / self.rows_per_vector
    }

    pub fn blocks_across(&self) -> usize {
        self.cols / self.cols_per_vector
    }

    /// Tile-row bands per block, i.e. contiguous segments per tiled store
    pub fn bands_per_vector(&self) -> usize {
        self.rows_per_vector / self.tile_rows
    }

    pub fn band_len(&self) -> usize {
        self.tile_rows * self.cols_per_vector
    }

    /// Linear-buffer offset of load `i` of block `(block_r, block_c)`
    pub fn load_offset(&self, block_r: usize, block_c: usize, i: usize) -> usize {
        let row0 = block_r * self.rows_per_vector;
        let col0 = block_c * self.cols_per_vector;
        match self.leading {
            LeadingDim::RowMajor => {
                let r = i % self.rows_per_vector;
                let chunk = i / self.rows_per_vector;
                (row0 + r) * self.cols + col0 + chunk * self.load_size
            }
            LeadingDim::ColMajor => (col0 + i) * self.rows + row0,
        }
    }

    /// Tiled-buffer offset of band `band` of block `(block_r, block_c)`
    pub fn band_offset(&self, block_r: usize, block_c: usize, band: usize) -> usize {
        let tile_row = block_r * self.bands_per_vector() + band;
        let tile_col = block_c * (self.cols_per_vector / self.tile_cols);
        (tile_row * (self.cols / self.tile_cols) + tile_col) * self.tile_rows * self.tile_cols
    }

    /// Load-order index of block element `(r, c)`
    pub fn load_index(&self, r: usize, c: usize) -> usize {
        match self.leading {
            LeadingDim::RowMajor => {
                let load = (c / self.load_size) * self.rows_per_vector + r;
                load * self.load_size + c % self.load_size
            }
            LeadingDim::ColMajor => c * self.rows_per_vector + r,
        }
    }

    /// Block element `(r, c)` sitting at tile-order lane `d`
    pub fn tile_position(&self, d: usize) -> (usize, usize) {
        let (m, n) = (self.tile_rows, self.tile_cols);
        let band = d / self.band_len();
        let within = d % self.band_len();
        let tile_col = within / (m * n);
        let q = within % (m * n);
        (band * m + q / n, tile_col * n + q % n)
    }

    /// The same walk over adjacent sample pairs.
    ///
    /// Row-major `int16` data is permuted two samples at a time, the way the
    /// hardware shuffles 16-bit data on 32-bit lanes. `None` when the tile
    /// width is odd.
    pub fn paired(&self) -> Option<TileGeometry> {
        if self.leading != LeadingDim::RowMajor || self.tile_cols % 2 != 0 {
            return None;
        }
        Some(TileGeometry {
            cols: self.cols / 2,
            tile_cols: self.tile_cols / 2,
            load_size: self.load_size / 2,
            cols_per_vector: self.cols_per_vector / 2,
            ..*self
        })
    }

    /// Whether the block multiply can read this operand straight from its
    /// linear layout, making a tiler (or untiler) kernel redundant.
    pub fn is_redundant(&self) -> bool {
        self.leading == LeadingDim::RowMajor
            && (self.tile_cols >= self.dtype.load_granularity() || self.tile_cols == self.cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_small_tiles_pack_several_per_vector() {
        // cint16: 4 per load, 16 per vector
        let g = TileGeometry::new(DataType::Cint16, 8, 16, 4, 2, LeadingDim::RowMajor)
            .unwrap();
        assert_eq!(g.load_size, 4);
        assert_eq!(g.cols_per_vector, 4);
        assert_eq!(g.rows_per_vector, 4);
        assert_eq!(g.loads_per_vector(), 4);
        assert!(!g.is_redundant());
    }

    #[test]
    fn test_narrow_matrix_stacks_bands() {
        // whole width fits one load, so several tile rows share a vector
        let g = TileGeometry::new(DataType::Int32, 16, 4, 2, 2, LeadingDim::RowMajor)
            .unwrap();
        assert_eq!(g.cols_per_vector, 4);
        assert_eq!(g.rows_per_vector, 4);
        assert_eq!(g.bands_per_vector(), 2);
    }

    #[test]
    fn test_column_major_loads_down_columns() {
        let g = TileGeometry::new(DataType::Float, 8, 8, 4, 2, LeadingDim::ColMajor)
            .unwrap();
        assert_eq!(g.load_size, 4);
        assert_eq!(g.rows_per_vector, 4);
        assert_eq!(g.cols_per_vector, 4);
        assert_eq!(g.load_offset(1, 1, 2), (4 + 2) * 8 + 4);
    }

    #[test]
    fn test_tile_position_and_load_index_cover_block() {
        let g = TileGeometry::new(DataType::Int16, 8, 16, 2, 4, LeadingDim::RowMajor)
            .unwrap();
        let mut seen = vec![false; g.vector_len()];
        for d in 0..g.vector_len() {
            let (r, c) = g.tile_position(d);
            let s = g.load_index(r, c);
            assert!(!seen[s], "lane {} reused", s);
            seen[s] = true;
        }
        assert!(seen.iter().all(|&x| x));
    }

    #[test]
    fn test_int16_column_major_width_four_rejected() {
        let err = TileGeometry::new(DataType::Int16, 8, 8, 4, 4, LeadingDim::ColMajor)
            .unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedLayoutForType { tile_width: 4, .. })
        );
    }

    #[test]
    fn test_redundancy() {
        let wide = TileGeometry::new(DataType::Int16, 4, 16, 4, 8, LeadingDim::RowMajor)
            .unwrap();
        assert!(wide.is_redundant());
        let whole = TileGeometry::new(DataType::Cint32, 4, 2, 2, 2, LeadingDim::RowMajor)
            .unwrap();
        assert!(whole.is_redundant());
        let col = TileGeometry::new(DataType::Int16, 4, 16, 4, 8, LeadingDim::ColMajor)
            .unwrap();
        assert!(!col.is_redundant());
    }
}
