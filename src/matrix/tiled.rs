//! Tile-major buffers.
//!
//! A [`TiledBuffer`] holds the same elements as a `rows x cols` matrix, but
//! grouped into `tile_rows x tile_cols` tiles. Tiles are laid out row-major
//! over the tile grid and each tile is itself row-major, so a block multiply
//! can read any tile as one contiguous slice.

use crate::error::{Error, Result};
use std::ops::Range;

#[derive(Clone, Debug, PartialEq)]
pub struct TiledBuffer<T> {
    rows: usize,
    cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> TiledBuffer<T> {
    /// Wrap a buffer that is already in tile-major order.
    ///
    /// Fails if the shape isn't a whole number of tiles or the buffer length
    /// doesn't match.
    pub fn new(
        rows: usize,
        cols: usize,
        tile_rows: usize,
        tile_cols: usize,
        data: Vec<T>,
    ) -> Result<Self> {
        check_tiling(rows, cols, tile_rows, tile_cols)?;
        if data.len() != rows * cols {
            return Err(Error::BufferLengthMismatch {
                expected: rows * cols,
                got: data.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            tile_rows,
            tile_cols,
            data,
        })
    }

    /// # Panics
    ///
    /// Panics if `rows`/`cols` are not multiples of the tile shape.
    pub fn zeros(rows: usize, cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        assert!(
            check_tiling(rows, cols, tile_rows, tile_cols).is_ok(),
            "{rows}x{cols} is not a whole number of {tile_rows}x{tile_cols} tiles"
        );
        Self {
            rows,
            cols,
            tile_rows,
            tile_cols,
            data: vec![T::default(); rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn tile_rows(&self) -> usize {
        self.tile_rows
    }

    pub fn tile_cols(&self) -> usize {
        self.tile_cols
    }

    /// Number of tiles down the matrix
    pub fn tiles_down(&self) -> usize {
        self.rows / self.tile_rows
    }

    /// Number of tiles across the matrix
    pub fn tiles_across(&self) -> usize {
        self.cols / self.tile_cols
    }

    pub fn tile_len(&self) -> usize {
        self.tile_rows * self.tile_cols
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

    /// Offset of tile `(tr, tc)` in the buffer
    #[inline]
    pub fn tile_offset(&self, tr: usize, tc: usize) -> usize {
        (tr * self.tiles_across() + tc) * self.tile_len()
    }

    #[inline]
    pub fn tile(&self, tr: usize, tc: usize) -> &[T] {
        let start = self.tile_offset(tr, tc);
        &self.data[start..start + self.tile_len()]
    }

    #[inline]
    pub fn tile_mut(&mut self, tr: usize, tc: usize) -> &mut [T] {
        let start = self.tile_offset(tr, tc);
        let len = self.tile_len();
        &mut self.data[start..start + len]
    }

    /// Element `(r, c)` of the logical matrix
    pub fn get(&self, r: usize, c: usize) -> T {
        let (tr, ir) = (r / self.tile_rows, r % self.tile_rows);
        let (tc, ic) = (c / self.tile_cols, c % self.tile_cols);
        self.tile(tr, tc)[ir * self.tile_cols + ic]
    }

    /// Copy out the tiles in the given tile-row and tile-column ranges.
    ///
    /// This is how a graph hands each cascade stage and SSR lane its share of
    /// an operand that the caller already tiled.
    pub fn sub_tiles(&self, tile_rows: Range<usize>, tile_cols: Range<usize>) -> Self {
        assert!(
            tile_rows.end <= self.tiles_down() && tile_cols.end <= self.tiles_across(),
            "sub_tiles out of bounds"
        );
        let mut data = Vec::with_capacity(tile_rows.len() * tile_cols.len() * self.tile_len());
        for tr in tile_rows.clone() {
            for tc in tile_cols.clone() {
                data.extend_from_slice(self.tile(tr, tc));
            }
        }
        Self {
            rows: tile_rows.len() * self.tile_rows,
            cols: tile_cols.len() * self.tile_cols,
            tile_rows: self.tile_rows,
            tile_cols: self.tile_cols,
            data,
        }
    }

    /// Stack buffers with the same width and tile shape on top of each other.
    ///
    /// Tile rows are contiguous in tile-major order, so this is a plain
    /// concatenation.
    ///
    /// # Panics
    ///
    /// Panics if `parts` is empty or the parts disagree on width or tile shape.
    pub fn stack_rows(parts: &[TiledBuffer<T>]) -> Self {
        assert!(!parts.is_empty(), "nothing to stack");
        let first = &parts[0];
        let mut data = Vec::with_capacity(parts.iter().map(|p| p.data.len()).sum());
        let mut rows = 0;
        for part in parts {
            assert_eq!(part.cols, first.cols, "stacked parts differ in width");
            assert_eq!(
                (part.tile_rows, part.tile_cols),
                (first.tile_rows, first.tile_cols),
                "stacked parts differ in tile shape"
            );
            rows += part.rows;
            data.extend_from_slice(&part.data);
        }
        Self {
            rows,
            cols: first.cols,
            tile_rows: first.tile_rows,
            tile_cols: first.tile_cols,
            data,
        }
    }
}

fn check_tiling(rows: usize, cols: usize, tile_rows: usize, tile_cols: usize) -> Result<()> {
    if tile_rows == 0 {
        return Err(Error::ZeroDimension { name: "tile_rows" });
    }
    if tile_cols == 0 {
        return Err(Error::ZeroDimension { name: "tile_cols" });
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
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_order_is_row_major_over_grid() {
        // 4x4 matrix of values r*4+c, 2x2 tiles
        let data = vec![0, 1, 4, 5, 2, 3, 6, 7, 8, 9, 12, 13, 10, 11, 14, 15];
        let t = TiledBuffer::new(4, 4, 2, 2, data).unwrap();
        for r in 0..4 {
            for c in 0..4 {
                assert_eq!(t.get(r, c), r * 4 + c);
            }
        }
        assert_eq!(t.tile(1, 0), &[8, 9, 12, 13]);
    }

    #[test]
    fn test_sub_tiles_and_stack_rows() {
        let data: Vec<i32> = (0..32).collect();
        let t = TiledBuffer::new(4, 8, 2, 2, data).unwrap();
        let top = t.sub_tiles(0..1, 0..4);
        let bottom = t.sub_tiles(1..2, 0..4);
        assert_eq!(TiledBuffer::stack_rows(&[top, bottom]), t);

        let right = t.sub_tiles(0..2, 2..4);
        assert_eq!(right.cols(), 4);
        assert_eq!(right.get(3, 1), t.get(3, 5));
    }

    #[test]
    fn test_new_rejects_partial_tiles() {
        assert_eq!(
            TiledBuffer::new(3, 4, 2, 2, vec![0i16; 12]),
            Err(Error::DimensionNotMultipleOfTile {
                name: "rows",
                value: 3,
                multiple: 2
            })
        );
        assert_eq!(
            TiledBuffer::new(2, 2, 2, 2, vec![0i16; 3]),
            Err(Error::BufferLengthMismatch { expected: 4, got: 3 })
        );
    }
}
