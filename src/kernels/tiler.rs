//! Linear-to-tiled reorder kernel.

use super::geometry::TileGeometry;
use super::shuffle::{ShuffleOffset, apply_shuffle, is_identity, make_shuffle_offsets};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{LeadingDim, Matrix, TiledBuffer};
use std::marker::PhantomData;
use tracing::debug;

/// Reorders a linear matrix into tile-major order.
///
/// Geometry and the shuffle table are worked out once, at construction.
#[derive(Clone, Debug)]
pub struct Tiler<T> {
    geometry: TileGeometry,
    shuffle: Option<Vec<ShuffleOffset>>,
    _marker: PhantomData<T>,
}

impl<T: Element> Tiler<T> {
    pub fn new(
        rows: usize,
        cols: usize,
        tile_rows: usize,
        tile_cols: usize,
        leading: LeadingDim,
    ) -> Result<Self> {
        let geometry = TileGeometry::new(T::DTYPE, rows, cols, tile_rows, tile_cols, leading)?;
        let offsets = make_shuffle_offsets(&geometry);
        let shuffle = (!is_identity(&offsets)).then_some(offsets);
        debug!(
            dtype = %T::DTYPE,
            rows,
            cols,
            tile_rows,
            tile_cols,
            layout = leading.name(),
            load_size = geometry.load_size,
            rows_per_vector = geometry.rows_per_vector,
            cols_per_vector = geometry.cols_per_vector,
            shuffled = shuffle.is_some(),
            "tiler geometry"
        );
        Ok(Self {
            geometry,
            shuffle,
            _marker: PhantomData,
        })
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    /// True when the block multiply can read this layout directly
    pub fn is_redundant(&self) -> bool {
        self.geometry.is_redundant()
    }

    /// Tile `input` (linear, in the configured layout) into `output`.
    ///
    /// Blocks are visited row-major over the block grid. Each block is
    /// gathered with `loads_per_vector` loads, shuffled into tile order if
    /// needed, and written one tile-row band at a time.
    ///
    /// # Panics
    ///
    /// Panics if either slice isn't `rows * cols` long.
    pub fn tile(&self, input: &[T], output: &mut [T]) {
        let g = &self.geometry;
        assert_eq!(
            input.len(),
            g.rows * g.cols,
            "tiler input: expected {}x{}",
            g.rows,
            g.cols
        );
        assert_eq!(
            output.len(),
            g.rows * g.cols,
            "tiler output: expected {}x{}",
            g.rows,
            g.cols
        );

        let mut loaded = vec![T::default(); g.vector_len()];
        let mut ordered = vec![T::default(); g.vector_len()];
        for block_r in 0..g.blocks_down() {
            for block_c in 0..g.blocks_across() {
                for (i, dst) in loaded.chunks_exact_mut(g.load_size).enumerate() {
                    let at = g.load_offset(block_r, block_c, i);
                    dst.copy_from_slice(&input[at..at + g.load_size]);
                }

                let vector = match &self.shuffle {
                    Some(offsets) => {
                        apply_shuffle(offsets, &loaded, &mut ordered);
                        &ordered
                    }
                    None => &loaded,
                };

                for (band, src) in vector.chunks_exact(g.band_len()).enumerate() {
                    let at = g.band_offset(block_r, block_c, band);
                    output[at..at + g.band_len()].copy_from_slice(src);
                }
            }
        }
    }

    /// Tile a [`Matrix`], checking its shape and layout first.
    pub fn tile_matrix(&self, input: &Matrix<T>) -> Result<TiledBuffer<T>> {
        let g = &self.geometry;
        if input.rows() != g.rows || input.cols() != g.cols {
            return Err(Error::ShapeMismatch {
                port: "tiler",
                expected_rows: g.rows,
                expected_cols: g.cols,
                rows: input.rows(),
                cols: input.cols(),
            });
        }
        if input.leading() != g.leading {
            return Err(Error::OperandLayoutMismatch {
                port: "tiler",
                expected: g.leading.name(),
            });
        }
        let mut out = TiledBuffer::zeros(g.rows, g.cols, g.tile_rows, g.tile_cols);
        self.tile(input.as_slice(), out.as_mut_slice());
        Ok(out)
    }
}
