//! Tiled-to-linear reorder kernel, the inverse of [`Tiler`](super::Tiler).
//!
//! Here the loads are the contiguous ones (one per tile-row band) and the
//! stores are split across the linear layout.

use super::geometry::TileGeometry;
use super::shuffle::{ShuffleOffset, apply_shuffle, is_identity, make_untile_shuffle_offsets};
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::matrix::{LeadingDim, Matrix, TiledBuffer};
use std::marker::PhantomData;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct Untiler<T> {
    geometry: TileGeometry,
    shuffle: Option<Vec<ShuffleOffset>>,
    _marker: PhantomData<T>,
}

impl<T: Element> Untiler<T> {
    /// Fails on the same layouts the tiler rejects.
    pub fn new(
        rows: usize,
        cols: usize,
        tile_rows: usize,
        tile_cols: usize,
        leading: LeadingDim,
    ) -> Result<Self> {
        let geometry = TileGeometry::new(T::DTYPE, rows, cols, tile_rows, tile_cols, leading)?;
        let offsets = make_untile_shuffle_offsets(&geometry);
        let shuffle = (!is_identity(&offsets)).then_some(offsets);
        debug!(
            dtype = %T::DTYPE,
            rows,
            cols,
            tile_rows,
            tile_cols,
            layout = leading.name(),
            shuffled = shuffle.is_some(),
            "untiler geometry"
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

    pub fn is_redundant(&self) -> bool {
        self.geometry.is_redundant()
    }

    /// Untile `input` (tile-major) into `output` (linear, configured layout).
    ///
    /// # Panics
    ///
    /// Panics if either slice isn't `rows * cols` long.
    pub fn untile(&self, input: &[T], output: &mut [T]) {
        let g = &self.geometry;
        assert_eq!(
            input.len(),
            g.rows * g.cols,
            "untiler input: expected {}x{}",
            g.rows,
            g.cols
        );
        assert_eq!(
            output.len(),
            g.rows * g.cols,
            "untiler output: expected {}x{}",
            g.rows,
            g.cols
        );

        let mut loaded = vec![T::default(); g.vector_len()];
        let mut ordered = vec![T::default(); g.vector_len()];
        for block_r in 0..g.blocks_down() {
            for block_c in 0..g.blocks_across() {
                for (band, dst) in loaded.chunks_exact_mut(g.band_len()).enumerate() {
                    let at = g.band_offset(block_r, block_c, band);
                    dst.copy_from_slice(&input[at..at + g.band_len()]);
                }

                let vector = match &self.shuffle {
                    Some(offsets) => {
                        apply_shuffle(offsets, &loaded, &mut ordered);
                        &ordered
                    }
                    None => &loaded,
                };

                for (i, src) in vector.chunks_exact(g.load_size).enumerate() {
                    let at = g.load_offset(block_r, block_c, i);
                    output[at..at + g.load_size].copy_from_slice(src);
                }
            }
        }
    }

    /// Untile a [`TiledBuffer`] into a [`Matrix`] in the configured layout.
    pub fn untile_buffer(&self, input: &TiledBuffer<T>) -> Result<Matrix<T>> {
        let g = &self.geometry;
        if input.rows() != g.rows || input.cols() != g.cols {
            return Err(Error::ShapeMismatch {
                port: "untiler",
                expected_rows: g.rows,
                expected_cols: g.cols,
                rows: input.rows(),
                cols: input.cols(),
            });
        }
        if (input.tile_rows(), input.tile_cols()) != (g.tile_rows, g.tile_cols) {
            return Err(Error::OperandLayoutMismatch {
                port: "untiler",
                expected: "tiles matching the configured scheme",
            });
        }
        let mut out = Matrix::zeros(g.rows, g.cols, g.leading);
        self.untile(input.as_slice(), out.as_mut_slice());
        Ok(out)
    }
}
