//! Shuffle tables: which loaded lane feeds which output lane.
//!
//! A table is an explicit list of `(dest_lane, source_index)` pairs, one per
//! lane of a vector block, sorted by destination. The tiler's table maps
//! tile order from load order; the untiler's table is its inverse.

use super::geometry::TileGeometry;
use crate::dtype::DataType;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ShuffleOffset {
    pub dest_lane: usize,
    pub source_index: usize,
}

/// Tiler permutation: lane `d` of the tile-ordered block takes lane
/// `source_index` of the loaded block.
///
/// `int16` row-major data is shuffled on sample pairs and then expanded,
/// which gives the same permutation as working sample by sample.
///
/// ```
/// use aie_gemm::dtype::DataType;
/// use aie_gemm::kernels::geometry::TileGeometry;
/// use aie_gemm::kernels::shuffle::make_shuffle_offsets;
/// use aie_gemm::matrix::LeadingDim;
///
/// // two 2x2 int32 tiles side by side, loaded as two 4-wide rows
/// let g = TileGeometry::new(DataType::Int32, 2, 4, 2, 2, LeadingDim::RowMajor).unwrap();
/// let src: Vec<usize> = make_shuffle_offsets(&g).iter().map(|o| o.source_index).collect();
/// assert_eq!(src, vec![0, 1, 4, 5, 2, 3, 6, 7]);
/// ```
pub fn make_shuffle_offsets(geometry: &TileGeometry) -> Vec<ShuffleOffset> {
    if geometry.dtype == DataType::Int16
        && let Some(pairs) = geometry.paired()
    {
        return make_element_offsets(&pairs)
            .iter()
            .flat_map(|p| {
                (0..2).map(move |j| ShuffleOffset {
                    dest_lane: 2 * p.dest_lane + j,
                    source_index: 2 * p.source_index + j,
                })
            })
            .collect();
    }
    make_element_offsets(geometry)
}

/// Untiler permutation: lane `d` of the load-ordered block takes lane
/// `source_index` of the tile-ordered block.
pub fn make_untile_shuffle_offsets(geometry: &TileGeometry) -> Vec<ShuffleOffset> {
    let forward = make_shuffle_offsets(geometry);
    let mut inverse = vec![
        ShuffleOffset {
            dest_lane: 0,
            source_index: 0
        };
        forward.len()
    ];
    for off in &forward {
        inverse[off.source_index] = ShuffleOffset {
            dest_lane: off.source_index,
            source_index: off.dest_lane,
        };
    }
    inverse
}

/// Per-sample permutation, straight from the block geometry
fn make_element_offsets(geometry: &TileGeometry) -> Vec<ShuffleOffset> {
    (0..geometry.vector_len())
        .map(|d| {
            let (r, c) = geometry.tile_position(d);
            ShuffleOffset {
                dest_lane: d,
                source_index: geometry.load_index(r, c),
            }
        })
        .collect()
}

/// True when every lane stays put and the shuffle can be skipped
pub fn is_identity(offsets: &[ShuffleOffset]) -> bool {
    offsets.iter().all(|o| o.dest_lane == o.source_index)
}

/// `dst[dest_lane] = src[source_index]` for every entry.
///
/// # Panics
///
/// Panics if either slice is shorter than the table.
#[inline]
pub fn apply_shuffle<T: Copy>(offsets: &[ShuffleOffset], src: &[T], dst: &mut [T]) {
    assert_eq!(src.len(), offsets.len(), "shuffle source length");
    assert_eq!(dst.len(), offsets.len(), "shuffle destination length");
    for off in offsets {
        dst[off.dest_lane] = src[off.source_index];
    }
}
