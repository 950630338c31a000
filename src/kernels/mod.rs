//! Layout kernels that move data between linear and tile-major order.
//!
//! The block multiply wants every tile as one contiguous run. These kernels
//! produce that layout from a row- or column-major matrix and undo it on
//! the way out:
//! - `geometry`: vector-block shape and load/store offsets
//! - `shuffle`: per-lane permutation tables
//! - `tiler` / `untiler`: the kernels themselves

pub mod geometry;
pub mod shuffle;
pub mod tiler;
pub mod untiler;

pub use geometry::TileGeometry;
pub use tiler::Tiler;
pub use untiler::Untiler;
