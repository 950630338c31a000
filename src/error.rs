//! Error types for aie-gemm.
//!
//! Almost everything here is a construction-time error: a configuration that
//! fails one of these checks never produces a kernel or a graph. The only
//! errors that can show up while a graph runs are the cascade-link ones, and
//! those mean a stage died, not that the arithmetic went wrong.

use crate::dtype::{DataType, Device};
use crate::numeric::RoundMode;
use thiserror::Error;

/// Result type alias using the crate's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or running a matrix multiply pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The type pair has no entry in the tiling-scheme or accumulator tables
    #[error("Unsupported type combination {a:?} x {b:?} on {device:?}")]
    UnsupportedTypeCombination {
        /// Element type of A
        a: DataType,
        /// Element type of B
        b: DataType,
        /// Target device
        device: Device,
    },

    /// Requested output type cannot hold the accumulator result
    #[error("Output type {out:?} is not legal for {a:?} x {b:?}")]
    UnsupportedOutputType {
        /// Element type of A
        a: DataType,
        /// Element type of B
        b: DataType,
        /// Requested output type
        out: DataType,
    },

    /// A dimension is not a multiple of the tile (or lane/cascade) size
    #[error("Dimension {name} = {value} is not a multiple of {multiple}")]
    DimensionNotMultipleOfTile {
        /// Which dimension failed
        name: &'static str,
        /// Its value
        value: usize,
        /// Required multiple
        multiple: usize,
    },

    /// A dimension or count that must be positive was zero
    #[error("{name} must be greater than zero")]
    ZeroDimension {
        /// Which dimension failed
        name: &'static str,
    },

    /// Layout/type combination the tiler cannot express
    #[error("Tiling {dtype:?} data in {layout} with a tile width of {tile_width} is not supported")]
    UnsupportedLayoutForType {
        /// Element type
        dtype: DataType,
        /// Layout name
        layout: &'static str,
        /// Minor tile dimension
        tile_width: usize,
    },

    /// Output shift outside the device's range
    #[error("Shift {shift} is out of the supported range 0..={max}")]
    ShiftOutOfRange {
        /// Requested shift
        shift: u32,
        /// Largest legal shift
        max: u32,
    },

    /// Rounding mode not available on the device
    #[error("Round mode {mode:?} is not available on {device:?}")]
    InvalidRoundMode {
        /// Requested mode
        mode: RoundMode,
        /// Target device
        device: Device,
    },

    /// Raw rounding code with no meaning on the device
    #[error("Illegal round mode code {code} for {device:?}")]
    InvalidRoundCode {
        /// Raw mode code
        code: u32,
        /// Target device
        device: Device,
    },

    /// Saturation mode outside the enumerated set
    #[error("Illegal saturation mode {code}")]
    InvalidSaturationMode {
        /// Raw mode code
        code: u32,
    },

    /// Float operands were given a nonzero shift
    #[error("Shift must be 0 for float types, got {shift}")]
    NonzeroShiftOnFloat {
        /// Requested shift
        shift: u32,
    },

    /// A per-kernel buffer does not fit one data-memory bank
    #[error("Buffer for {port} needs {bytes} bytes, bank holds {limit}")]
    BufferExceedsMemoryBank {
        /// Port name (A, B, out)
        port: &'static str,
        /// Bytes needed
        bytes: usize,
        /// Bank capacity
        limit: usize,
    },

    /// Operand representation does not match the graph's tiling configuration
    #[error("Operand {port} must be {expected}")]
    OperandLayoutMismatch {
        /// Port name
        port: &'static str,
        /// What the graph expected
        expected: &'static str,
    },

    /// Buffer length does not match `rows * cols`
    #[error("Buffer holds {got} elements, shape needs {expected}")]
    BufferLengthMismatch {
        /// Elements required by the shape
        expected: usize,
        /// Elements supplied
        got: usize,
    },

    /// Operand shape does not match the configured dimensions
    #[error("Operand {port}: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        /// Port name
        port: &'static str,
        /// Expected rows
        expected_rows: usize,
        /// Expected columns
        expected_cols: usize,
        /// Actual rows
        rows: usize,
        /// Actual columns
        cols: usize,
    },

    /// The peer of a cascade link went away mid-invocation
    #[error("Cascade link disconnected at stage {stage}")]
    CascadeDisconnected {
        /// Stage that saw the disconnect
        stage: usize,
    },

    /// A stage thread panicked
    #[error("Lane {lane} stage {stage} failed")]
    StageFailed {
        /// SSR lane
        lane: usize,
        /// Cascade position
        stage: usize,
    },
}
