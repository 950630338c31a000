//! Tiled, cascaded matrix multiply modelled on the AI Engine DSP kernels.
//!
//! The hardware multiplies small fixed-shape tiles natively, so a matrix
//! multiply there is: reorder both operands into tiles, run block multiply
//! kernels that pass partial sums down a cascade, and reorder the result
//! back. This crate does the same thing on the CPU, bit for bit on integer
//! data, with the same tiling tables, accumulator widths and rounding modes.
//!
//! ## Usage
//!
//! ```
//! use aie_gemm::matrix::{LeadingDim, Matrix};
//! use aie_gemm::multiply;
//!
//! let a = Matrix::from_fn(16, 16, LeadingDim::RowMajor, |r, c| (r * 16 + c) as i16 % 50);
//! let b = Matrix::from_fn(16, 16, LeadingDim::RowMajor, |r, c| (r == c) as i16);
//!
//! let c: Matrix<i32> = multiply(&a, &b).unwrap();
//! assert_eq!(c.get(2, 3), a.get(2, 3) as i32);
//! ```
//!
//! Splitting the work across SSR lanes and cascade stages gives the same
//! answer:
//!
//! ```
//! use aie_gemm::matrix::{LeadingDim, Matrix};
//! use aie_gemm::{multiply, multiply_parallel};
//!
//! let a = Matrix::from_fn(32, 32, LeadingDim::RowMajor, |r, c| (r as i16) - (c as i16));
//! let b = Matrix::from_fn(32, 16, LeadingDim::RowMajor, |r, c| ((r + c) % 5) as i16);
//!
//! let single: Matrix<i32> = multiply(&a, &b).unwrap();
//! let split: Matrix<i32> = multiply_parallel(&a, &b, 2, 4).unwrap();
//! assert_eq!(single, split);
//! ```
//!
//! For full control (shift, rounding, saturation, layouts, device) build a
//! [`MatMultConfig`] and a [`MatMultGraph`].
//!
//! ## What's inside
//!
//! - Tiling-scheme and accumulator tables for two hardware generations
//! - Tiler/untiler kernels driven by explicit shuffle tables
//! - Block multiply with Standalone/First/Middle/Last cascade roles
//! - Threaded graph: SSR lanes x cascade stages over bounded channels

pub mod blocked;
pub mod config;
pub mod dtype;
pub mod error;
pub mod kernels;
pub mod matrix;
pub mod numeric;
pub mod threaded;

pub use config::MatMultConfig;
pub use dtype::{DataType, Device, Element, TilingScheme};
pub use error::{Error, Result};
pub use matrix::{LeadingDim, Matrix, TiledBuffer};
pub use numeric::{RoundMode, SatMode};
pub use threaded::{GraphOutput, MatMultGraph};

use blocked::Operand;

/// Matrix multiply: C = A * B
///
/// Uses the default graph configuration (one lane, one stage, no shift,
/// floor rounding, no saturation), with the operands' own layouts and a
/// row-major result.
pub fn multiply<A: Element, B: Element, O: Element>(
    a: &Matrix<A>,
    b: &Matrix<B>,
) -> Result<Matrix<O>> {
    multiply_parallel(a, b, 1, 1)
}

/// Same as [`multiply`] but split over `ssr` lanes and `cascade_len` stages.
///
/// `a.rows()` must divide by `ssr` and `a.cols()` by `cascade_len`.
pub fn multiply_parallel<A: Element, B: Element, O: Element>(
    a: &Matrix<A>,
    b: &Matrix<B>,
    ssr: usize,
    cascade_len: usize,
) -> Result<Matrix<O>> {
    if a.cols() != b.rows() {
        return Err(Error::ShapeMismatch {
            port: "B",
            expected_rows: a.cols(),
            expected_cols: b.cols(),
            rows: b.rows(),
            cols: b.cols(),
        });
    }
    let config = MatMultConfig::new(a.rows(), a.cols(), b.cols())
        .with_leading_a(a.leading())
        .with_leading_b(b.leading())
        .with_ssr(ssr)
        .with_cascade_len(cascade_len);
    let graph = MatMultGraph::<A, B, O>::new(config)?;
    graph
        .run(Operand::Linear(a), Operand::Linear(b))?
        .into_matrix()
        .ok_or(Error::OperandLayoutMismatch {
            port: "out",
            expected: "a linear matrix",
        })
}
