//! Exact reference multiply.
//!
//! Integer products are summed in `i128`, which cannot overflow for any
//! matrix that fits in a kernel buffer, so the result is the unbounded-precision
//! product. Float products are summed in `f64`. Both use the cache-friendly
//! i-k-j loop order.

use super::{LeadingDim, Matrix};
use crate::dtype::Element;
use crate::numeric::{RoundMode, SatMode, shift_round_saturate};
use num_complex::Complex;

/// Exact integer product `A * B` (row-major result).
///
/// # Arguments
///
/// * `a` - Matrix A (m × k), any storage order
/// * `b` - Matrix B (k × n), any storage order
pub fn matmul_reference_fixed<A: Element, B: Element>(
    a: &Matrix<A>,
    b: &Matrix<B>,
) -> Matrix<Complex<i128>> {
    assert_eq!(a.cols(), b.rows(), "inner dimensions differ");
    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    let mut c = vec![Complex::new(0i128, 0); m * n];
    for i in 0..m {
        for p in 0..k {
            let x = a.get(i, p).to_fixed();
            for j in 0..n {
                let y = b.get(p, j).to_fixed();
                let cell = &mut c[i * n + j];
                cell.re += x.re * y.re - x.im * y.im;
                cell.im += x.re * y.im + x.im * y.re;
            }
        }
    }
    Matrix {
        rows: m,
        cols: n,
        leading: LeadingDim::RowMajor,
        data: c,
    }
}

/// Float product `A * B` in double precision (row-major result).
pub fn matmul_reference_float<A: Element, B: Element>(
    a: &Matrix<A>,
    b: &Matrix<B>,
) -> Matrix<Complex<f64>> {
    assert_eq!(a.cols(), b.rows(), "inner dimensions differ");
    let (m, k, n) = (a.rows(), a.cols(), b.cols());
    let widen = |z: Complex<f32>| Complex::new(z.re as f64, z.im as f64);
    let mut c = vec![Complex::new(0.0f64, 0.0); m * n];
    for i in 0..m {
        for p in 0..k {
            let x = widen(a.get(i, p).to_float());
            for j in 0..n {
                c[i * n + j] += x * widen(b.get(p, j).to_float());
            }
        }
    }
    Matrix {
        rows: m,
        cols: n,
        leading: LeadingDim::RowMajor,
        data: c,
    }
}

/// Exact product converted to `O` with the given shift/round/saturate, laid
/// out as `leading`.
///
/// This is what the tiled pipeline must reproduce bit for bit on integer data
/// (as long as the accumulator doesn't wrap).
pub fn matmul_reference<A: Element, B: Element, O: Element>(
    a: &Matrix<A>,
    b: &Matrix<B>,
    shift: u32,
    round: RoundMode,
    sat: SatMode,
    leading: LeadingDim,
) -> Matrix<O> {
    let (m, n) = (a.rows(), b.cols());
    if O::DTYPE.is_float() {
        let exact = matmul_reference_float(a, b);
        Matrix::from_fn(m, n, leading, |r, c| {
            let z = exact.get(r, c);
            O::from_float(Complex::new(z.re as f32, z.im as f32))
        })
    } else {
        let exact = matmul_reference_fixed(a, b);
        let bits = O::DTYPE.component_bits();
        Matrix::from_fn(m, n, leading, |r, c| {
            let z = exact.get(r, c);
            O::from_fixed(Complex::new(
                shift_round_saturate(z.re, shift, round, sat, bits),
                shift_round_saturate(z.im, shift, round, sat, bits),
            ))
        })
    }
}
