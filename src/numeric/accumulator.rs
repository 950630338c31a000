//! Widened running sums for one output tile.

use crate::dtype::{AccKind, Element, TilingScheme};
use crate::numeric::{RoundMode, SatMode, shift_round_saturate, wrap_to_bits};
use num_complex::Complex;

/// Lane storage, integer or float depending on the accumulator kind
#[derive(Clone, Debug, PartialEq)]
pub enum AccLanes {
    Fixed(Vec<Complex<i128>>),
    Float(Vec<Complex<f32>>),
}

/// One output tile's worth of partial sums, held at accumulator precision.
///
/// Owned by exactly one cascade stage at a time; stages hand it on by value.
#[derive(Clone, Debug, PartialEq)]
pub struct Accumulator {
    kind: AccKind,
    lanes: AccLanes,
}

impl Accumulator {
    /// All-zero accumulator with `len` lanes
    pub fn zeroed(kind: AccKind, len: usize) -> Self {
        let lanes = if kind.is_float() {
            AccLanes::Float(vec![Complex::new(0.0, 0.0); len])
        } else {
            AccLanes::Fixed(vec![Complex::new(0, 0); len])
        };
        Self { kind, lanes }
    }

    pub fn kind(&self) -> AccKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        match &self.lanes {
            AccLanes::Fixed(v) => v.len(),
            AccLanes::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lanes(&self) -> &AccLanes {
        &self.lanes
    }

    /// Start a new sum: `C = A * B` for one pair of tiles.
    pub fn mul<A: Element, B: Element>(&mut self, a: &[A], b: &[B], scheme: TilingScheme) {
        match &mut self.lanes {
            AccLanes::Fixed(v) => v.fill(Complex::new(0, 0)),
            AccLanes::Float(v) => v.fill(Complex::new(0.0, 0.0)),
        }
        self.mac(a, b, scheme);
    }

    /// `C += A * B` for one pair of tiles.
    ///
    /// `a` is an `a_tile x ab_tile` row-major tile, `b` an `ab_tile x b_tile`
    /// row-major tile, and the lanes are the `a_tile x b_tile` result in
    /// row-major order. Integer lanes wrap at the accumulator width.
    pub fn mac<A: Element, B: Element>(&mut self, a: &[A], b: &[B], scheme: TilingScheme) {
        let (m, n, k) = (scheme.a_tile, scheme.ab_tile, scheme.b_tile);
        debug_assert_eq!(a.len(), m * n);
        debug_assert_eq!(b.len(), n * k);
        debug_assert_eq!(self.len(), m * k);

        let bits = self.kind.bits();
        match &mut self.lanes {
            AccLanes::Fixed(lanes) => {
                for i in 0..m {
                    for j in 0..k {
                        let mut sum = lanes[i * k + j];
                        for p in 0..n {
                            let x = a[i * n + p].to_fixed();
                            let y = b[p * k + j].to_fixed();
                            sum.re += x.re * y.re - x.im * y.im;
                            sum.im += x.re * y.im + x.im * y.re;
                        }
                        lanes[i * k + j] =
                            Complex::new(wrap_to_bits(sum.re, bits), wrap_to_bits(sum.im, bits));
                    }
                }
            }
            AccLanes::Float(lanes) => {
                for i in 0..m {
                    for j in 0..k {
                        let mut sum = lanes[i * k + j];
                        for p in 0..n {
                            sum += a[i * n + p].to_float() * b[p * k + j].to_float();
                        }
                        lanes[i * k + j] = sum;
                    }
                }
            }
        }
    }

    /// Convert every lane to the output type, writing one row-major tile.
    ///
    /// Float lanes are copied as-is (float configurations never shift).
    pub fn to_output<O: Element>(&self, shift: u32, round: RoundMode, sat: SatMode, out: &mut [O]) {
        debug_assert_eq!(out.len(), self.len());
        match &self.lanes {
            AccLanes::Fixed(lanes) => {
                let bits = O::DTYPE.component_bits();
                for (dst, lane) in out.iter_mut().zip(lanes) {
                    let re = shift_round_saturate(lane.re, shift, round, sat, bits);
                    let im = shift_round_saturate(lane.im, shift, round, sat, bits);
                    *dst = O::from_fixed(Complex::new(re, im));
                }
            }
            AccLanes::Float(lanes) => {
                for (dst, lane) in out.iter_mut().zip(lanes) {
                    *dst = O::from_float(*lane);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Cint16;

    #[test]
    fn test_mul_then_mac_matches_hand_computation() {
        let scheme = TilingScheme::new(2, 2, 2);
        let a: [i16; 4] = [1, 2, 3, 4];
        let b: [i16; 4] = [5, 6, 7, 8];
        let mut acc = Accumulator::zeroed(AccKind::Acc48, 4);
        acc.mul(&a, &b, scheme);
        acc.mac(&a, &b, scheme);

        let mut out = [0i32; 4];
        acc.to_output(0, RoundMode::Floor, SatMode::None, &mut out);
        assert_eq!(out, [38, 44, 86, 100]);
    }

    #[test]
    fn test_complex_lanes() {
        let scheme = TilingScheme::new(1, 1, 1);
        let a = [Cint16::new(1, 2)];
        let b = [Cint16::new(3, -1)];
        let mut acc = Accumulator::zeroed(AccKind::Cacc48, 1);
        acc.mul(&a, &b, scheme);

        let mut out = [Cint16::new(0, 0)];
        acc.to_output(0, RoundMode::Floor, SatMode::Saturate, &mut out);
        // (1+2i)(3-i) = 3 - i + 6i + 2 = 5 + 5i
        assert_eq!(out[0], Cint16::new(5, 5));
    }

    #[test]
    fn test_fixed_lanes_wrap_at_acc_width() {
        let scheme = TilingScheme::new(1, 1, 1);
        let a = [i32::MAX];
        let b = [i32::MAX];
        let mut acc = Accumulator::zeroed(AccKind::Acc48, 1);
        acc.mul(&a, &b, scheme);
        match acc.lanes() {
            AccLanes::Fixed(v) => {
                let full = (i32::MAX as i128) * (i32::MAX as i128);
                assert_eq!(v[0].re, wrap_to_bits(full, 48));
            }
            AccLanes::Float(_) => panic!("expected fixed lanes"),
        }
    }
}
