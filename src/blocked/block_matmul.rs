//! Cascaded block matrix multiply.
//!
//! One [`BlockMatMul`] is one compute kernel: `C = A * B` over a
//! `dim_a x dim_ab` block of A and a `dim_ab x dim_b` block of B, working
//! one native tile at a time. Where it sits in a cascade decides how its
//! accumulators start and where they end up:
//!
//! | position     | accumulators start as | finished accumulators |
//! |--------------|-----------------------|-----------------------|
//! | `Standalone` | `mul` of first tile   | rounded into output   |
//! | `First`      | `mul` of first tile   | written downstream    |
//! | `Middle`     | read from upstream    | written downstream    |
//! | `Last`       | read from upstream    | rounded into output   |
//!
//! Output tiles are visited two A-chunks by two B-chunks at a time when the
//! tile counts allow it, emitting `C00, C01, C10, C11`. Producer and
//! consumer run the same loop, so the cascade stream needs no tags.

use super::cascade::{CascadeSink, CascadeSource};
use super::operand::{Operand, OutputTarget};
use crate::dtype::{AccKind, Device, Element, TilingScheme, check_output_type};
use crate::error::{Error, Result};
use crate::numeric::{Accumulator, RoundMode, SatMode, validate_shift};
use std::marker::PhantomData;
use tracing::{debug, trace};

/// Role of a kernel in its cascade chain. Fixed for the kernel's lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CascadePosition {
    Standalone,
    First,
    Middle,
    Last,
}

impl CascadePosition {
    /// Position of stage `index` in a chain of `len` stages.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len`.
    pub fn for_stage(index: usize, len: usize) -> CascadePosition {
        assert!(index < len, "stage {} of a {}-stage cascade", index, len);
        match (index, len) {
            (_, 1) => CascadePosition::Standalone,
            (0, _) => CascadePosition::First,
            (i, n) if i == n - 1 => CascadePosition::Last,
            _ => CascadePosition::Middle,
        }
    }

    pub fn has_cascade_in(self) -> bool {
        matches!(self, CascadePosition::Middle | CascadePosition::Last)
    }

    pub fn has_cascade_out(self) -> bool {
        matches!(self, CascadePosition::First | CascadePosition::Middle)
    }
}

/// Per-kernel block dimensions
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockDims {
    pub dim_a: usize,
    pub dim_ab: usize,
    pub dim_b: usize,
}

/// Accumulator-to-output conversion
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OutputConversion {
    pub shift: u32,
    pub round: RoundMode,
    pub sat: SatMode,
}

/// A validated block-multiply kernel for `A x B -> O`.
#[derive(Clone, Debug)]
pub struct BlockMatMul<A, B, O> {
    device: Device,
    position: CascadePosition,
    dims: BlockDims,
    scheme: TilingScheme,
    acc_kind: AccKind,
    conversion: OutputConversion,
    _marker: PhantomData<(A, B, O)>,
}

impl<A: Element, B: Element, O: Element> BlockMatMul<A, B, O> {
    /// Build a kernel, rejecting every configuration the hardware can't run.
    ///
    /// # Errors
    ///
    /// * `UnsupportedTypeCombination` / `UnsupportedOutputType` for the types
    /// * `ZeroDimension` / `DimensionNotMultipleOfTile` for the block shape
    /// * `ShiftOutOfRange`, `NonzeroShiftOnFloat`, `InvalidRoundMode` for the
    ///   conversion
    /// * `BufferExceedsMemoryBank` if an A, B or output buffer doesn't fit
    ///
    /// # Example
    ///
    /// ```
    /// use aie_gemm::blocked::{BlockDims, BlockMatMul, CascadePosition, OutputConversion};
    /// use aie_gemm::dtype::Device;
    ///
    /// let dims = BlockDims { dim_a: 16, dim_ab: 16, dim_b: 16 };
    /// let k = BlockMatMul::<i16, i16, i16>::new(
    ///     Device::Aie,
    ///     CascadePosition::Standalone,
    ///     dims,
    ///     OutputConversion::default(),
    /// );
    /// assert!(k.is_ok());
    ///
    /// let odd = BlockDims { dim_a: 6, dim_ab: 16, dim_b: 16 };
    /// assert!(BlockMatMul::<i16, i16, i16>::new(
    ///     Device::Aie,
    ///     CascadePosition::Standalone,
    ///     odd,
    ///     OutputConversion::default(),
    /// )
    /// .is_err());
    /// ```
    pub fn new(
        device: Device,
        position: CascadePosition,
        dims: BlockDims,
        conversion: OutputConversion,
    ) -> Result<Self> {
        let (ta, tb, to) = (A::DTYPE, B::DTYPE, O::DTYPE);
        let scheme = TilingScheme::select(device, ta, tb);
        let acc_kind = check_output_type(device, ta, tb, to)?;

        validate_shift(device, conversion.shift, ta.is_float() || tb.is_float())?;
        if !conversion.round.is_supported_on(device) {
            return Err(Error::InvalidRoundMode {
                mode: conversion.round,
                device,
            });
        }

        for (name, value, tile) in [
            ("dim_a", dims.dim_a, scheme.a_tile),
            ("dim_ab", dims.dim_ab, scheme.ab_tile),
            ("dim_b", dims.dim_b, scheme.b_tile),
        ] {
            if value == 0 {
                return Err(Error::ZeroDimension { name });
            }
            if value % tile != 0 {
                return Err(Error::DimensionNotMultipleOfTile {
                    name,
                    value,
                    multiple: tile,
                });
            }
        }

        let bank = device.memory_bank_bytes();
        let mut buffers = vec![
            ("A", dims.dim_a * dims.dim_ab * ta.size_bytes()),
            ("B", dims.dim_ab * dims.dim_b * tb.size_bytes()),
        ];
        if !position.has_cascade_out() {
            buffers.push(("out", dims.dim_a * dims.dim_b * to.size_bytes()));
        }
        for (port, bytes) in buffers {
            if bytes > bank {
                return Err(Error::BufferExceedsMemoryBank {
                    port,
                    bytes,
                    limit: bank,
                });
            }
        }

        debug!(
            a = %ta,
            b = %tb,
            out = %to,
            ?device,
            ?position,
            ?scheme,
            ?acc_kind,
            dim_a = dims.dim_a,
            dim_ab = dims.dim_ab,
            dim_b = dims.dim_b,
            "block matmul kernel"
        );

        Ok(Self {
            device,
            position,
            dims,
            scheme,
            acc_kind,
            conversion,
            _marker: PhantomData,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn position(&self) -> CascadePosition {
        self.position
    }

    pub fn dims(&self) -> BlockDims {
        self.dims
    }

    pub fn scheme(&self) -> TilingScheme {
        self.scheme
    }

    pub fn acc_kind(&self) -> AccKind {
        self.acc_kind
    }

    pub fn conversion(&self) -> OutputConversion {
        self.conversion
    }

    /// Accumulators per invocation, i.e. items on each cascade link
    pub fn output_tiles(&self) -> usize {
        (self.dims.dim_a / self.scheme.a_tile) * (self.dims.dim_b / self.scheme.b_tile)
    }

    /// Run the kernel once.
    ///
    /// `cascade_in` and `cascade_out` must be present exactly when the
    /// kernel's position has them, and `out` exactly when it has no cascade
    /// out. Errors only come from the cascade ports.
    ///
    /// # Panics
    ///
    /// Panics if the ports don't match the position, if an operand's shape
    /// or tile shape doesn't match the kernel, or if an upstream accumulator
    /// has the wrong kind.
    pub fn compute(
        &self,
        a: Operand<'_, A>,
        b: Operand<'_, B>,
        mut cascade_in: Option<&mut dyn CascadeSource>,
        mut cascade_out: Option<&mut dyn CascadeSink>,
        mut out: Option<OutputTarget<'_, O>>,
    ) -> Result<()> {
        let pos = self.position;
        let BlockDims { dim_a, dim_ab, dim_b } = self.dims;
        let TilingScheme {
            a_tile: m,
            ab_tile: n,
            b_tile: k,
        } = self.scheme;

        assert_eq!(
            cascade_in.is_some(),
            pos.has_cascade_in(),
            "{:?}: cascade in port",
            pos
        );
        assert_eq!(
            cascade_out.is_some(),
            pos.has_cascade_out(),
            "{:?}: cascade out port",
            pos
        );
        assert_eq!(
            out.is_some(),
            !pos.has_cascade_out(),
            "{:?}: output port",
            pos
        );
        assert_eq!(
            (a.rows(), a.cols()),
            (dim_a, dim_ab),
            "A: expected {}x{}",
            dim_a,
            dim_ab
        );
        assert_eq!(
            (b.rows(), b.cols()),
            (dim_ab, dim_b),
            "B: expected {}x{}",
            dim_ab,
            dim_b
        );
        assert!(
            a.tile_shape().is_none_or(|s| s == (m, n)),
            "A tiled with the wrong tile shape"
        );
        assert!(
            b.tile_shape().is_none_or(|s| s == (n, k)),
            "B tiled with the wrong tile shape"
        );
        if let Some(target) = &out {
            assert_eq!(
                (target.rows(), target.cols()),
                (dim_a, dim_b),
                "out: expected {}x{}",
                dim_a,
                dim_b
            );
            assert!(
                target.tile_shape().is_none_or(|s| s == (m, k)),
                "out tiled with the wrong tile shape"
            );
        }

        trace!(?pos, dim_a, dim_ab, dim_b, "block matmul start");

        let tiles_a = dim_a / m;
        let tiles_ab = dim_ab / n;
        let tiles_b = dim_b / k;
        let step_a = if tiles_a % 2 == 0 && dim_a > m { 2 } else { 1 };
        let step_b = if tiles_b % 2 == 0 && dim_b > k { 2 } else { 1 };

        let mut a_buf = vec![vec![A::default(); m * n]; step_a];
        let mut b_buf = vec![vec![B::default(); n * k]; step_b];
        let mut c_buf = vec![O::default(); m * k];
        let mut accs: Vec<Accumulator> = (0..step_a * step_b)
            .map(|_| Accumulator::zeroed(self.acc_kind, m * k))
            .collect();

        for a_chunk in (0..tiles_a).step_by(step_a) {
            for b_chunk in (0..tiles_b).step_by(step_b) {
                // C00, C01, C10, C11
                if let Some(src) = cascade_in.as_deref_mut() {
                    for acc in accs.iter_mut() {
                        let incoming = src.read_acc()?;
                        assert_eq!(incoming.kind(), self.acc_kind, "cascade accumulator kind");
                        assert_eq!(incoming.len(), m * k, "cascade accumulator length");
                        *acc = incoming;
                    }
                }

                for ab in 0..tiles_ab {
                    for (da, tile) in a_buf.iter_mut().enumerate() {
                        a.load_tile(a_chunk + da, ab, m, n, tile);
                    }
                    for (db, tile) in b_buf.iter_mut().enumerate() {
                        b.load_tile(ab, b_chunk + db, n, k, tile);
                    }
                    let start = ab == 0 && cascade_in.is_none();
                    for (idx, acc) in accs.iter_mut().enumerate() {
                        let (ta, tb) = (&a_buf[idx / step_b], &b_buf[idx % step_b]);
                        if start {
                            acc.mul(ta, tb, self.scheme);
                        } else {
                            acc.mac(ta, tb, self.scheme);
                        }
                    }
                }

                for (idx, acc) in accs.iter().enumerate() {
                    let (tr, tc) = (a_chunk + idx / step_b, b_chunk + idx % step_b);
                    if let Some(sink) = cascade_out.as_deref_mut() {
                        sink.write_acc(acc.clone())?;
                    } else if let Some(target) = out.as_mut() {
                        let OutputConversion { shift, round, sat } = self.conversion;
                        acc.to_output(shift, round, sat, &mut c_buf);
                        target.store_tile(tr, tc, m, k, &c_buf);
                    }
                }
            }
        }

        trace!(?pos, "block matmul done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::naive::matmul_reference;
    use crate::matrix::{LeadingDim, Matrix};
    use crate::numeric::accumulator::AccLanes;
    use std::collections::VecDeque;

    fn standalone<A: Element, B: Element, O: Element>(dims: BlockDims) -> BlockMatMul<A, B, O> {
        BlockMatMul::new(
            Device::Aie,
            CascadePosition::Standalone,
            dims,
            OutputConversion::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_for_stage() {
        assert_eq!(
            CascadePosition::for_stage(0, 1),
            CascadePosition::Standalone
        );
        assert_eq!(CascadePosition::for_stage(0, 3), CascadePosition::First);
        assert_eq!(CascadePosition::for_stage(1, 3), CascadePosition::Middle);
        assert_eq!(CascadePosition::for_stage(2, 3), CascadePosition::Last);
        assert_eq!(CascadePosition::for_stage(1, 2), CascadePosition::Last);
    }

    #[test]
    fn test_standalone_matches_reference_with_odd_tile_counts() {
        // 3 A-chunks and 3 B-chunks: no dual-accumulator stepping
        let dims = BlockDims {
            dim_a: 12,
            dim_ab: 8,
            dim_b: 12,
        };
        let a = Matrix::from_fn(12, 8, LeadingDim::RowMajor, |r, c| (r as i16) - (c as i16));
        let b = Matrix::from_fn(8, 12, LeadingDim::RowMajor, |r, c| (r * c) as i16 % 7);
        let kernel = standalone::<i16, i16, i32>(dims);
        let mut out = Matrix::zeros(12, 12, LeadingDim::RowMajor);
        kernel
            .compute(
                Operand::Linear(&a),
                Operand::Linear(&b),
                None,
                None,
                Some(OutputTarget::Linear(&mut out)),
            )
            .unwrap();
        let expected: Matrix<i32> = matmul_reference(
            &a,
            &b,
            0,
            RoundMode::Floor,
            SatMode::None,
            LeadingDim::RowMajor,
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_cascade_stream_order_is_c00_c01_c10_c11() {
        let dims = BlockDims {
            dim_a: 8,
            dim_ab: 4,
            dim_b: 8,
        };
        let kernel = BlockMatMul::<i16, i16, i16>::new(
            Device::Aie,
            CascadePosition::First,
            dims,
            OutputConversion::default(),
        )
        .unwrap();
        // every element of output tile (tr, tc) is 100 * tr + tc
        let a = Matrix::from_fn(8, 4, LeadingDim::RowMajor, |r, c| match c {
            0 => (r / 4) as i16,
            1 => 1,
            _ => 0,
        });
        let b = Matrix::from_fn(4, 8, LeadingDim::RowMajor, |r, c| match r {
            0 => 100,
            1 => (c / 4) as i16,
            _ => 0,
        });
        let mut stream = VecDeque::<Accumulator>::new();
        kernel
            .compute(
                Operand::Linear(&a),
                Operand::Linear(&b),
                None,
                Some(&mut stream),
                None,
            )
            .unwrap();
        assert_eq!(stream.len(), kernel.output_tiles());

        let tags: Vec<i128> = stream
            .iter()
            .map(|acc| match acc.lanes() {
                AccLanes::Fixed(lanes) => lanes[0].re,
                AccLanes::Float(_) => panic!("expected fixed lanes"),
            })
            .collect();
        assert_eq!(tags, vec![0, 1, 100, 101]);
    }

    #[test]
    fn test_first_then_last_equals_standalone() {
        let a = Matrix::from_fn(8, 16, LeadingDim::RowMajor, |r, c| {
            ((r * 3 + c * 5) % 11) as i16 - 5
        });
        let b = Matrix::from_fn(16, 8, LeadingDim::RowMajor, |r, c| {
            ((r * 7 + c) % 13) as i16 - 6
        });
        let conv = OutputConversion {
            shift: 2,
            round: RoundMode::ConvEven,
            sat: SatMode::Saturate,
        };
        let half = BlockDims {
            dim_a: 8,
            dim_ab: 8,
            dim_b: 8,
        };
        let first =
            BlockMatMul::<i16, i16, i16>::new(Device::Aie, CascadePosition::First, half, conv)
                .unwrap();
        let last = BlockMatMul::<i16, i16, i16>::new(Device::Aie, CascadePosition::Last, half, conv)
            .unwrap();

        let mut link = VecDeque::<Accumulator>::new();
        let (a0, a1) = (a.sub_matrix(0..8, 0..8), a.sub_matrix(0..8, 8..16));
        let (b0, b1) = (b.sub_matrix(0..8, 0..8), b.sub_matrix(8..16, 0..8));
        first
            .compute(
                Operand::Linear(&a0),
                Operand::Linear(&b0),
                None,
                Some(&mut link),
                None,
            )
            .unwrap();
        let mut cascaded = Matrix::zeros(8, 8, LeadingDim::RowMajor);
        last.compute(
            Operand::Linear(&a1),
            Operand::Linear(&b1),
            Some(&mut link),
            None,
            Some(OutputTarget::Linear(&mut cascaded)),
        )
        .unwrap();
        assert!(link.is_empty());

        let expected: Matrix<i16> = matmul_reference(
            &a,
            &b,
            2,
            RoundMode::ConvEven,
            SatMode::Saturate,
            LeadingDim::RowMajor,
        );
        assert_eq!(cascaded, expected);
    }

    #[test]
    fn test_short_cascade_stream_is_an_error() {
        let dims = BlockDims {
            dim_a: 4,
            dim_ab: 4,
            dim_b: 4,
        };
        let last = BlockMatMul::<i16, i16, i16>::new(
            Device::Aie,
            CascadePosition::Last,
            dims,
            OutputConversion::default(),
        )
        .unwrap();
        let a = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let b = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let mut out = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let mut empty = VecDeque::<Accumulator>::new();
        let err = last
            .compute(
                Operand::Linear(&a),
                Operand::Linear(&b),
                Some(&mut empty),
                None,
                Some(OutputTarget::Linear(&mut out)),
            )
            .unwrap_err();
        assert_eq!(err, Error::CascadeDisconnected { stage: 0 });
    }

    #[test]
    #[should_panic(expected = "cascade out port")]
    fn test_missing_cascade_out_panics() {
        let dims = BlockDims {
            dim_a: 4,
            dim_ab: 4,
            dim_b: 4,
        };
        let first = BlockMatMul::<i16, i16, i16>::new(
            Device::Aie,
            CascadePosition::First,
            dims,
            OutputConversion::default(),
        )
        .unwrap();
        let a = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let b = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let mut out = Matrix::zeros(4, 4, LeadingDim::RowMajor);
        let _ = first.compute(
            Operand::Linear(&a),
            Operand::Linear(&b),
            None,
            None,
            Some(OutputTarget::Linear(&mut out)),
        );
    }

    #[test]
    fn test_construction_errors() {
        let dims = BlockDims {
            dim_a: 4,
            dim_ab: 4,
            dim_b: 4,
        };
        let conv = OutputConversion::default();
        assert!(matches!(
            BlockMatMul::<i16, f32, f32>::new(Device::Aie, CascadePosition::Standalone, dims, conv),
            Err(Error::UnsupportedTypeCombination { .. })
        ));
        assert!(matches!(
            BlockMatMul::<f32, f32, f32>::new(
                Device::Aie,
                CascadePosition::Standalone,
                dims,
                OutputConversion { shift: 3, ..conv }
            ),
            Err(Error::NonzeroShiftOnFloat { shift: 3 })
        ));
        assert!(matches!(
            BlockMatMul::<i16, i16, i16>::new(
                Device::Aie,
                CascadePosition::Standalone,
                dims,
                OutputConversion {
                    round: RoundMode::SymFloor,
                    ..conv
                }
            ),
            Err(Error::InvalidRoundMode {
                mode: RoundMode::SymFloor,
                device: Device::Aie
            })
        ));
        let big = BlockDims {
            dim_a: 256,
            dim_ab: 128,
            dim_b: 4,
        };
        assert_eq!(
            BlockMatMul::<i16, i16, i16>::new(Device::Aie, CascadePosition::Standalone, big, conv)
                .unwrap_err(),
            Error::BufferExceedsMemoryBank {
                port: "A",
                bytes: 256 * 128 * 2,
                limit: 32 * 1024
            }
        );
        assert!(
            BlockMatMul::<i16, i16, i16>::new(Device::AieMl, CascadePosition::Standalone, big, conv)
                .is_ok()
        );
    }
}
