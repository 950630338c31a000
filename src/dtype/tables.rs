//! Static per-type-pair tables.
//!
//! One row per supported `(A, B)` pair and device. A pair missing from a
//! table is unsupported on that device: [`TilingScheme::select`] answers with
//! the `{1, 1, 1}` sentinel and [`AccKind::for_pair`] with `None`.

use super::{DataType, Device};
use crate::error::{Error, Result};
use DataType::*;

/// Native block-multiply shape: an `a_tile x ab_tile` block of A times an
/// `ab_tile x b_tile` block of B gives an `a_tile x b_tile` block of C.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TilingScheme {
    pub a_tile: usize,
    pub ab_tile: usize,
    pub b_tile: usize,
}

impl TilingScheme {
    /// Sentinel returned for pairs with no native multiply
    pub const UNSUPPORTED: TilingScheme = TilingScheme::new(1, 1, 1);

    pub const fn new(a_tile: usize, ab_tile: usize, b_tile: usize) -> Self {
        Self {
            a_tile,
            ab_tile,
            b_tile,
        }
    }

    /// Look up the scheme for a type pair on a device.
    ///
    /// # Example
    ///
    /// ```
    /// use aie_gemm::dtype::{DataType, Device, TilingScheme};
    ///
    /// let s = TilingScheme::select(Device::Aie, DataType::Int16, DataType::Int16);
    /// assert_eq!(s, TilingScheme::new(4, 4, 4));
    ///
    /// let none = TilingScheme::select(Device::Aie, DataType::Int16, DataType::Float);
    /// assert!(!none.is_supported());
    /// ```
    pub fn select(device: Device, a: DataType, b: DataType) -> TilingScheme {
        let table = match device {
            Device::Aie => AIE_TILING,
            Device::AieMl => AIE_ML_TILING,
        };
        table
            .iter()
            .find(|(ta, tb, _)| *ta == a && *tb == b)
            .map(|(_, _, scheme)| *scheme)
            .unwrap_or(TilingScheme::UNSUPPORTED)
    }

    pub const fn is_supported(self) -> bool {
        self.a_tile * self.ab_tile * self.b_tile > 1
    }

    /// Samples in one A tile
    pub const fn tile_a_len(self) -> usize {
        self.a_tile * self.ab_tile
    }

    /// Samples in one B tile
    pub const fn tile_b_len(self) -> usize {
        self.ab_tile * self.b_tile
    }

    /// Samples (and accumulator lanes) in one output tile
    pub const fn tile_c_len(self) -> usize {
        self.a_tile * self.b_tile
    }
}

const fn ts(a_tile: usize, ab_tile: usize, b_tile: usize) -> TilingScheme {
    TilingScheme::new(a_tile, ab_tile, b_tile)
}

// First generation: 48/80-bit accumulators, 32 KiB banks.
const AIE_TILING: &[(DataType, DataType, TilingScheme)] = &[
    // 16b x 16b
    (Int16, Int16, ts(4, 4, 4)),
    // 32b x 16b
    (Cint16, Int16, ts(4, 4, 2)),
    (Int32, Int16, ts(4, 4, 2)),
    // 16b x 32b
    (Int16, Cint16, ts(4, 2, 2)),
    (Int16, Int32, ts(4, 2, 2)),
    // 32b x 32b
    (Cint16, Cint16, ts(4, 4, 2)),
    (Cint16, Int32, ts(4, 4, 2)),
    (Int32, Cint16, ts(4, 4, 2)),
    (Int32, Int32, ts(4, 4, 2)),
    (Float, Float, ts(4, 4, 2)),
    // 64b x 16b
    (Cint32, Int16, ts(2, 4, 2)),
    // 16b x 64b
    (Int16, Cint32, ts(2, 4, 2)),
    // 64b x 32b
    (Cint32, Cint16, ts(2, 2, 2)),
    (Cint32, Int32, ts(2, 2, 2)),
    // 32b x 64b
    (Cint16, Cint32, ts(2, 2, 2)),
    (Int32, Cint32, ts(2, 2, 2)),
    // 64b x 64b
    (Cint32, Cint32, ts(2, 2, 2)),
    // mixed floats
    (Cfloat, Float, ts(2, 4, 2)),
    (Float, Cfloat, ts(2, 4, 2)),
    (Cfloat, Cfloat, ts(4, 2, 2)),
];

// AIE-ML: one output tile fills at most 16 real or 8 complex 64-bit lanes.
// No native complex-float multiply.
const AIE_ML_TILING: &[(DataType, DataType, TilingScheme)] = &[
    (Int16, Int16, ts(4, 4, 4)),
    (Int32, Int16, ts(4, 4, 4)),
    (Int16, Int32, ts(4, 4, 4)),
    (Int32, Int32, ts(4, 2, 4)),
    (Cint16, Int16, ts(2, 4, 4)),
    (Int16, Cint16, ts(2, 4, 4)),
    (Cint16, Int32, ts(2, 2, 4)),
    (Int32, Cint16, ts(2, 2, 4)),
    (Cint16, Cint16, ts(1, 4, 8)),
    (Cint32, Int16, ts(2, 2, 4)),
    (Int16, Cint32, ts(2, 2, 4)),
    (Cint32, Int32, ts(1, 2, 8)),
    (Int32, Cint32, ts(1, 2, 8)),
    (Cint32, Cint16, ts(1, 2, 8)),
    (Cint16, Cint32, ts(1, 2, 8)),
    (Cint32, Cint32, ts(1, 2, 4)),
    (Float, Float, ts(4, 8, 4)),
];

/// Accumulator register kind used for a type pair
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccKind {
    Acc48,
    Cacc48,
    Acc64,
    Cacc64,
    Acc80,
    Cacc80,
    AccFloat,
    CaccFloat,
}

impl AccKind {
    /// Accumulator for a type pair, or `None` if the pair can't be multiplied
    /// on this device.
    pub fn for_pair(device: Device, a: DataType, b: DataType) -> Option<AccKind> {
        let table = match device {
            Device::Aie => AIE_ACC,
            Device::AieMl => AIE_ML_ACC,
        };
        table
            .iter()
            .find(|(ta, tb, _)| *ta == a && *tb == b)
            .map(|(_, _, kind)| *kind)
    }

    /// Bits per real component. Float accumulators are single precision.
    pub const fn bits(self) -> u32 {
        match self {
            AccKind::Acc48 | AccKind::Cacc48 => 48,
            AccKind::Acc64 | AccKind::Cacc64 => 64,
            AccKind::Acc80 | AccKind::Cacc80 => 80,
            AccKind::AccFloat | AccKind::CaccFloat => 32,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(
            self,
            AccKind::Cacc48 | AccKind::Cacc64 | AccKind::Cacc80 | AccKind::CaccFloat
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, AccKind::AccFloat | AccKind::CaccFloat)
    }
}

use AccKind::*;

const AIE_ACC: &[(DataType, DataType, AccKind)] = &[
    (Int16, Int16, Acc48),
    (Cint16, Cint16, Cacc48),
    (Int32, Int32, Acc80),
    (Cint32, Cint32, Cacc80),
    (Int16, Cint16, Cacc48),
    (Int16, Cint32, Cacc80),
    (Int16, Int32, Acc80),
    (Cint16, Int16, Cacc48),
    (Cint32, Int16, Cacc80),
    (Int32, Int16, Acc80),
    (Cint16, Int32, Cacc80),
    (Cint16, Cint32, Cacc80),
    (Int32, Cint16, Cacc80),
    (Cint32, Cint16, Cacc80),
    (Int32, Cint32, Cacc80),
    (Cint32, Int32, Cacc80),
    (Float, Float, AccFloat),
    (Cfloat, Float, CaccFloat),
    (Float, Cfloat, CaccFloat),
    (Cfloat, Cfloat, CaccFloat),
];

const AIE_ML_ACC: &[(DataType, DataType, AccKind)] = &[
    (Int16, Int16, Acc64),
    (Int32, Int16, Acc64),
    (Int16, Int32, Acc64),
    (Int32, Int32, Acc64),
    (Cint16, Int16, Cacc64),
    (Int16, Cint16, Cacc64),
    (Cint16, Int32, Cacc64),
    (Int32, Cint16, Cacc64),
    (Cint16, Cint16, Cacc64),
    (Cint32, Int16, Cacc64),
    (Int16, Cint32, Cacc64),
    (Cint32, Int32, Cacc64),
    (Int32, Cint32, Cacc64),
    (Cint32, Cint16, Cacc64),
    (Cint16, Cint32, Cacc64),
    (Cint32, Cint32, Cacc64),
    (Float, Float, AccFloat),
];

/// Pairs with both a tiling scheme and an accumulator on `device`
pub fn supported_pairs(device: Device) -> impl Iterator<Item = (DataType, DataType)> {
    let table = match device {
        Device::Aie => AIE_TILING,
        Device::AieMl => AIE_ML_TILING,
    };
    table.iter().map(|(a, b, _)| (*a, *b))
}

/// Output type used when none is requested: the wider operand type, and on a
/// tie the complex one so a complex accumulator is never narrowed to real.
///
/// Returns `None` when the pair has no accumulator on the first-generation
/// table (the superset of both devices).
pub fn default_output_type(a: DataType, b: DataType) -> Option<DataType> {
    AccKind::for_pair(Device::Aie, a, b)?;
    let out = if b.size_bytes() > a.size_bytes() {
        b
    } else if a.size_bytes() > b.size_bytes() {
        a
    } else if b.is_complex() && !a.is_complex() {
        b
    } else {
        a
    };
    Some(out)
}

/// Check that `out` can receive the accumulator of `a x b` on `device` and
/// return that accumulator.
///
/// The output must be in the accumulator's family (integer or float), and a
/// complex accumulator needs a complex output.
pub fn check_output_type(
    device: Device,
    a: DataType,
    b: DataType,
    out: DataType,
) -> Result<AccKind> {
    let acc = AccKind::for_pair(device, a, b)
        .filter(|_| TilingScheme::select(device, a, b).is_supported())
        .ok_or(Error::UnsupportedTypeCombination { a, b, device })?;
    if acc.is_float() != out.is_float() || (acc.is_complex() && !out.is_complex()) {
        return Err(Error::UnsupportedOutputType { a, b, out });
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_pair_has_scheme_and_accumulator() {
        for device in [Device::Aie, Device::AieMl] {
            for (a, b) in supported_pairs(device) {
                let scheme = TilingScheme::select(device, a, b);
                assert!(scheme.is_supported(), "{:?} {} x {}", device, a, b);
                assert_eq!(scheme, TilingScheme::select(device, a, b));
                assert!(
                    AccKind::for_pair(device, a, b).is_some(),
                    "{:?} {} x {}",
                    device,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_unlisted_pairs_get_the_sentinel() {
        for device in [Device::Aie, Device::AieMl] {
            for a in DataType::ALL {
                for b in DataType::ALL {
                    if !supported_pairs(device).any(|p| p == (a, b)) {
                        assert_eq!(
                            TilingScheme::select(device, a, b),
                            TilingScheme::UNSUPPORTED
                        );
                    }
                }
            }
        }
        let cfloat = TilingScheme::select(Device::AieMl, Cfloat, Cfloat);
        assert!(!cfloat.is_supported());
    }

    #[test]
    fn test_tile_lengths() {
        let s = TilingScheme::select(Device::Aie, Cint32, Int16);
        assert_eq!(s, TilingScheme::new(2, 4, 2));
        assert_eq!((s.tile_a_len(), s.tile_b_len(), s.tile_c_len()), (8, 8, 4));
    }

    #[test]
    fn test_default_output_type() {
        assert_eq!(default_output_type(Int16, Int16), Some(Int16));
        assert_eq!(default_output_type(Int16, Int32), Some(Int32));
        assert_eq!(default_output_type(Int32, Cint16), Some(Cint16));
        assert_eq!(default_output_type(Cint16, Cint16), Some(Cint16));
        assert_eq!(default_output_type(Float, Cfloat), Some(Cfloat));
        assert_eq!(default_output_type(Int16, Float), None);
    }

    #[test]
    fn test_check_output_type() {
        assert_eq!(
            check_output_type(Device::Aie, Int16, Int16, Int32),
            Ok(Acc48)
        );
        assert_eq!(
            check_output_type(Device::Aie, Cint16, Int16, Int16),
            Err(Error::UnsupportedOutputType {
                a: Cint16,
                b: Int16,
                out: Int16
            })
        );
        assert!(check_output_type(Device::Aie, Float, Float, Int32).is_err());
        assert_eq!(
            check_output_type(Device::AieMl, Cfloat, Float, Cfloat),
            Err(Error::UnsupportedTypeCombination {
                a: Cfloat,
                b: Float,
                device: Device::AieMl
            })
        );
    }
}
