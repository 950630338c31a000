//! Accumulator arithmetic and the shift-round-saturate step.
//!
//! Rounding and saturation only happen when an accumulator is converted to
//! the output type; the accumulation itself runs at the accumulator width.

pub mod accumulator;

pub use accumulator::Accumulator;

use crate::dtype::Device;
use crate::error::{Error, Result};

/// Rounding applied to the bits shifted out of the accumulator
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum RoundMode {
    /// Truncate, round towards negative infinity
    #[default]
    Floor,
    /// Round towards positive infinity
    Ceil,
    /// Round towards zero (AIE-ML only)
    SymFloor,
    /// Round away from zero (AIE-ML only)
    SymCeil,
    /// Halfway rounds towards positive infinity
    PosInf,
    /// Halfway rounds towards negative infinity
    NegInf,
    /// Halfway rounds away from zero
    SymInf,
    /// Halfway rounds towards zero
    SymZero,
    /// Halfway rounds to the nearest even value
    ConvEven,
    /// Halfway rounds to the nearest odd value
    ConvOdd,
}

impl RoundMode {
    /// Decode the device's raw rounding code.
    ///
    /// The first generation numbers its eight modes 0..=7; AIE-ML adds the
    /// symmetric floor/ceil modes at 2 and 3 and moves the nearest modes to
    /// 8..=13.
    pub fn from_code(device: Device, code: u32) -> Result<RoundMode> {
        let mode = match (device, code) {
            (_, 0) => RoundMode::Floor,
            (_, 1) => RoundMode::Ceil,
            (Device::Aie, 2) => RoundMode::PosInf,
            (Device::Aie, 3) => RoundMode::NegInf,
            (Device::Aie, 4) => RoundMode::SymInf,
            (Device::Aie, 5) => RoundMode::SymZero,
            (Device::Aie, 6) => RoundMode::ConvEven,
            (Device::Aie, 7) => RoundMode::ConvOdd,
            (Device::AieMl, 2) => RoundMode::SymFloor,
            (Device::AieMl, 3) => RoundMode::SymCeil,
            (Device::AieMl, 8) => RoundMode::NegInf,
            (Device::AieMl, 9) => RoundMode::PosInf,
            (Device::AieMl, 10) => RoundMode::SymZero,
            (Device::AieMl, 11) => RoundMode::SymInf,
            (Device::AieMl, 12) => RoundMode::ConvEven,
            (Device::AieMl, 13) => RoundMode::ConvOdd,
            _ => return Err(Error::InvalidRoundCode { code, device }),
        };
        Ok(mode)
    }

    /// Raw code of this mode on `device`, if the device has it
    pub fn code(self, device: Device) -> Option<u32> {
        match (device, self) {
            (_, RoundMode::Floor) => Some(0),
            (_, RoundMode::Ceil) => Some(1),
            (Device::Aie, RoundMode::SymFloor | RoundMode::SymCeil) => None,
            (Device::Aie, RoundMode::PosInf) => Some(2),
            (Device::Aie, RoundMode::NegInf) => Some(3),
            (Device::Aie, RoundMode::SymInf) => Some(4),
            (Device::Aie, RoundMode::SymZero) => Some(5),
            (Device::Aie, RoundMode::ConvEven) => Some(6),
            (Device::Aie, RoundMode::ConvOdd) => Some(7),
            (Device::AieMl, RoundMode::SymFloor) => Some(2),
            (Device::AieMl, RoundMode::SymCeil) => Some(3),
            (Device::AieMl, RoundMode::NegInf) => Some(8),
            (Device::AieMl, RoundMode::PosInf) => Some(9),
            (Device::AieMl, RoundMode::SymZero) => Some(10),
            (Device::AieMl, RoundMode::SymInf) => Some(11),
            (Device::AieMl, RoundMode::ConvEven) => Some(12),
            (Device::AieMl, RoundMode::ConvOdd) => Some(13),
        }
    }

    pub fn is_supported_on(self, device: Device) -> bool {
        self.code(device).is_some()
    }
}

/// Behaviour when a shifted value doesn't fit the output type
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum SatMode {
    /// Keep the low bits (two's complement wrap)
    #[default]
    None,
    /// Clamp to `[-2^(n-1), 2^(n-1) - 1]`
    Saturate,
    /// Clamp to `[-(2^(n-1) - 1), 2^(n-1) - 1]`
    Symmetric,
}

impl SatMode {
    /// Decode the raw saturation code. Code 2 is reserved.
    pub fn from_code(code: u32) -> Result<SatMode> {
        match code {
            0 => Ok(SatMode::None),
            1 => Ok(SatMode::Saturate),
            3 => Ok(SatMode::Symmetric),
            _ => Err(Error::InvalidSaturationMode { code }),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            SatMode::None => 0,
            SatMode::Saturate => 1,
            SatMode::Symmetric => 3,
        }
    }
}

/// Sign-extend the low `bits` bits of `value`.
///
/// ```
/// use aie_gemm::numeric::wrap_to_bits;
///
/// assert_eq!(wrap_to_bits(40_000, 16), 40_000 - 65_536);
/// assert_eq!(wrap_to_bits(-5, 16), -5);
/// ```
pub fn wrap_to_bits(value: i128, bits: u32) -> i128 {
    if bits >= 128 {
        return value;
    }
    let unused = 128 - bits;
    (value << unused) >> unused
}

/// Add the rounding constant for `mode` and shift right by `shift`.
///
/// Mirrors how the hardware rounds on the way out of the accumulator: the
/// constant is chosen so the arithmetic shift lands on the right integer.
pub fn round_shift(value: i128, shift: u32, mode: RoundMode) -> i128 {
    if shift == 0 {
        return value;
    }
    let half = 1i128 << (shift - 1);
    let just_below_half = half - 1;
    let all_ones = (1i128 << shift) - 1;
    let negative = value < 0;
    let addend = match mode {
        RoundMode::Floor => 0,
        RoundMode::Ceil => all_ones,
        RoundMode::SymFloor => {
            if negative {
                all_ones
            } else {
                0
            }
        }
        RoundMode::SymCeil => {
            if negative {
                0
            } else {
                all_ones
            }
        }
        RoundMode::PosInf => half,
        RoundMode::NegInf => just_below_half,
        RoundMode::SymInf => {
            if negative {
                just_below_half
            } else {
                half
            }
        }
        RoundMode::SymZero => {
            if negative {
                half
            } else {
                just_below_half
            }
        }
        RoundMode::ConvEven => {
            if (value >> shift) & 1 == 0 {
                just_below_half
            } else {
                half
            }
        }
        RoundMode::ConvOdd => {
            if (value >> shift) & 1 == 1 {
                just_below_half
            } else {
                half
            }
        }
    };
    (value + addend) >> shift
}

/// Fit `value` into a signed `bits`-wide integer.
pub fn saturate(value: i128, bits: u32, mode: SatMode) -> i128 {
    let max = (1i128 << (bits - 1)) - 1;
    let min = -(1i128 << (bits - 1));
    match mode {
        SatMode::None => wrap_to_bits(value, bits),
        SatMode::Saturate => value.clamp(min, max),
        SatMode::Symmetric => value.clamp(min + 1, max),
    }
}

/// Shift, round and saturate one accumulator component to `bits` wide.
pub fn shift_round_saturate(
    value: i128,
    shift: u32,
    round: RoundMode,
    sat: SatMode,
    bits: u32,
) -> i128 {
    saturate(round_shift(value, shift, round), bits, sat)
}

/// Check a shift amount against the device and data family.
pub fn validate_shift(device: Device, shift: u32, is_float: bool) -> Result<()> {
    if is_float && shift != 0 {
        return Err(Error::NonzeroShiftOnFloat { shift });
    }
    if shift > device.max_shift() {
        return Err(Error::ShiftOutOfRange {
            shift,
            max: device.max_shift(),
        });
    }
    Ok(())
}
