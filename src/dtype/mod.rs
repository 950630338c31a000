//! Element types and the per-device lookup tables.
//!
//! The kernels are generic over [`Element`], which is implemented for the six
//! sample types the hardware multiplies natively. Everything that depends on
//! the *pair* of operand types (tile shape, accumulator width, default output
//! type) lives in [`tables`] as plain data so it can be checked directly.

pub mod tables;

pub use tables::{AccKind, TilingScheme, check_output_type, default_output_type, supported_pairs};

use num_complex::Complex;
use std::fmt;

/// Complex 16-bit integer sample
pub type Cint16 = Complex<i16>;
/// Complex 32-bit integer sample
pub type Cint32 = Complex<i32>;
/// Complex single-precision sample
pub type Cfloat = Complex<f32>;

/// Runtime tag for the supported sample types
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    Int16,
    Cint16,
    Int32,
    Cint32,
    Float,
    Cfloat,
}

impl DataType {
    /// Every supported type, in table order
    pub const ALL: [DataType; 6] = [
        DataType::Int16,
        DataType::Cint16,
        DataType::Int32,
        DataType::Cint32,
        DataType::Float,
        DataType::Cfloat,
    ];

    /// Size of one sample in bytes
    pub const fn size_bytes(self) -> usize {
        match self {
            DataType::Int16 => 2,
            DataType::Cint16 | DataType::Int32 | DataType::Float => 4,
            DataType::Cint32 | DataType::Cfloat => 8,
        }
    }

    pub const fn is_complex(self) -> bool {
        matches!(self, DataType::Cint16 | DataType::Cint32 | DataType::Cfloat)
    }

    pub const fn is_float(self) -> bool {
        matches!(self, DataType::Float | DataType::Cfloat)
    }

    /// Width of one real component in bits
    pub const fn component_bits(self) -> u32 {
        match self {
            DataType::Int16 | DataType::Cint16 => 16,
            _ => 32,
        }
    }

    /// Samples per 128-bit load, the smallest contiguous access worth issuing
    pub const fn load_granularity(self) -> usize {
        16 / self.size_bytes()
    }

    /// Samples per 512-bit vector register
    pub const fn vector_lanes(self) -> usize {
        64 / self.size_bytes()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Int16 => "int16",
            DataType::Cint16 => "cint16",
            DataType::Int32 => "int32",
            DataType::Cint32 => "cint32",
            DataType::Float => "float",
            DataType::Cfloat => "cfloat",
        };
        f.write_str(name)
    }
}

/// Hardware generation the tables are taken from
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Device {
    /// First-generation AI Engine
    #[default]
    Aie,
    /// AIE-ML, with 64-bit accumulators and 64 KiB data memory
    AieMl,
}

impl Device {
    /// Largest legal output shift
    pub const fn max_shift(self) -> u32 {
        match self {
            Device::Aie => 61,
            Device::AieMl => 59,
        }
    }

    /// Bytes available to one kernel buffer
    pub const fn memory_bank_bytes(self) -> usize {
        match self {
            Device::Aie => 32 * 1024,
            Device::AieMl => 64 * 1024,
        }
    }
}

/// A sample type the kernels can load, multiply and store.
///
/// Integer accumulation happens on `Complex<i128>` (real types keep `im == 0`)
/// and float accumulation on `Complex<f32>`. The tables never pair an integer
/// type with a float one, so `to_fixed` on a float or `to_float` on an
/// integer is only used by reference code.
pub trait Element: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    const DTYPE: DataType;

    fn to_fixed(self) -> Complex<i128>;

    fn to_float(self) -> Complex<f32>;

    /// Narrow a value that is already in range for this type.
    fn from_fixed(value: Complex<i128>) -> Self;

    fn from_float(value: Complex<f32>) -> Self;
}

macro_rules! impl_real_int {
    ($t:ty, $tag:expr) => {
        impl Element for $t {
            const DTYPE: DataType = $tag;

            fn to_fixed(self) -> Complex<i128> {
                Complex::new(self as i128, 0)
            }

            fn to_float(self) -> Complex<f32> {
                Complex::new(self as f32, 0.0)
            }

            fn from_fixed(value: Complex<i128>) -> Self {
                value.re as $t
            }

            fn from_float(value: Complex<f32>) -> Self {
                value.re as $t
            }
        }
    };
}

macro_rules! impl_complex_int {
    ($t:ty, $tag:expr) => {
        impl Element for Complex<$t> {
            const DTYPE: DataType = $tag;

            fn to_fixed(self) -> Complex<i128> {
                Complex::new(self.re as i128, self.im as i128)
            }

            fn to_float(self) -> Complex<f32> {
                Complex::new(self.re as f32, self.im as f32)
            }

            fn from_fixed(value: Complex<i128>) -> Self {
                Complex::new(value.re as $t, value.im as $t)
            }

            fn from_float(value: Complex<f32>) -> Self {
                Complex::new(value.re as $t, value.im as $t)
            }
        }
    };
}

impl_real_int!(i16, DataType::Int16);
impl_real_int!(i32, DataType::Int32);
impl_complex_int!(i16, DataType::Cint16);
impl_complex_int!(i32, DataType::Cint32);

impl Element for f32 {
    const DTYPE: DataType = DataType::Float;

    fn to_fixed(self) -> Complex<i128> {
        Complex::new(self as i128, 0)
    }

    fn to_float(self) -> Complex<f32> {
        Complex::new(self, 0.0)
    }

    fn from_fixed(value: Complex<i128>) -> Self {
        value.re as f32
    }

    fn from_float(value: Complex<f32>) -> Self {
        value.re
    }
}

impl Element for Cfloat {
    const DTYPE: DataType = DataType::Cfloat;

    fn to_fixed(self) -> Complex<i128> {
        Complex::new(self.re as i128, self.im as i128)
    }

    fn to_float(self) -> Complex<f32> {
        self
    }

    fn from_fixed(value: Complex<i128>) -> Self {
        Complex::new(value.re as f32, value.im as f32)
    }

    fn from_float(value: Complex<f32>) -> Self {
        value
    }
}
