//! Graph configuration.
//!
//! [`MatMultConfig`] carries every construction-time parameter of a
//! [`MatMultGraph`](crate::threaded::MatMultGraph). Defaults: A row-major,
//! B column-major, output row-major, all tiling kernels requested, one
//! cascade stage, one SSR lane, shift 0, floor rounding, no saturation, first
//! generation device.

use crate::blocked::{BlockDims, OutputConversion};
use crate::dtype::Device;
use crate::error::{Error, Result};
use crate::matrix::LeadingDim;
use crate::numeric::{RoundMode, SatMode};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MatMultConfig {
    pub device: Device,
    /// Rows of A and of the output
    pub dim_a: usize,
    /// Columns of A, rows of B
    pub dim_ab: usize,
    /// Columns of B and of the output
    pub dim_b: usize,
    pub shift: u32,
    pub round: RoundMode,
    pub sat: SatMode,
    pub leading_a: LeadingDim,
    pub leading_b: LeadingDim,
    pub leading_out: LeadingDim,
    /// Stages splitting `dim_ab`
    pub cascade_len: usize,
    /// Parallel lanes splitting `dim_a`
    pub ssr: usize,
    pub add_tiling_a: bool,
    pub add_tiling_b: bool,
    pub add_detiling_out: bool,
    /// Accumulators a cascade link buffers before the producer blocks
    pub cascade_depth: usize,
}

impl MatMultConfig {
    /// Default configuration for an `dim_a x dim_ab` by `dim_ab x dim_b`
    /// multiply.
    ///
    /// # Example
    ///
    /// ```
    /// use aie_gemm::config::MatMultConfig;
    /// use aie_gemm::matrix::LeadingDim;
    ///
    /// let cfg = MatMultConfig::new(64, 64, 32)
    ///     .with_cascade_len(2)
    ///     .with_ssr(2)
    ///     .with_leading_b(LeadingDim::RowMajor);
    /// assert!(cfg.validate().is_ok());
    /// assert_eq!(cfg.kernel_dims().dim_a, 32);
    /// assert_eq!(cfg.kernel_dims().dim_ab, 32);
    /// ```
    pub fn new(dim_a: usize, dim_ab: usize, dim_b: usize) -> Self {
        Self {
            device: Device::Aie,
            dim_a,
            dim_ab,
            dim_b,
            shift: 0,
            round: RoundMode::Floor,
            sat: SatMode::None,
            leading_a: LeadingDim::RowMajor,
            leading_b: LeadingDim::ColMajor,
            leading_out: LeadingDim::RowMajor,
            cascade_len: 1,
            ssr: 1,
            add_tiling_a: true,
            add_tiling_b: true,
            add_detiling_out: true,
            cascade_depth: 1,
        }
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn with_shift(mut self, shift: u32) -> Self {
        self.shift = shift;
        self
    }

    pub fn with_round(mut self, round: RoundMode) -> Self {
        self.round = round;
        self
    }

    pub fn with_saturation(mut self, sat: SatMode) -> Self {
        self.sat = sat;
        self
    }

    /// Set rounding from the device's raw mode code.
    ///
    /// Set the device first: the code table depends on it.
    pub fn with_round_code(mut self, code: u32) -> Result<Self> {
        self.round = RoundMode::from_code(self.device, code)?;
        Ok(self)
    }

    /// Set saturation from its raw mode code.
    pub fn with_saturation_code(mut self, code: u32) -> Result<Self> {
        self.sat = SatMode::from_code(code)?;
        Ok(self)
    }

    pub fn with_leading_a(mut self, leading: LeadingDim) -> Self {
        self.leading_a = leading;
        self
    }

    pub fn with_leading_b(mut self, leading: LeadingDim) -> Self {
        self.leading_b = leading;
        self
    }

    pub fn with_leading_out(mut self, leading: LeadingDim) -> Self {
        self.leading_out = leading;
        self
    }

    pub fn with_cascade_len(mut self, cascade_len: usize) -> Self {
        self.cascade_len = cascade_len;
        self
    }

    pub fn with_ssr(mut self, ssr: usize) -> Self {
        self.ssr = ssr;
        self
    }

    pub fn with_tiling(mut self, a: bool, b: bool, out: bool) -> Self {
        self.add_tiling_a = a;
        self.add_tiling_b = b;
        self.add_detiling_out = out;
        self
    }

    pub fn with_cascade_depth(mut self, depth: usize) -> Self {
        self.cascade_depth = depth;
        self
    }

    /// Checks that don't depend on the element types.
    ///
    /// Type-dependent checks (tile multiples, shift range, memory banks)
    /// happen when the kernels are built.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("dim_a", self.dim_a),
            ("dim_ab", self.dim_ab),
            ("dim_b", self.dim_b),
            ("cascade_len", self.cascade_len),
            ("ssr", self.ssr),
            ("cascade_depth", self.cascade_depth),
        ] {
            if value == 0 {
                return Err(Error::ZeroDimension { name });
            }
        }
        if self.dim_ab % self.cascade_len != 0 {
            return Err(Error::DimensionNotMultipleOfTile {
                name: "dim_ab",
                value: self.dim_ab,
                multiple: self.cascade_len,
            });
        }
        if self.dim_a % self.ssr != 0 {
            return Err(Error::DimensionNotMultipleOfTile {
                name: "dim_a",
                value: self.dim_a,
                multiple: self.ssr,
            });
        }
        if !self.round.is_supported_on(self.device) {
            return Err(Error::InvalidRoundMode {
                mode: self.round,
                device: self.device,
            });
        }
        Ok(())
    }

    /// Block shape of every kernel in the graph
    pub fn kernel_dims(&self) -> BlockDims {
        BlockDims {
            dim_a: self.dim_a / self.ssr,
            dim_ab: self.dim_ab / self.cascade_len,
            dim_b: self.dim_b,
        }
    }

    pub fn conversion(&self) -> OutputConversion {
        OutputConversion {
            shift: self.shift,
            round: self.round,
            sat: self.sat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MatMultConfig::new(16, 16, 16);
        assert_eq!(cfg.leading_a, LeadingDim::RowMajor);
        assert_eq!(cfg.leading_b, LeadingDim::ColMajor);
        assert_eq!(cfg.leading_out, LeadingDim::RowMajor);
        assert!(cfg.add_tiling_a && cfg.add_tiling_b && cfg.add_detiling_out);
        assert_eq!((cfg.cascade_len, cfg.ssr, cfg.cascade_depth), (1, 1, 1));
        assert_eq!(cfg.conversion(), OutputConversion::default());
    }

    #[test]
    fn test_split_must_divide() {
        let config = MatMultConfig::new(16, 12, 16).with_cascade_len(5);
        assert_eq!(
            config.validate(),
            Err(Error::DimensionNotMultipleOfTile {
                name: "dim_ab",
                value: 12,
                multiple: 5
            })
        );
        assert_eq!(
            MatMultConfig::new(16, 16, 16).with_ssr(0).validate(),
            Err(Error::ZeroDimension { name: "ssr" })
        );
    }

    #[test]
    fn test_codes_follow_device() {
        let ml = MatMultConfig::new(8, 8, 8).with_device(Device::AieMl);
        assert_eq!(ml.with_round_code(2).unwrap().round, RoundMode::SymFloor);
        let aie = MatMultConfig::new(8, 8, 8);
        assert_eq!(aie.with_round_code(2).unwrap().round, RoundMode::PosInf);
        assert!(aie.with_saturation_code(2).is_err());
        assert_eq!(
            aie.with_round_code(9).unwrap_err(),
            Error::InvalidRoundCode {
                code: 9,
                device: Device::Aie
            }
        );
        assert_eq!(
            aie.with_round(RoundMode::SymCeil).validate().unwrap_err(),
            Error::InvalidRoundMode {
                mode: RoundMode::SymCeil,
                device: Device::Aie
            }
        );
    }
}
