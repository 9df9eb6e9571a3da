//! Precision configuration of `HyperLogLog` estimator.
//!
//! Precision `p` defines number of hash bits used for register indices. Estimator with
//! precision `p` has `M = 2^p` registers and expected relative error of `1.04 / sqrt(M)`:
//! - p = 10: 3.25%, 1 KiB of registers
//! - p = 12: 1.62%, 4 KiB of registers
//! - p = 14: 0.81%, 16 KiB of registers
//! - p = 18: 0.20%, 256 KiB of registers

use std::fmt::{Display, Formatter};

use crate::error::HyperLogLogError;

/// Smallest supported precision
pub const MIN_PRECISION: u8 = 4;
/// Largest supported precision
pub const MAX_PRECISION: u8 = 18;
/// Precision used by default
pub const DEFAULT_PRECISION: u8 = 12;

/// Validated precision in `[MIN_PRECISION..=MAX_PRECISION]` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Precision(u8);

impl Precision {
    /// Create precision, failing when `p` is out of supported range
    pub fn new(p: u8) -> Result<Self, HyperLogLogError> {
        if !(MIN_PRECISION..=MAX_PRECISION).contains(&p) {
            tracing::debug!(precision = p, "rejected out of range precision");
            return Err(HyperLogLogError::InvalidConfiguration(format!(
                "precision must be in [{}..={}] range (was: {})",
                MIN_PRECISION, MAX_PRECISION, p
            )));
        }
        Ok(Self(p))
    }

    /// Smallest precision with standard error not exceeding `error_rate`.
    ///
    /// ```
    /// use hll_estimator::Precision;
    ///
    /// assert_eq!(Precision::from_error_rate(0.0163).unwrap().get(), 12);
    /// assert!(Precision::from_error_rate(0.0001).is_err());
    /// ```
    pub fn from_error_rate(error_rate: f64) -> Result<Self, HyperLogLogError> {
        if !(error_rate > 0.0 && error_rate < 1.0) {
            tracing::debug!(error_rate, "rejected error rate");
            return Err(HyperLogLogError::InvalidConfiguration(format!(
                "error rate must be in (0, 1) range (was: {})",
                error_rate
            )));
        }
        (MIN_PRECISION..=MAX_PRECISION)
            .map(Self)
            .find(|p| p.standard_error() <= error_rate)
            .ok_or_else(|| {
                tracing::debug!(error_rate, "error rate requires too many registers");
                HyperLogLogError::InvalidConfiguration(format!(
                    "error rate {} requires precision above {}",
                    error_rate, MAX_PRECISION
                ))
            })
    }

    /// Return precision value
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Number of registers
    #[inline]
    pub fn registers(self) -> usize {
        1 << self.0
    }

    /// Largest rank a register can hold
    #[inline]
    pub fn max_rank(self) -> u8 {
        64 - self.0 + 1
    }

    /// Expected relative standard error of estimates
    #[inline]
    pub fn standard_error(self) -> f64 {
        1.04 / (self.registers() as f64).sqrt()
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self(DEFAULT_PRECISION)
    }
}

impl TryFrom<u8> for Precision {
    type Error = HyperLogLogError;

    fn try_from(p: u8) -> Result<Self, Self::Error> {
        Self::new(p)
    }
}

impl From<Precision> for u8 {
    fn from(precision: Precision) -> Self {
        precision.0
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
