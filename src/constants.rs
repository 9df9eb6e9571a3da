//! Per-precision calibration constants.
//!
//! Every estimator of precision `p` reads the same static table: normalization constant
//! `alpha * M^2`, linear counting threshold and bias interpolation samples.

use crate::bias;
use crate::precision::{Precision, MIN_PRECISION};

/// Cardinalities up to which linear counting is preferred, for precision in [4..18] range.
const THRESHOLDS: [u64; 15] = [
    10, 20, 40, 80, 220, 400, 900, 1800, 3100, 6500, 11500, 20000, 50000, 120000, 350000,
];

/// Calibration constants of a single precision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantTable {
    /// Normalization constant `alpha * M^2`
    pub alpha_m2: f64,
    /// Largest linear counting estimate still trusted over bias corrected raw estimate
    pub threshold: u64,
    /// Raw estimate samples
    pub raw_estimates: &'static [f64],
    /// Bias at each of `raw_estimates`
    pub biases: &'static [f64],
}

impl ConstantTable {
    /// Look up constants of given precision
    #[inline]
    pub fn for_precision(precision: Precision) -> Self {
        let m = precision.registers();
        Self {
            alpha_m2: alpha(m) * (m as f64) * (m as f64),
            threshold: THRESHOLDS[usize::from(precision.get() - MIN_PRECISION)],
            raw_estimates: bias::raw_estimates(precision),
            biases: bias::biases(precision),
        }
    }

    /// Estimate bias of raw estimate `e`
    #[inline]
    pub fn estimate_bias(&self, e: f64) -> f64 {
        bias::estimate_bias(self.raw_estimates, self.biases, e)
    }
}

/// Parameter for bias correction
#[inline]
fn alpha(m: usize) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / (m as f64)),
    }
}
