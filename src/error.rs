use thiserror::Error;

/// Error returned by `HyperLogLog` operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HyperLogLogError {
    /// Precision or error rate outside of supported range
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// Estimators with different number of registers can not be merged
    #[error("incompatible precision: expected {expected} registers, got {actual}")]
    IncompatiblePrecision { expected: usize, actual: usize },
    /// Register array can not belong to an estimator of given precision
    #[error("invalid registers: {0}")]
    InvalidRegisters(String),
}
