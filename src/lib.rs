//! `hll-estimator` is a Rust crate designed to estimate the number of distinct elements in a stream or dataset with bounded memory.
//!
//! This library uses HyperLogLog with HyperLogLog++ empirical bias correction and linear counting for small cardinalities.
//! Estimators of equal precision can be merged, which allows to count distinct elements across shards or workers.
//!
//! ```
//! use hll_estimator::HyperLogLog;
//!
//! let mut lhs: HyperLogLog = HyperLogLog::new(12)?;
//! let mut rhs: HyperLogLog = HyperLogLog::new(12)?;
//! for i in 0..10_000 {
//!     lhs.insert(&i);
//!     rhs.insert(&(i + 5_000));
//! }
//! lhs.union(&rhs)?;
//!
//! let estimate = lhs.estimate_count() as f64;
//! assert!((estimate - 15_000.0).abs() / 15_000.0 < 0.05);
//! # Ok::<(), hll_estimator::HyperLogLogError>(())
//! ```
mod bias;
pub mod constants;
mod error;
pub mod estimator;
mod precision;
mod registers;
#[cfg(feature = "with_serde")]
mod serde;

pub use error::HyperLogLogError;
pub use estimator::HyperLogLog;
pub use precision::{Precision, DEFAULT_PRECISION, MAX_PRECISION, MIN_PRECISION};
