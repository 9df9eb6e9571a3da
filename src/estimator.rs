//! HyperLogLog estimator allows to estimate number of distinct elements
//! in the stream or dataset and is defined by precision `p` in [4..18] range,
//! which defines number of hash bits used for register indices.
//!
//! # Data-structure design rationale
//!
//! ## Low latency
//! - `add` touches exactly one register and never allocates.
//! - Registers are allocated once as a fixed boxed slice when estimator is created.
//! - Calibration constants are static and shared by all estimators of the same precision.
//!
//! ## High accuracy
//! - For small cardinality range (up to the per-precision threshold, e.g. 3100 for p = 12)
//!   linear counting over the number of empty registers is used.
//! - For larger cardinality range HyperLogLog raw estimate is used, corrected with
//!   empirical HyperLogLog++ bias below `5 * M`.
//!   - Expected error:
//!     p = 10: 1.04 / sqrt(2^10) = 3.25%
//!     p = 12: 1.04 / sqrt(2^12) = 1.62%
//!     p = 14: 1.04 / sqrt(2^14) = 0.81%
//!     p = 18: 1.04 / sqrt(2^18) = 0.20%
//!
//! ## Mergeable
//! Registers store running maximum ranks, so union of two estimators is their register-wise
//! maximum. Union is commutative, associative and idempotent: estimators can be built
//! independently per shard or worker and combined in any order.
//!
//! # Hash layout
//! - bits 63..(64 - p)   - register index
//! - bits (63 - p)..0    - remainder, rank is `1 + leading zeros` of remainder capped at `64 - p`
//!
//! Hash quality is the caller's obligation: estimates are only as good as the uniformity of
//! the hashes passed to `add`.

use std::fmt::{Debug, Formatter};
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};
use std::mem::size_of;

use wyhash::WyHash;

use crate::constants::ConstantTable;
use crate::error::HyperLogLogError;
use crate::precision::Precision;
use crate::registers::Registers;

/// Raw estimates above `BIAS_CORRECTION_LIMIT * M` are used without bias correction
const BIAS_CORRECTION_LIMIT: usize = 5;

/// HyperLogLog cardinality estimator
pub struct HyperLogLog<H: Hasher + Default = WyHash> {
    /// Number of hash bits used as register index
    precision: Precision,
    /// Static calibration constants of `precision`
    constants: ConstantTable,
    /// `2^precision` registers
    registers: Registers,
    /// Zero-sized build hasher used by `insert`
    build_hasher: BuildHasherDefault<H>,
}

impl<H: Hasher + Default> HyperLogLog<H> {
    /// Creates new instance of `HyperLogLog` with given precision.
    ///
    /// ```
    /// use hll_estimator::HyperLogLog;
    ///
    /// assert!(HyperLogLog::<wyhash::WyHash>::new(14).is_ok());
    /// assert!(HyperLogLog::<wyhash::WyHash>::new(19).is_err());
    /// ```
    pub fn new(p: u8) -> Result<Self, HyperLogLogError> {
        Precision::new(p).map(Self::with_precision)
    }

    /// Creates new instance of `HyperLogLog` with validated precision
    pub fn with_precision(precision: Precision) -> Self {
        Self {
            precision,
            constants: ConstantTable::for_precision(precision),
            registers: Registers::new(precision.registers()),
            build_hasher: BuildHasherDefault::default(),
        }
    }

    /// Rebuilds `HyperLogLog` from precision and register values captured with `registers`
    pub fn from_registers(p: u8, registers: Vec<u8>) -> Result<Self, HyperLogLogError> {
        let precision = Precision::new(p)?;
        if registers.len() != precision.registers() {
            tracing::debug!(
                precision = p,
                len = registers.len(),
                "rejected register array of wrong length"
            );
            return Err(HyperLogLogError::InvalidRegisters(format!(
                "expected {} registers for precision {}, got {}",
                precision.registers(),
                precision,
                registers.len()
            )));
        }
        let max_rank = precision.max_rank();
        if let Some(idx) = registers.iter().position(|&rank| rank > max_rank) {
            tracing::debug!(precision = p, idx, "rejected register above max rank");
            return Err(HyperLogLogError::InvalidRegisters(format!(
                "register {} holds rank {} above max rank {}",
                idx, registers[idx], max_rank
            )));
        }

        Ok(Self {
            precision,
            constants: ConstantTable::for_precision(precision),
            registers: Registers::from_vec(registers),
            build_hasher: BuildHasherDefault::default(),
        })
    }

    /// Insert a hashable item into `HyperLogLog`
    #[inline]
    pub fn insert<T: Hash + ?Sized>(&mut self, item: &T) {
        let mut hasher = self.build_hasher.build_hasher();
        item.hash(&mut hasher);
        let hash = hasher.finish();
        self.add(hash);
    }

    /// Add 64-bit hash into `HyperLogLog`
    #[inline]
    pub fn add(&mut self, hash: u64) {
        let (idx, rank) = self.index_and_rank(hash);
        self.registers.update(idx, rank);
    }

    /// Split hash into register index (top `p` bits) and rank of remaining `64 - p` bits
    #[inline]
    fn index_and_rank(&self, hash: u64) -> (usize, u8) {
        let p = u32::from(self.precision.get());
        let idx = (hash >> (64 - p)) as usize;
        // remainder bits moved to the top, zeros shifted in from below are never counted
        let zeros = (hash << p).leading_zeros().min(64 - p);
        (idx, (zeros + 1) as u8)
    }

    /// Return cardinality estimate
    pub fn estimate_count(&self) -> u64 {
        let m = self.registers.len();
        let (zeros, sum) = self.registers.zeros_and_sum();

        let mut estimate = self.constants.alpha_m2 / sum;
        if estimate <= (BIAS_CORRECTION_LIMIT * m) as f64 {
            estimate -= self.constants.estimate_bias(estimate);
        }
        let estimate = estimate.max(0.0).round() as u64;

        if zeros == 0 {
            tracing::trace!(precision = %self.precision, estimate, "raw estimate");
            return estimate;
        }

        let linear_count = linear_counting(m, zeros);
        if linear_count <= self.constants.threshold {
            tracing::trace!(precision = %self.precision, zeros, linear_count, "linear counting");
            linear_count
        } else {
            tracing::trace!(precision = %self.precision, zeros, estimate, "raw estimate");
            estimate
        }
    }

    /// Merge `rhs` into `self`, leaving `self` untouched when precisions differ
    pub fn union(&mut self, rhs: &Self) -> Result<(), HyperLogLogError> {
        if self.registers.len() != rhs.registers.len() {
            tracing::debug!(
                lhs = %self.precision,
                rhs = %rhs.precision,
                "rejected union of estimators with different precision"
            );
            return Err(HyperLogLogError::IncompatiblePrecision {
                expected: self.registers.len(),
                actual: rhs.registers.len(),
            });
        }
        self.registers.merge(&rhs.registers);
        Ok(())
    }

    /// Return precision of `HyperLogLog`
    #[inline]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Return register values
    #[inline]
    pub fn registers(&self) -> &[u8] {
        self.registers.as_slice()
    }

    /// Return expected relative standard error of estimates
    #[inline]
    pub fn standard_error(&self) -> f64 {
        self.precision.standard_error()
    }

    /// Return memory size of `HyperLogLog`
    pub fn size_of(&self) -> usize {
        size_of::<Self>() - size_of::<Registers>() + self.registers.size_of()
    }
}

/// Linear counting estimate for `m` registers with `zeros` empty registers
#[inline]
fn linear_counting(m: usize, zeros: usize) -> u64 {
    let m = m as f64;
    (m * (m / zeros as f64).ln()).round() as u64
}

impl<H: Hasher + Default> Default for HyperLogLog<H> {
    fn default() -> Self {
        Self::with_precision(Precision::default())
    }
}

impl<H: Hasher + Default> Clone for HyperLogLog<H> {
    /// Clone `HyperLogLog`
    fn clone(&self) -> Self {
        Self {
            precision: self.precision,
            constants: self.constants,
            registers: self.registers.clone(),
            build_hasher: BuildHasherDefault::default(),
        }
    }
}

impl<H: Hasher + Default> PartialEq for HyperLogLog<H> {
    /// Compare estimators register-wise
    fn eq(&self, rhs: &Self) -> bool {
        self.precision == rhs.precision && self.registers == rhs.registers
    }
}

impl<H: Hasher + Default> Eq for HyperLogLog<H> {}

impl<H: Hasher + Default> Debug for HyperLogLog<H> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ precision: {}, estimate: {}, size: {} }}",
            self.precision,
            self.estimate_count(),
            self.size_of()
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use test_case::test_case;

    fn estimator(p: u8) -> HyperLogLog {
        HyperLogLog::new(p).unwrap()
    }

    #[test_case(3 => false)]
    #[test_case(4 => true)]
    #[test_case(18 => true)]
    #[test_case(19 => false)]
    fn test_construction_bounds(p: u8) -> bool {
        HyperLogLog::<WyHash>::new(p).is_ok()
    }

    #[test]
    fn test_invalid_precision_error_kind() {
        assert!(matches!(
            HyperLogLog::<WyHash>::new(3),
            Err(HyperLogLogError::InvalidConfiguration(_))
        ));
    }

    #[test_case(4)]
    #[test_case(10)]
    #[test_case(18)]
    fn test_new_registers_are_zero(p: u8) {
        let hll = estimator(p);
        assert_eq!(hll.registers().len(), 1 << p);
        assert!(hll.registers().iter().all(|&r| r == 0));
        assert_eq!(hll.precision().get(), p);
    }

    #[test_case(4)]
    #[test_case(12)]
    #[test_case(18)]
    fn test_empty_estimate(p: u8) {
        assert_eq!(estimator(p).estimate_count(), 0);
    }

    #[test_case(0x0000_0000_0000_0000, 4 => (0, 61); "zero hash saturates rank")]
    #[test_case(0xffff_ffff_ffff_ffff, 4 => (15, 1); "all ones")]
    #[test_case(0xf800_0000_0000_0000, 4 => (15, 1); "first remainder bit set")]
    #[test_case(0x1400_0000_0000_0000, 4 => (1, 2); "second remainder bit set")]
    #[test_case(0x0000_0000_0000_0001, 4 => (0, 60); "last bit set")]
    #[test_case(0x0000_0000_0000_0001, 18 => (0, 46); "last bit set p18")]
    #[test_case(0xffff_c000_0000_0000, 18 => (262143, 64 - 18 + 1); "top bits set p18")]
    #[test_case(0x0000_2000_0000_0000, 18 => (0, 1); "first remainder bit set p18")]
    #[test_case(0x8000_0000_0000_0000, 12 => (2048, 53); "index only")]
    fn test_index_and_rank(hash: u64, p: u8) -> (usize, u8) {
        estimator(p).index_and_rank(hash)
    }

    #[test]
    fn test_add_updates_single_register() {
        let mut hll = estimator(10);
        // index 1, remainder with 3 leading zeros
        let hash = (1u64 << 54) | (1u64 << 50);
        hll.add(hash);
        let registers = hll.registers();
        assert_eq!(registers[1], 4);
        assert_eq!(registers.iter().filter(|&&r| r != 0).count(), 1);

        // lower rank for the same index is ignored
        hll.add((1u64 << 54) | (1u64 << 53));
        assert_eq!(hll.registers()[1], 4);
    }

    #[test]
    fn test_registers_are_monotonic() {
        let mut hll = estimator(8);
        let mut rng = StdRng::seed_from_u64(42);
        let mut previous = hll.registers().to_vec();
        for _ in 0..10_000 {
            hll.add(rng.gen());
            let current = hll.registers();
            assert!(previous.iter().zip(current).all(|(a, b)| a <= b));
            previous.copy_from_slice(current);
        }
    }

    #[test]
    fn test_insert() {
        let mut e = estimator(12);

        assert_eq!(e.estimate_count(), 0);

        e.insert("test item 1");
        assert_eq!(e.estimate_count(), 1);

        // Re-insert the same item, estimate should remain the same.
        e.insert("test item 1");
        assert_eq!(e.estimate_count(), 1);

        e.insert("test item 2");
        assert_eq!(e.estimate_count(), 2);
    }

    #[test_case(10, 50, 4)]
    #[test_case(12, 100, 4)]
    #[test_case(14, 1000, 20)]
    fn test_small_range(p: u8, n: usize, tolerance: u64) {
        let mut hll = estimator(p);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..n {
            hll.add(rng.gen());
        }
        let estimate = hll.estimate_count();
        assert!(
            estimate.abs_diff(n as u64) <= tolerance,
            "estimate = {estimate}, n = {n}"
        );
    }

    #[test_case(10, 10_000, 0.15)]
    #[test_case(12, 20_000, 0.08)]
    #[test_case(14, 1_000_000, 0.03)]
    #[test_case(16, 500_000, 0.02)]
    fn test_large_range(p: u8, n: usize, max_err: f64) {
        let mut hll = estimator(p);
        let mut rng = StdRng::seed_from_u64(12345);
        for _ in 0..n {
            hll.add(rng.gen());
        }
        let estimate = hll.estimate_count() as f64;
        let relative_error = (estimate - n as f64).abs() / n as f64;
        assert!(
            relative_error < max_err,
            "estimate = {estimate}, n = {n}, err = {relative_error:.4}"
        );
    }

    #[test_case(8)]
    #[test_case(12)]
    fn test_average_error_over_trials(p: u8) {
        // bias corrected range between linear counting threshold and 5 * M
        let n: usize = 4 << p;
        let trials = 20;
        let mut rng = StdRng::seed_from_u64(2024);
        let mut total_relative_error = 0.0;
        for _ in 0..trials {
            let mut hll = estimator(p);
            for _ in 0..n {
                hll.add(rng.gen());
            }
            total_relative_error +=
                (hll.estimate_count() as f64 - n as f64).abs() / n as f64;
        }
        let avg = total_relative_error / f64::from(trials);
        assert!(avg < 2.0 * Precision::new(p).unwrap().standard_error(), "avg_err = {avg:.4}");
    }

    #[test]
    fn test_duplicates_do_not_change_estimate() {
        let mut hll = estimator(12);
        for i in 0..5_000usize {
            hll.insert(&i);
        }
        let registers = hll.registers().to_vec();
        let estimate = hll.estimate_count();
        for i in 0..5_000usize {
            hll.insert(&i);
        }
        assert_eq!(hll.registers(), registers.as_slice());
        assert_eq!(hll.estimate_count(), estimate);
    }

    #[test]
    fn test_union_of_disjoint_halves_matches_single_estimator() {
        let mut all = estimator(12);
        let mut lhs = estimator(12);
        let mut rhs = estimator(12);
        for i in 0..20_000usize {
            all.insert(&i);
            if i % 2 == 0 {
                lhs.insert(&i);
            } else {
                rhs.insert(&i);
            }
        }
        lhs.union(&rhs).unwrap();
        assert_eq!(lhs, all);
        assert_eq!(lhs.estimate_count(), all.estimate_count());
    }

    #[test]
    fn test_union_idempotent() {
        let mut hll = estimator(10);
        for i in 0..3_000usize {
            hll.insert(&i);
        }
        let before = hll.clone();
        hll.union(&before).unwrap();
        assert_eq!(hll, before);
    }

    #[test]
    fn test_union_precision_mismatch() {
        let mut lhs = estimator(10);
        let mut rhs = estimator(12);
        for i in 0..100usize {
            lhs.insert(&i);
            rhs.insert(&(i + 1000));
        }
        let lhs_before = lhs.clone();
        let rhs_before = rhs.clone();

        assert_eq!(
            lhs.union(&rhs),
            Err(HyperLogLogError::IncompatiblePrecision {
                expected: 1024,
                actual: 4096
            })
        );
        assert_eq!(lhs, lhs_before);
        assert_eq!(rhs, rhs_before);
    }

    #[test_case(0, 0)]
    #[test_case(0, 100)]
    #[test_case(100, 0)]
    #[test_case(500, 500)]
    #[test_case(10_000, 4)]
    #[test_case(10_000, 10_000)]
    fn test_union_estimate(lhs_n: usize, rhs_n: usize) {
        let mut lhs = estimator(12);
        let mut buf = [0, 0, 0, 0, 0, 0, 0, 0, 1];
        for i in 0..lhs_n {
            buf[..8].copy_from_slice(&i.to_le_bytes());
            lhs.insert(&buf);
        }

        let mut rhs = estimator(12);
        let mut buf = [0, 0, 0, 0, 0, 0, 0, 0, 2];
        for i in 0..rhs_n {
            buf[..8].copy_from_slice(&i.to_le_bytes());
            rhs.insert(&buf);
        }

        lhs.union(&rhs).unwrap();
        let n = (lhs_n + rhs_n) as f64;
        let estimate = lhs.estimate_count() as f64;
        assert!((estimate - n).abs() <= (n * 0.05).max(2.0), "{lhs:?} expected {n}");
    }

    #[test]
    fn test_from_registers() {
        let mut hll = estimator(6);
        for i in 0..200usize {
            hll.insert(&i);
        }
        let restored = HyperLogLog::<WyHash>::from_registers(6, hll.registers().to_vec()).unwrap();
        assert_eq!(restored, hll);
        assert_eq!(restored.estimate_count(), hll.estimate_count());
    }

    #[test_case(3, vec![0; 8]; "invalid precision")]
    #[test_case(4, vec![0; 15]; "too few registers")]
    #[test_case(4, vec![0; 17]; "too many registers")]
    #[test_case(4, vec![62; 16]; "rank above max")]
    fn test_from_registers_rejected(p: u8, registers: Vec<u8>) {
        assert!(HyperLogLog::<WyHash>::from_registers(p, registers).is_err());
    }

    #[test]
    fn test_from_registers_error_kinds() {
        assert!(matches!(
            HyperLogLog::<WyHash>::from_registers(19, vec![]),
            Err(HyperLogLogError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            HyperLogLog::<WyHash>::from_registers(4, vec![0; 4]),
            Err(HyperLogLogError::InvalidRegisters(_))
        ));
    }

    #[test]
    fn test_saturated_registers_estimate_is_finite() {
        let hll = HyperLogLog::<WyHash>::from_registers(4, vec![61; 16]).unwrap();
        assert!(hll.estimate_count() > 0);
    }

    #[test]
    fn test_debug_and_size() {
        let hll = estimator(12);
        assert_eq!(
            format!("{:?}", hll),
            format!("{{ precision: 12, estimate: 0, size: {} }}", hll.size_of())
        );
        assert!(hll.size_of() > 4096);
    }

    #[test]
    fn test_default_precision() {
        assert_eq!(HyperLogLog::<WyHash>::default().precision().get(), 12);
    }
}
