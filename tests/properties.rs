use hll_estimator::HyperLogLog;
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_hashes() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(any::<u64>(), 0..2_000)
}

fn arb_precision() -> impl Strategy<Value = u8> {
    4u8..=12
}

fn estimator_from(p: u8, hashes: &[u64]) -> HyperLogLog {
    let mut hll = HyperLogLog::new(p).unwrap();
    for &h in hashes {
        hll.add(h);
    }
    hll
}

fn union_of(lhs: &HyperLogLog, rhs: &HyperLogLog) -> HyperLogLog {
    let mut out = lhs.clone();
    out.union(rhs).unwrap();
    out
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn registers_never_decrease(p in arb_precision(), hashes in arb_hashes()) {
        let mut hll: HyperLogLog = HyperLogLog::new(p).unwrap();
        let mut previous = hll.registers().to_vec();
        for h in hashes {
            hll.add(h);
            let current = hll.registers();
            prop_assert!(previous.iter().zip(current).all(|(a, b)| a <= b));
            previous.copy_from_slice(current);
        }
    }

    #[test]
    fn registers_stay_within_max_rank(p in arb_precision(), hashes in arb_hashes()) {
        let hll = estimator_from(p, &hashes);
        let max_rank = hll.precision().max_rank();
        prop_assert!(hll.registers().iter().all(|&r| r <= max_rank));
    }

    #[test]
    fn union_is_idempotent(p in arb_precision(), hashes in arb_hashes()) {
        let a = estimator_from(p, &hashes);
        prop_assert_eq!(union_of(&a, &a), a);
    }

    #[test]
    fn union_is_commutative(p in arb_precision(), a in arb_hashes(), b in arb_hashes()) {
        let a = estimator_from(p, &a);
        let b = estimator_from(p, &b);
        prop_assert_eq!(union_of(&a, &b), union_of(&b, &a));
    }

    #[test]
    fn union_is_associative(
        p in arb_precision(),
        a in arb_hashes(),
        b in arb_hashes(),
        c in arb_hashes(),
    ) {
        let a = estimator_from(p, &a);
        let b = estimator_from(p, &b);
        let c = estimator_from(p, &c);
        let left = union_of(&union_of(&a, &b), &c);
        let right = union_of(&a, &union_of(&b, &c));
        prop_assert_eq!(left.registers(), right.registers());
        prop_assert_eq!(left.estimate_count(), right.estimate_count());
    }

    #[test]
    fn union_equals_adding_both_streams(p in arb_precision(), a in arb_hashes(), b in arb_hashes()) {
        let merged = union_of(&estimator_from(p, &a), &estimator_from(p, &b));
        let combined: Vec<u64> = a.iter().chain(b.iter()).copied().collect();
        prop_assert_eq!(merged, estimator_from(p, &combined));
    }

    #[test]
    fn union_rejects_other_precision(p in 4u8..=17, hashes in arb_hashes()) {
        let mut lhs = estimator_from(p, &hashes);
        let rhs = estimator_from(p + 1, &hashes);
        let before = lhs.clone();
        prop_assert!(lhs.union(&rhs).is_err());
        prop_assert_eq!(lhs, before);
    }

    #[test]
    fn add_order_does_not_matter(p in arb_precision(), mut hashes in arb_hashes()) {
        let forward = estimator_from(p, &hashes);
        hashes.reverse();
        prop_assert_eq!(forward, estimator_from(p, &hashes));
    }
}
