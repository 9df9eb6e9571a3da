#![no_main]

use hll_estimator::HyperLogLog;
use libfuzzer_sys::fuzz_target;
use wyhash::wyhash;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // first byte picks precision, the rest is split into two streams
    let p = 4 + data[0] % 15;
    let data = &data[1..];
    let split_index = if data.is_empty() {
        0
    } else {
        wyhash(data, 0) as usize % data.len()
    };
    let (first_half, second_half) = data.split_at(split_index);

    let mut estimator1: HyperLogLog = HyperLogLog::new(p).unwrap();
    for chunk in first_half.chunks(8) {
        estimator1.add(wyhash(chunk, 1));
        assert!(estimator1.estimate_count() > 0);
    }

    let mut estimator2: HyperLogLog = HyperLogLog::new(p).unwrap();
    for chunk in second_half.chunks(8) {
        estimator2.add(wyhash(chunk, 1));
        assert!(estimator2.estimate_count() > 0);
    }

    let mut lhs = estimator1.clone();
    lhs.union(&estimator2).unwrap();
    let mut rhs = estimator2.clone();
    rhs.union(&estimator1).unwrap();
    assert_eq!(lhs, rhs);

    let before = lhs.clone();
    lhs.union(&before).unwrap();
    assert_eq!(lhs, before);

    let max_rank = lhs.precision().max_rank();
    assert!(lhs.registers().iter().all(|&r| r <= max_rank));
});
