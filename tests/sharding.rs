use std::thread;

use hll_estimator::{HyperLogLog, Precision};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const WORKERS: usize = 4;

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_estimator_is_send_and_sync() {
    assert_send_sync::<HyperLogLog>();
}

/// One estimator per worker, merged afterwards in different groupings.
#[test]
fn test_worker_estimators_merge_to_single_estimator() {
    let precision = Precision::new(14).unwrap();
    let n: usize = 1_000_000;
    let hashes: Vec<u64> = {
        let mut rng = StdRng::seed_from_u64(99);
        (0..n).map(|_| rng.gen()).collect()
    };

    let partials: Vec<HyperLogLog> = thread::scope(|s| {
        let handles: Vec<_> = hashes
            .chunks(hashes.len() / WORKERS)
            .map(|chunk| {
                s.spawn(move || {
                    let mut hll: HyperLogLog = HyperLogLog::with_precision(precision);
                    chunk.iter().for_each(|&h| hll.add(h));
                    hll
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut sequential: HyperLogLog = HyperLogLog::with_precision(precision);
    hashes.iter().for_each(|&h| sequential.add(h));

    let mut forward: HyperLogLog = HyperLogLog::with_precision(precision);
    for partial in &partials {
        forward.union(partial).unwrap();
    }

    let mut backward: HyperLogLog = HyperLogLog::with_precision(precision);
    for partial in partials.iter().rev() {
        backward.union(partial).unwrap();
    }

    let mut pairs = partials[0].clone();
    pairs.union(&partials[1]).unwrap();
    let mut rest = partials[2].clone();
    rest.union(&partials[3]).unwrap();
    pairs.union(&rest).unwrap();

    assert_eq!(forward, sequential);
    assert_eq!(backward, sequential);
    assert_eq!(pairs, sequential);

    let estimate = sequential.estimate_count() as f64;
    let relative_error = (estimate - n as f64).abs() / n as f64;
    assert!(relative_error < 0.03, "estimate = {estimate}");
}
