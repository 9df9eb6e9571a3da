#![no_main]

use hll_estimator::HyperLogLog;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut estimator) = serde_json::from_slice::<HyperLogLog>(data) {
        estimator.insert(&1);
        let _ = estimator.estimate_count();

        let serialized = serde_json::to_vec(&estimator).unwrap();
        let restored: HyperLogLog = serde_json::from_slice(&serialized).unwrap();
        assert_eq!(restored, estimator);
    }
});
