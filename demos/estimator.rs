use hll_estimator::{HyperLogLog, Precision};

fn main() -> Result<(), hll_estimator::HyperLogLogError> {
    let precision = Precision::from_error_rate(0.01)?;
    println!("precision = {}", precision);

    let mut estimator1: HyperLogLog = HyperLogLog::with_precision(precision);
    for i in 0..10 {
        estimator1.insert(&i);
    }
    println!("estimator1 estimate = {}", estimator1.estimate_count());

    let mut estimator2: HyperLogLog = HyperLogLog::with_precision(precision);
    for i in 10..15 {
        estimator2.insert(&i);
    }
    println!("estimator2 estimate = {}", estimator2.estimate_count());

    estimator1.union(&estimator2)?;
    println!("merged estimate = {}", estimator1.estimate_count());

    Ok(())
}
