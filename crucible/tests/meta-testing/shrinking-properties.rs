//! Shrinking correctness properties
//!
//! These properties ensure that shrinking converges to minimal
//! counterexamples, keeps the failure it started from, and is idempotent.

use crate::{arbitrary_seed, expect_failure, inner_config};
use crucible::*;

/// Property: `x < threshold` over integers always shrinks to `threshold`
pub fn test_integer_shrinks_to_threshold() {
    let prop = for_all_named(
        tuple_of(integers::<u32>(1, 5000), arbitrary_seed()),
        "(threshold, seed)",
        |&(threshold, seed)| {
            let inner = for_all(integers::<u32>(0, 10_000), move |&x| x < threshold);
            let report = expect_failure(inner.run(&inner_config(seed)));
            report.counterexample == threshold.to_string()
        },
    );

    match prop.run(&Config::default().with_tests(20).with_seed(10)) {
        Ok(_) => println!("✓ Integer threshold shrinking property passed"),
        Err(e) => panic!("Integer threshold shrinking property failed: {e}"),
    }
}

/// Property: feeding a minimal failure back into the shrinker changes nothing
pub fn test_shrinking_is_idempotent() {
    let prop = for_all_named(arbitrary_seed(), "seed", |&seed| {
        let config = inner_config(seed);
        let inner = for_all(vecs(integers::<u16>(0, 1000), 0, 20), |v| {
            v.iter().map(|&x| x as u32).sum::<u32>() < 500
        });
        let report = expect_failure(inner.run(&config));
        let (bytes, stats) = shrink(report.bytes.clone(), config.shrink_limit, |candidate| {
            let trial = inner.reproduce(candidate, &config);
            trial.status.is_interesting().then(|| trial.bytes().to_vec())
        });
        bytes == report.bytes && stats.improvements == 0
    });

    match prop.run(&Config::default().with_tests(20).with_seed(11)) {
        Ok(_) => println!("✓ Shrinking idempotence property passed"),
        Err(e) => panic!("Shrinking idempotence property failed: {e}"),
    }
}

/// Property: list-sum failures shrink to a sum exactly on the boundary
pub fn test_list_sum_shrinks_to_boundary() {
    let prop = for_all_named(arbitrary_seed(), "seed", |&seed| {
        let inner = for_all(vecs(integers::<u8>(0, 255), 0, 20), |v| {
            v.iter().map(|&x| x as u32).sum::<u32>() <= 100
        });
        let report = expect_failure(inner.run(&inner_config(seed)));
        match inner.decode(&report.bytes) {
            Ok(v) => v.iter().map(|&x| x as u32).sum::<u32>() == 101,
            Err(_) => false,
        }
    });

    match prop.run(&Config::default().with_tests(20).with_seed(12)) {
        Ok(_) => println!("✓ List sum shrinking property passed"),
        Err(e) => panic!("List sum shrinking property failed: {e}"),
    }
}

/// Property: a panicking property shrinks while keeping its panic site
pub fn test_panic_origin_is_preserved() {
    let inner = given(integers::<i32>(-1000, 1000), |_, x| {
        if x > 100 {
            panic!("too large: {x}");
        }
        if x < -100 {
            return Err(PropertyError::fail("too small"));
        }
        Ok(())
    });
    let report = expect_failure(inner.run(&inner_config(13)));
    match &report.origin {
        FailureOrigin::Panic { file, .. } => {
            assert!(file.ends_with("shrinking-properties.rs"), "{file}");
            assert_eq!(report.counterexample, "101");
            assert_eq!(report.message, "too large: 101");
        }
        FailureOrigin::Returned => {
            assert_eq!(report.counterexample, "-101");
            assert_eq!(report.message, "too small");
        }
    }
    println!("✓ Panic origin preservation passed");
}
