//! Engine behaviour meta tests
//!
//! Explicit examples, discard budgets, flaky failures, usage errors and
//! reproducibility from a seed.

use crate::{expect_failure, inner_config};
use crucible::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

/// Explicit examples run before generated inputs
pub fn test_examples_run_first() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let prop = for_all(integers::<i32>(0, 10), move |&x| {
        log.borrow_mut().push(x);
        true
    })
    .with_examples(vec![-1, -2])
    .example(-3);

    let stats = prop.run(&inner_config(30)).expect("property should pass");
    assert_eq!(stats.explicit, 3);
    assert_eq!(&seen.borrow()[..3], &[-1, -2, -3]);
    assert!(seen.borrow()[3..].iter().all(|x| (0..=10).contains(x)));
    println!("✓ Examples run first passed");
}

/// Rejecting every input ends in Unsatisfiable
pub fn test_unsatisfiable() {
    let prop = given(integers::<u8>(0, 255), |tc, _| tc.assume(false));
    match prop.run(&inner_config(31).with_discard_limit(100)) {
        Err(CrucibleError::Unsatisfiable { valid, invalid, .. }) => {
            assert_eq!(valid, 0);
            assert!(invalid > 100);
        }
        other => panic!("expected Unsatisfiable, got {other:?}"),
    }

    let filtered = for_all(integers::<u8>(0, 255).filter(|_| false), |_| true);
    assert!(matches!(
        filtered.run(&inner_config(31)),
        Err(CrucibleError::Unsatisfiable { .. })
    ));
    println!("✓ Unsatisfiable passed");
}

/// A failure that does not reproduce is reported as flaky, not shrunk
pub fn test_flaky() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let prop = for_all(integers::<u32>(0, 100), move |_| {
        counter.set(counter.get() + 1);
        counter.get() != 5
    });
    match prop.run(&inner_config(32)) {
        Err(CrucibleError::Flaky { .. }) => {}
        other => panic!("expected Flaky, got {other:?}"),
    }
    assert_eq!(calls.get(), 6);
    println!("✓ Flaky passed");
}

/// Misuse of `target` aborts the run with the original error
pub fn test_usage_errors_surface() {
    let prop = given(finite_floats(), |tc, x| {
        tc.target_labelled(x, 42)?;
        Ok(())
    });
    match prop.run(&inner_config(33)) {
        Err(CrucibleError::InvalidArgument(message)) => assert!(message.contains("label")),
        other => panic!("expected InvalidArgument, got {other:?}"),
    }
    println!("✓ Usage errors surface passed");
}

/// The same seed finds and shrinks to the same failure
pub fn test_same_seed_same_failure() {
    let prop = for_all(vecs(integers::<i64>(-1_000_000, 1_000_000), 0, 10), |v| {
        v.iter().all(|&x| x < 1000)
    });
    let first = expect_failure(prop.run(&inner_config(34)));
    let second = expect_failure(prop.run(&inner_config(34)));
    assert_eq!(first, second);
    assert_eq!(first.seed, Some(34));
    let minimal = prop.decode(&first.bytes).expect("report bytes decode");
    let nonzero: Vec<i64> = minimal.into_iter().filter(|&x| x != 0).collect();
    assert_eq!(nonzero, vec![1000]);
    println!("✓ Same seed same failure passed");
}

/// Trials past the deadline are discarded rather than failed
pub fn test_slow_trials_are_discarded() {
    let prop = given(integers::<u8>(0, 255), |_, x| {
        if x % 2 == 0 {
            std::thread::sleep(Duration::from_millis(30));
        }
        Ok(())
    });
    let config = inner_config(35)
        .with_tests(10)
        .with_deadline(Duration::from_millis(10));
    let stats = prop.run(&config).expect("slow trials are not failures");
    assert_eq!(stats.valid, 10);
    assert!(stats.too_slow <= stats.invalid);
    println!("✓ Slow trials discarded passed");
}
