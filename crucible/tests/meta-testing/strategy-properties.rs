//! Strategy invariants
//!
//! Draws are a pure function of the bytes they read, respect their bounds,
//! and never turn a truncated stream into a different value.

use crate::{arbitrary_seed, inner_config};
use crucible::*;

fn sample_strategy() -> Strategy<(Vec<i32>, Option<String>, bool)> {
    triple_of(
        vecs(integers::<i32>(-1000, 1000), 0, 10),
        optional(text(0, 8)),
        booleans(),
    )
}

/// Property: replaying recorded bytes decodes the same value
pub fn test_replay_is_deterministic() {
    let prop = for_all_named(arbitrary_seed(), "seed", |&seed| {
        let strategy = sample_strategy();
        let mut original = ByteStream::generate(Vec::new(), Seed::from_u64(seed), 4096);
        let Ok(value) = strategy.draw(&mut original) else {
            return false;
        };
        let mut replay = ByteStream::replay(original.bytes());
        strategy.draw(&mut replay) == Ok(value) && replay.cursor() == original.cursor()
    });

    match prop.run(&inner_config(1).with_tests(50)) {
        Ok(_) => println!("✓ Replay determinism property passed"),
        Err(e) => panic!("Replay determinism property failed: {e}"),
    }
}

/// Property: integers stay within arbitrary bounds
pub fn test_integers_respect_bounds() {
    let bounds = tuple_of(integers::<i64>(i64::MIN, i64::MAX), integers::<i64>(i64::MIN, i64::MAX))
        .map(|(a, b)| (a.min(b), a.max(b)));
    let prop = given(bounds, |tc, (low, high)| {
        let x = tc.draw(&integers(low, high))?;
        if (low..=high).contains(&x) {
            Ok(())
        } else {
            Err(PropertyError::fail(format!("{x} outside [{low}, {high}]")))
        }
    });

    match prop.run(&inner_config(2)) {
        Ok(_) => println!("✓ Integer bounds property passed"),
        Err(e) => panic!("Integer bounds property failed: {e}"),
    }
}

/// Property: bounded floats stay within their range
pub fn test_bounded_floats_respect_bounds() {
    let endpoint = || floats(FloatOptions::between(-1e6, 1e6));
    let bounds = tuple_of(endpoint(), endpoint()).map(|(a, b)| (a.min(b), a.max(b)));
    let prop = given(bounds, |tc, (low, high)| {
        let x = tc.draw(&floats(FloatOptions::between(low, high)))?;
        if low <= x && x <= high {
            Ok(())
        } else {
            Err(PropertyError::fail(format!("{x} outside [{low}, {high}]")))
        }
    });

    match prop.run(&inner_config(3)) {
        Ok(_) => println!("✓ Float bounds property passed"),
        Err(e) => panic!("Float bounds property failed: {e}"),
    }
}

/// Property: dropping the last byte of a draw overruns rather than decoding
/// some other value
pub fn test_truncation_overruns() {
    let prop = for_all_named(arbitrary_seed(), "seed", |&seed| {
        let strategy = sample_strategy();
        let mut original = ByteStream::generate(Vec::new(), Seed::from_u64(seed), 4096);
        if strategy.draw(&mut original).is_err() {
            return false;
        }
        let bytes = original.bytes();
        if bytes.is_empty() {
            return true;
        }
        let mut truncated = ByteStream::replay(&bytes[..bytes.len() - 1]);
        strategy.draw(&mut truncated) == Err(DrawError::Overrun)
    });

    match prop.run(&inner_config(4).with_tests(50)) {
        Ok(_) => println!("✓ Truncation property passed"),
        Err(e) => panic!("Truncation property failed: {e}"),
    }
}
