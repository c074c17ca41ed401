//! Basic example demonstrating Crucible property-based testing.

use crucible::*;
use tracing_subscriber::EnvFilter;

fn report(name: &str, result: Result<RunStats>) {
    match result {
        Ok(stats) => println!(
            "{name} passed: {} tests ({} invalid)",
            stats.valid, stats.invalid
        ),
        Err(CrucibleError::PropertyFailed(failure)) => {
            println!("{name} failed as expected:");
            println!("  Counterexample: {}", failure.counterexample);
            println!("  Message: {}", failure.message);
            println!("  Tests run: {}", failure.tests_run);
            println!("  Shrinks performed: {}", failure.shrinks_performed);
        }
        Err(e) => println!("{name} errored: {e}"),
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("Crucible Property-Based Testing Examples");
    println!();

    // Example 1: Simple boolean property
    let bool_prop = for_all(booleans(), |&b| b || !b);
    report("Boolean property", bool_prop.run(&Config::default()));

    // Example 2: Integer identity
    let addition_prop = for_all(integers::<i32>(-100, 100), |&x| x + 0 == x);
    report("Addition identity", addition_prop.run(&Config::default()));

    // Example 3: A failing property shrinks to its smallest counterexample
    let positive_prop = for_all_named(integers::<i32>(-10, 10), "x", |&x| x > 0);
    report("All integers are positive", positive_prop.run(&Config::default()));

    // Example 4: Mapped strategies
    let abs_prop = for_all(integers::<i64>(-1000, 1000).map(i64::abs), |&x| x >= 0);
    report("Absolute value", abs_prop.run(&Config::default()));

    // Example 5: Reversing a list twice is the identity
    let reverse_prop = for_all(vecs(integers::<u8>(0, 255), 0, 50), |v| {
        let mut twice = v.clone();
        twice.reverse();
        twice.reverse();
        &twice == v
    })
    .classify("empty", |v| v.is_empty())
    .classify("long", |v| v.len() > 10);
    match reverse_prop.run(&Config::default()) {
        Ok(stats) => {
            println!("Reverse property passed");
            for (label, count) in &stats.events {
                println!("  {label}: {count}");
            }
            println!();
        }
        Err(e) => println!("Reverse property errored: {e}"),
    }

    // Example 6: Discarding inputs with assume
    let operands = tuple_of(integers::<i32>(-100, 100), integers::<i32>(-100, 100));
    let division_prop = given(operands, |tc, (a, b)| {
        tc.assume(b != 0)?;
        let (q, r) = (a / b, a % b);
        if q * b + r == a {
            Ok(())
        } else {
            Err(PropertyError::fail(format!("{q} * {b} + {r} != {a}")))
        }
    });
    report("Division identity", division_prop.run(&Config::default()));

    // Example 7: Interactive draws and notes
    let index_prop = given(vecs(text(0, 5), 1, 10), |tc, words| {
        let i = tc.draw(&integers(0, words.len() - 1))?;
        tc.note(format!("picked index {i}"));
        if words[i].len() <= 5 {
            Ok(())
        } else {
            Err(PropertyError::fail("word too long"))
        }
    });
    report("Indexing a non-empty list", index_prop.run(&Config::default()));
}
