//! Targeted property-based testing.
//!
//! A property reports observations with `target`; the engine keeps the best
//! inputs per label and mutates them, steering generation toward inputs that
//! push the observations higher.

use crucible_core::*;
use tracing_subscriber::EnvFilter;

/// Fails only for long lists whose sum is large: hard to hit at random.
fn long_heavy_list() -> Property<Vec<u8>> {
    given(vecs(integers::<u8>(0, 255), 0, 200), |tc, v| {
        let sum: u32 = v.iter().map(|&x| x as u32).sum();
        tc.target_labelled(sum as f64, "sum")?;
        tc.target_labelled(v.len() as f64, "length")?;
        if sum > 12_000 {
            Err(PropertyError::fail(format!("sum {sum} over {} elements", v.len())))
        } else {
            Ok(())
        }
    })
}

fn run(name: &str, config: &Config) {
    match long_heavy_list().run(config) {
        Ok(stats) => {
            println!("{name}: passed {} tests, {} mutated", stats.valid, stats.mutated);
            for (label, best) in &stats.targeting.best {
                println!("  best {label:?}: {best}");
            }
        }
        Err(CrucibleError::PropertyFailed(failure)) => {
            println!("{name}: failed after {} tests", failure.tests_run);
            println!("  {}", failure.message);
        }
        Err(e) => println!("{name}: {e}"),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let seed = Seed::random_value();
    println!("Seed: {seed}");

    let without = Config::default()
        .with_seed(seed)
        .with_tests(500)
        .with_phases(&[Phase::Explicit, Phase::Generate, Phase::Shrink]);
    run("Without targeting", &without);

    let with = Config::default().with_seed(seed).with_tests(500).with_targeting(
        TargetedConfig::default()
            .with_pool_size(8)
            .with_mutation_probability(0.6),
    );
    run("With targeting", &with);

    // Observations can also be reported from helpers without a handle.
    let free = given(floats(FloatOptions::between(0.0, 100.0)), |_, x| {
        target(x)?;
        Ok(())
    });
    match free.run(&Config::default().with_seed(seed)) {
        Ok(stats) => println!("Free target: best {:?}", stats.targeting.best.get("")),
        Err(e) => println!("Free target: {e}"),
    }
}
