//! Watching the shrinker reduce failing byte streams.
//!
//! Run with `RUST_LOG=crucible_core=debug` to see each shrink pass that
//! made progress.

use crucible_core::*;
use tracing_subscriber::EnvFilter;

fn show<T>(name: &str, prop: &Property<T>, config: &Config)
where
    T: std::fmt::Debug + Clone + 'static,
{
    match prop.run(config) {
        Err(CrucibleError::PropertyFailed(failure)) => {
            println!("{name}:");
            println!("  Counterexample: {}", failure.counterexample);
            println!("  Bytes: {:?}", failure.bytes);
            println!("  Shrinks performed: {}", failure.shrinks_performed);
            println!("  Origin: {}", failure.origin);
        }
        Ok(_) => println!("{name}: no failure found"),
        Err(e) => println!("{name}: {e}"),
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::default();

    // Integers shrink toward zero, stopping at the boundary.
    let threshold = for_all(integers::<u32>(0, 1_000_000), |&x| x < 1234);
    show("Integer threshold", &threshold, &config);

    // Lists lose elements and the remaining elements shrink.
    let sum = for_all(vecs(integers::<u8>(0, 255), 0, 30), |v| {
        v.iter().map(|&x| x as u32).sum::<u32>() <= 300
    });
    show("List sum", &sum, &config);

    // Strings shrink toward short strings of '0'.
    let no_z = for_all(text(0, 20), |s| !s.contains('z'));
    show("String without 'z'", &no_z, &config);

    // Floats shrink toward simple integral values.
    let bounded = for_all(floats(FloatOptions::between(-1e9, 1e9)), |&x| x.abs() < 1000.5);
    show("Float magnitude", &bounded, &config);

    // A panicking property keeps its panic site while shrinking.
    let panics = given(vecs(integers::<i32>(-50, 50), 0, 10), |_, v| {
        if v.len() > 2 && v.windows(2).all(|w| w[0] <= w[1]) {
            panic!("sorted list of {} elements", v.len());
        }
        Ok(())
    });
    show("Panicking property", &panics, &config);

    // The shrinker works on plain bytes too.
    let (bytes, stats) = shrink(vec![200, 13, 77, 9, 255, 1], 1000, |candidate| {
        (candidate.iter().map(|&b| b as u32).sum::<u32>() >= 256).then(|| candidate.to_vec())
    });
    println!(
        "Raw bytes shrunk to {bytes:?} ({} improvements, {} calls)",
        stats.improvements, stats.calls
    );
}
