//! Targeting meta tests
//!
//! These properties check the argument contract of `target`: finite floats
//! with text labels are accepted from inside a trial, everything else is an
//! invalid argument, and accepted observations feed the targeted search.

use crate::{arbitrary_seed, inner_config};
use crucible::*;

const FEW_LABELS: [&str; 3] = ["a", "few", "labels"];

fn few_labels() -> Strategy<String> {
    sampled_from(FEW_LABELS.to_vec()).map(str::to_string)
}

/// Any `Value` that is not a float.
fn everything_except_float() -> Strategy<Value> {
    one_of(vec![
        just(Value::None),
        booleans().map(Value::Bool),
        integers::<i64>(i64::MIN, i64::MAX).map(Value::from),
        text(0, 10).map(Value::Text),
        vecs(integers::<u8>(0, 255), 0, 8).map(Value::Bytes),
        vecs(text(0, 5), 0, 3).map(Value::from),
    ])
}

/// Any `Value` that is not text.
fn everything_except_text() -> Strategy<Value> {
    let all_floats = floats(FloatOptions {
        allow_nan: true,
        allow_infinity: true,
        ..FloatOptions::default()
    });
    one_of(vec![
        just(Value::None),
        booleans().map(Value::Bool),
        integers::<i64>(i64::MIN, i64::MAX).map(Value::from),
        all_floats.map(Value::Float),
        vecs(integers::<u8>(0, 255), 0, 8).map(Value::Bytes),
        vecs(text(0, 5), 0, 3).map(Value::from),
    ])
}

fn expect_pass(name: &str, result: Result<RunStats>) -> RunStats {
    match result {
        Ok(stats) => {
            println!("✓ {name} passed");
            stats
        }
        Err(e) => panic!("{name} failed: {e}"),
    }
}

/// Property: finite floats with any text label are accepted
pub fn test_allowed_inputs_to_target() {
    let prop = given(tuple_of(finite_floats(), text(0, 20)), |tc, (observation, label)| {
        tc.target_labelled(observation, label)?;
        Ok(())
    })
    .example((0.0, "this covers the explicit example branch".to_string()));

    expect_pass("Allowed target inputs", prop.run(&inner_config(20)));
}

/// Property: the free `target` accepts observations under a few labels
pub fn test_allowed_inputs_to_target_fewer_labels() {
    let observations = floats(FloatOptions {
        min: Some(1.0),
        ..FloatOptions::default()
    });
    let prop = given(tuple_of(observations, few_labels()), |_, (observation, label)| {
        target_labelled(observation, label)?;
        Ok(())
    });

    let stats = expect_pass("Allowed target inputs with few labels", prop.run(&inner_config(21)));
    assert!(stats
        .targeting
        .best
        .keys()
        .all(|label| FEW_LABELS.contains(&label.as_str())));
}

/// Property: `target(x)` records exactly what `target_labelled(x, "")` does
pub fn test_target_without_label() {
    let observations = floats(FloatOptions::between(1.0, 10.0));
    let unlabelled = given(observations.clone(), |_, observation| {
        target(observation)?;
        Ok(())
    });
    let labelled = given(observations.clone(), |tc, observation| {
        tc.target_labelled(observation, "")?;
        Ok(())
    });

    let prop = for_all_named(arbitrary_seed(), "seed", move |&seed| {
        let config = inner_config(seed);
        let mut stream = ByteStream::generate(Vec::new(), Seed::from_u64(seed), 1024);
        let Ok(observation) = observations.draw(&mut stream) else {
            return false;
        };
        let bytes = stream.into_bytes();
        let implicit = unlabelled.reproduce(&bytes, &config);
        let explicit = labelled.reproduce(&bytes, &config);
        implicit.status == Status::Valid
            && implicit.observations == explicit.observations
            && implicit.observations == vec![(observation, String::new())]
    });
    expect_pass("Target without label", prop.run(&inner_config(22).with_tests(50)));

    let free = given(floats(FloatOptions::between(1.0, 10.0)), |_, observation| {
        target(observation)?;
        Ok(())
    });
    let stats = expect_pass("Free target run", free.run(&inner_config(22)));
    assert_eq!(
        stats.targeting.best.keys().collect::<Vec<_>>(),
        vec![&String::new()]
    );
}

/// Property: many target calls in one trial are all accepted
pub fn test_multiple_target_calls() {
    let pairs = vecs(
        tuple_of(finite_floats(), one_of(vec![few_labels(), text(0, 10)])),
        1,
        10,
    );
    let prop = given(pairs, |tc, pairs| {
        for (observation, label) in &pairs {
            tc.target_labelled(*observation, label)?;
        }
        if tc.observations().len() == pairs.len() {
            Ok(())
        } else {
            Err(PropertyError::fail("observations were dropped"))
        }
    });

    expect_pass("Multiple target calls", prop.run(&inner_config(23)));
}

/// Property: non-float observations and non-text labels are invalid arguments
pub fn test_disallowed_inputs_to_target() {
    let prop = given(
        tuple_of(everything_except_float(), everything_except_text()),
        |_, (observation, label)| match target_labelled(observation, label) {
            Err(CrucibleError::InvalidArgument(_)) => Ok(()),
            other => Err(PropertyError::fail(format!("expected InvalidArgument, got {other:?}"))),
        },
    )
    .with_examples(vec![
        (Value::Float(f64::NAN), Value::from("")),
        (Value::Float(f64::INFINITY), Value::from("")),
        (Value::Float(f64::NEG_INFINITY), Value::from("")),
        (Value::from("1"), Value::from("Non-float observations are invalid")),
        (Value::Float(0.0), Value::from(vec!["a list of strings is not a valid label"])),
    ]);

    expect_pass("Disallowed target inputs", prop.run(&inner_config(24)));
}

/// Property: NaN and infinities are rejected under any label
pub fn test_non_finite_observations() {
    let prop = given(
        tuple_of(sampled_from(vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY]), text(0, 10)),
        |tc, (observation, label)| match tc.target_labelled(observation, label) {
            Err(CrucibleError::InvalidArgument(_)) => Ok(()),
            other => Err(PropertyError::fail(format!("expected InvalidArgument, got {other:?}"))),
        },
    );

    let stats = expect_pass("Non-finite observations", prop.run(&inner_config(25)));
    assert!(stats.targeting.best.is_empty());
}

/// Ten calls with the same label keep only the last value for ranking
pub fn test_last_observation_wins() {
    let prop = given(vecs(finite_floats(), 10, 10), |tc, values| {
        for &value in &values {
            tc.target_labelled(value, "same")?;
        }
        let finals = final_observations(tc.observations());
        if finals.len() == 1 && finals["same"] == values[9] {
            Ok(())
        } else {
            Err(PropertyError::fail(format!("{finals:?}")))
        }
    });
    expect_pass("Last observation wins", prop.run(&inner_config(26)));

    let mut search = TargetSearch::new(TargetedConfig::default(), false);
    let observations: Vec<(f64, String)> =
        (0..10).map(|i| (i as f64, "same".to_string())).collect();
    search.record_trial(&observations, &[1, 2, 3]);
    assert_eq!(search.pool().entries("same").len(), 1);
    assert_eq!(search.pool().best("same").map(|e| e.score), Some(9.0));
}

/// `target` outside of a running trial is an invalid argument
pub fn test_target_outside_trial() {
    assert!(matches!(target(0.0), Err(CrucibleError::InvalidArgument(_))));
    assert!(matches!(
        target_labelled(1.0, "label"),
        Err(CrucibleError::InvalidArgument(_))
    ));
    println!("✓ Target outside trial passed");
}

/// Infinities are accepted once the configuration allows them; NaN never is
pub fn test_infinite_observations_opt_in() {
    let prop = given(sampled_from(vec![f64::INFINITY, f64::NEG_INFINITY]), |tc, observation| {
        tc.target(observation)?;
        match tc.target(f64::NAN) {
            Err(CrucibleError::InvalidArgument(_)) => Ok(()),
            other => Err(PropertyError::fail(format!("NaN accepted: {other:?}"))),
        }
    });
    let config = inner_config(27).with_infinite_observations(true);
    expect_pass("Infinite observations opt-in", prop.run(&config));

    let err = prop.run(&inner_config(27)).unwrap_err();
    assert!(matches!(err, CrucibleError::InvalidArgument(_)), "{err:?}");
}

/// Reported observations seed mutated trials during generation
pub fn test_targeting_seeds_mutations() {
    let prop = given(vecs(integers::<u8>(0, 255), 0, 30), |tc, v| {
        tc.target(v.iter().map(|&x| x as f64).sum::<f64>())?;
        Ok(())
    });
    let config = inner_config(28).with_tests(300);
    let stats = expect_pass("Targeting seeds mutations", prop.run(&config));
    assert!(stats.mutated > 0);
    assert!(stats.targeting.improvements > 0);
    assert!(stats.targeting.best[""] > 0.0);
}

/// Over the same seeds, targeting reaches higher observations than plain
/// generation
pub fn test_targeting_climbs_higher_than_generation() {
    let prop = given(vecs(integers::<u8>(0, 255), 0, 200), |tc, v| {
        tc.target(v.iter().map(|&x| x as f64).sum::<f64>())?;
        Ok(())
    });
    let best = |config: Config| -> f64 {
        let stats = expect_pass("Sum search", prop.run(&config));
        stats.targeting.best.get("").copied().unwrap_or(0.0)
    };

    let (mut targeted, mut untargeted) = (0.0, 0.0);
    for seed in 0..10 {
        let config = inner_config(seed).with_tests(200);
        targeted += best(config.clone());
        untargeted += best(config.with_phases(&[Phase::Generate]));
    }
    println!("mean best sum: {} targeted, {} untargeted", targeted / 10.0, untargeted / 10.0);
    assert!(targeted > untargeted, "{targeted} <= {untargeted}");
}
