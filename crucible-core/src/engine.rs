//! The engine: drives trials through the explicit, generate/target and
//! shrink phases of one run.

use crate::data::{Config, Phase, Seed};
use crate::error::{CrucibleError, FailureReport, Result};
use crate::shrink::{shrink, ShrinkStats};
use crate::stream::ByteStream;
use crate::targeted::{SearchStats, TargetSearch};
use crate::trial::{Status, Trial};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Something the engine can run trials of.
pub trait TrialRunner {
    /// Run one trial on `stream`.
    fn run(&self, stream: ByteStream, config: &Config) -> Trial;

    /// Number of explicit examples, tried before anything is generated.
    fn example_count(&self) -> usize {
        0
    }

    /// Run the explicit example at `index`.
    fn run_example(&self, _index: usize, _config: &Config) -> Option<Trial> {
        None
    }

    /// Name used in reports and logs.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// Statistics about a finished run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    /// Seed the generated trials were drawn from
    pub seed: u64,
    /// Explicit examples tried
    pub explicit: usize,
    pub valid: usize,
    pub invalid: usize,
    pub overruns: usize,
    /// Trials discarded for running past the deadline (also counted invalid)
    pub too_slow: usize,
    /// Generated trials that started from a mutated pool entry
    pub mutated: usize,
    /// Counts of `TestCase::event` labels over all trials
    pub events: BTreeMap<String, usize>,
    pub targeting: SearchStats,
    pub shrinking: ShrinkStats,
    pub elapsed: Duration,
}

impl RunStats {
    /// Trials run, excluding shrinking.
    pub fn tests_run(&self) -> usize {
        self.explicit + self.valid + self.invalid + self.overruns
    }

    fn discarded(&self) -> usize {
        self.invalid + self.overruns
    }
}

pub(crate) struct Engine<'a, R: TrialRunner + ?Sized> {
    runner: &'a R,
    config: &'a Config,
    rng: Seed,
    search: TargetSearch,
    stats: RunStats,
    started: Instant,
}

impl<'a, R: TrialRunner + ?Sized> Engine<'a, R> {
    pub(crate) fn new(runner: &'a R, config: &'a Config) -> Self {
        let seed = config.seed.unwrap_or_else(Seed::random_value);
        Engine {
            runner,
            config,
            rng: Seed::from_u64(seed),
            search: TargetSearch::new(
                config.targeting.clone(),
                config.allow_infinite_observations,
            ),
            stats: RunStats {
                seed,
                ..RunStats::default()
            },
            started: Instant::now(),
        }
    }

    /// Run every enabled phase. A confirmed failure is returned as
    /// `CrucibleError::PropertyFailed`.
    pub(crate) fn run(mut self) -> Result<RunStats> {
        self.config.validate()?;
        let runner = self.runner;
        let name = runner.name().unwrap_or("property");
        tracing::debug!(property = name, seed = self.stats.seed, "starting run");

        if self.config.has_phase(Phase::Explicit) {
            self.explicit_phase()?;
        }
        if self.config.has_phase(Phase::Generate) {
            if let Some(failure) = self.generate_phase()? {
                return Err(self.failure(failure));
            }
        }

        self.stats.targeting = self.search.stats().clone();
        self.stats.elapsed = self.started.elapsed();
        tracing::info!(
            property = name,
            valid = self.stats.valid,
            invalid = self.stats.invalid,
            overruns = self.stats.overruns,
            mutated = self.stats.mutated,
            elapsed = ?self.stats.elapsed,
            "property passed"
        );
        Ok(self.stats)
    }

    fn explicit_phase(&mut self) -> Result<()> {
        for index in 0..self.runner.example_count() {
            let Some(trial) = self.runner.run_example(index, self.config) else {
                continue;
            };
            self.stats.explicit += 1;
            self.count_events(&trial);
            if let Some(err) = trial.usage_error {
                return Err(err);
            }
            if let Status::Interesting(origin) = trial.status {
                tracing::debug!(index, %origin, "explicit example failed");
                return Err(CrucibleError::PropertyFailed(Box::new(FailureReport {
                    counterexample: trial.value.unwrap_or_default(),
                    bytes: Vec::new(),
                    message: trial.message.unwrap_or_default(),
                    origin,
                    notes: trial.notes,
                    tests_run: self.stats.tests_run(),
                    shrinks_performed: 0,
                    seed: None,
                    property_name: self.runner.name().map(str::to_string),
                })));
            }
        }
        Ok(())
    }

    /// Generate trials until the budget is spent or a failure turns up.
    fn generate_phase(&mut self) -> Result<Option<Trial>> {
        let targeting = self.config.has_phase(Phase::Target);
        while self.stats.valid < self.config.test_limit {
            if let Some(limit) = self.config.time_limit {
                if self.started.elapsed() > limit {
                    tracing::warn!(valid = self.stats.valid, ?limit, "time limit reached");
                    break;
                }
            }
            if self.stats.discarded() > self.config.discard_limit {
                tracing::warn!(
                    valid = self.stats.valid,
                    invalid = self.stats.invalid,
                    overruns = self.stats.overruns,
                    "discard limit exceeded"
                );
                return Err(CrucibleError::Unsatisfiable {
                    valid: self.stats.valid,
                    invalid: self.stats.invalid,
                    overruns: self.stats.overruns,
                });
            }

            let prefix = if targeting && self.search.should_mutate(&mut self.rng) {
                self.search.mutated_prefix(&mut self.rng)
            } else {
                None
            };
            if prefix.is_some() {
                self.stats.mutated += 1;
            }
            let stream = ByteStream::generate(
                prefix.unwrap_or_default(),
                self.rng.split(),
                self.config.buffer_size,
            );
            let mut trial = self.runner.run(stream, self.config);
            self.count_events(&trial);
            if let Some(err) = trial.usage_error.take() {
                return Err(err);
            }
            // Only inputs that ran to completion seed the pool.
            if matches!(trial.status, Status::Valid | Status::Interesting(_)) {
                self.search.record_trial(&trial.observations, trial.bytes());
            }

            match trial.status {
                Status::Valid => self.stats.valid += 1,
                Status::Invalid => {
                    self.stats.invalid += 1;
                    if trial.too_slow {
                        self.stats.too_slow += 1;
                    }
                }
                Status::Overrun => self.stats.overruns += 1,
                Status::Interesting(_) => return self.confirm(trial).map(Some),
            }
        }
        Ok(None)
    }

    /// Replay a failure once; a different outcome means the property is flaky.
    fn confirm(&mut self, trial: Trial) -> Result<Trial> {
        let replay = self.runner.run(ByteStream::replay(trial.bytes()), self.config);
        if replay.status != trial.status {
            tracing::warn!(
                first = ?trial.status,
                replay = ?replay.status,
                "failure did not reproduce"
            );
            return Err(CrucibleError::Flaky {
                message: format!(
                    "failed with {:?} but replaying the same input gave {:?}",
                    trial.status, replay.status
                ),
            });
        }
        tracing::debug!(len = trial.bytes().len(), status = ?trial.status, "failure confirmed");
        Ok(trial)
    }

    /// Shrink a confirmed failure and build its report.
    fn failure(&mut self, found: Trial) -> CrucibleError {
        let mut minimal = found;
        if self.config.has_phase(Phase::Shrink) {
            let target = minimal.status.clone();
            let (runner, config) = (self.runner, self.config);
            let (bytes, stats) = shrink(
                minimal.bytes().to_vec(),
                config.shrink_limit,
                |candidate| {
                    let trial = runner.run(ByteStream::replay(candidate), config);
                    (trial.status == target).then(|| trial.bytes().to_vec())
                },
            );
            tracing::debug!(
                improvements = stats.improvements,
                calls = stats.calls,
                len = bytes.len(),
                "shrinking finished"
            );
            self.stats.shrinking = stats;

            let rerun = runner.run(ByteStream::replay(&bytes), config);
            if rerun.status == target {
                minimal = rerun;
            } else {
                tracing::warn!(status = ?rerun.status, "minimal failure did not reproduce");
            }
        }

        let Status::Interesting(origin) = minimal.status.clone() else {
            return CrucibleError::Flaky {
                message: "failure vanished before it could be reported".to_string(),
            };
        };
        let report = FailureReport {
            counterexample: minimal.value.clone().unwrap_or_default(),
            bytes: minimal.bytes().to_vec(),
            message: minimal.message.clone().unwrap_or_default(),
            origin,
            notes: minimal.notes.clone(),
            tests_run: self.stats.tests_run() + 1,
            shrinks_performed: self.stats.shrinking.improvements,
            seed: Some(self.stats.seed),
            property_name: self.runner.name().map(str::to_string),
        };
        tracing::info!(
            counterexample = %report.counterexample,
            shrinks = report.shrinks_performed,
            seed = self.stats.seed,
            "property failed"
        );
        CrucibleError::PropertyFailed(Box::new(report))
    }

    fn count_events(&mut self, trial: &Trial) {
        for event in &trial.events {
            *self.stats.events.entry(event.clone()).or_insert(0) += 1;
        }
    }
}
