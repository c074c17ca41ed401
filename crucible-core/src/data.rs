//! Core data types for Crucible: the random seed and run configuration.

use crate::error::{CrucibleError, Result};
use crate::targeted::TargetedConfig;
use rand::RngCore;
use std::fmt;
use std::time::Duration;

/// Splittable SplitMix64 generator feeding fresh bytes into byte streams.
///
/// Seeds are deterministic: the same initial value always produces the same
/// sequence, which is what makes a run reproducible from `Config::seed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed(pub u64, pub u64);

impl Seed {
    /// Create a new seed from a single value.
    pub fn from_u64(value: u64) -> Self {
        let state = splitmix64_mix(value);
        let gamma = mix_gamma(state);
        Seed(state, gamma)
    }

    /// Split off an independent child seed, advancing this one.
    pub fn split(&mut self) -> Self {
        let output = self.next_u64();
        Seed(output, mix_gamma(output))
    }

    /// A random initial seed value for a run.
    pub fn random_value() -> u64 {
        rand::thread_rng().next_u64()
    }
}

impl RngCore for Seed {
    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_u64(&mut self) -> u64 {
        let Seed(state, gamma) = *self;
        let new_state = state.wrapping_add(gamma);
        *self = Seed(new_state, gamma);
        splitmix64_mix(new_state)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(8) {
            let bytes = self.next_u64().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({}, {})", self.0, self.1)
    }
}

/// The stages a run can go through. Disabling a phase skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Try registered explicit examples first.
    Explicit,
    /// Generate fresh random inputs.
    Generate,
    /// Mutate high-scoring inputs from the target pool.
    Target,
    /// Minimize a confirmed failure.
    Shrink,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Explicit, Phase::Generate, Phase::Target, Phase::Shrink];
}

/// Configuration for property testing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of valid trials to run before declaring success.
    pub test_limit: usize,

    /// Maximum number of successful shrinks to perform.
    pub shrink_limit: usize,

    /// Maximum number of invalid or overrun trials before giving up.
    pub discard_limit: usize,

    /// Maximum number of bytes a single trial may consume.
    pub buffer_size: usize,

    /// Seed for the run; random when unset.
    pub seed: Option<u64>,

    /// Wall-clock budget for the generation loop, checked between trials.
    pub time_limit: Option<Duration>,

    /// Per-trial deadline; slower trials are discarded as too slow.
    pub deadline: Option<Duration>,

    /// Enabled phases.
    pub phases: Vec<Phase>,

    /// Accept infinite `target` observations. NaN is always rejected.
    pub allow_infinite_observations: bool,

    /// Tuning for targeted search.
    pub targeting: TargetedConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            test_limit: 100,
            shrink_limit: 1000,
            discard_limit: 1000,
            buffer_size: 8 * 1024,
            seed: None,
            time_limit: None,
            deadline: None,
            phases: Phase::ALL.to_vec(),
            allow_infinite_observations: false,
            targeting: TargetedConfig::default(),
        }
    }
}

impl Config {
    /// Create a new config with the given number of tests.
    pub fn with_tests(mut self, tests: usize) -> Self {
        self.test_limit = tests;
        self
    }

    /// Create a new config with the given shrink limit.
    pub fn with_shrinks(mut self, shrinks: usize) -> Self {
        self.shrink_limit = shrinks;
        self
    }

    pub fn with_discard_limit(mut self, limit: usize) -> Self {
        self.discard_limit = limit;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Fix the run's seed for reproducible generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_phases(mut self, phases: &[Phase]) -> Self {
        self.phases = phases.to_vec();
        self
    }

    pub fn with_infinite_observations(mut self, allow: bool) -> Self {
        self.allow_infinite_observations = allow;
        self
    }

    pub fn with_targeting(mut self, targeting: TargetedConfig) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn has_phase(&self, phase: Phase) -> bool {
        self.phases.contains(&phase)
    }

    /// Defaults overlaid with `CRUCIBLE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Config::default().overlay_env(|key| std::env::var(key).ok())
    }

    /// Overlay settings from a variable lookup. Split out from `from_env` so
    /// the parsing can be exercised without touching the process environment.
    pub fn overlay_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tests) = lookup("CRUCIBLE_TESTS") {
            self.test_limit = parse_var("CRUCIBLE_TESTS", &tests)?;
        }
        if let Some(seed) = lookup("CRUCIBLE_SEED") {
            self.seed = Some(parse_var("CRUCIBLE_SEED", &seed)?);
        }
        if let Some(shrinks) = lookup("CRUCIBLE_SHRINKS") {
            self.shrink_limit = parse_var("CRUCIBLE_SHRINKS", &shrinks)?;
        }
        if let Some(deadline) = lookup("CRUCIBLE_DEADLINE_MS") {
            let millis: u64 = parse_var("CRUCIBLE_DEADLINE_MS", &deadline)?;
            self.deadline = Some(Duration::from_millis(millis));
        }
        tracing::debug!(
            tests = self.test_limit,
            seed = ?self.seed,
            shrinks = self.shrink_limit,
            "loaded configuration from environment"
        );
        Ok(self)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.test_limit == 0 {
            return Err(invalid_config("test_limit must be at least 1"));
        }
        if self.buffer_size == 0 {
            return Err(invalid_config("buffer_size must be at least 1"));
        }
        if self.targeting.pool_size == 0 {
            return Err(invalid_config("targeting.pool_size must be at least 1"));
        }
        let p = self.targeting.mutation_probability;
        if !(0.0..=1.0).contains(&p) {
            return Err(invalid_config(format!(
                "targeting.mutation_probability must be within [0, 1], got {p}"
            )));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| invalid_config(format!("{key} has unparseable value {raw:?}")))
}

fn invalid_config(message: impl Into<String>) -> CrucibleError {
    CrucibleError::InvalidConfig {
        message: message.into(),
    }
}

/// SplitMix64 mixing function for high-quality output.
fn splitmix64_mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9e3779b97f4a7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}

/// Generate a good gamma value for SplitMix64 splitting.
fn mix_gamma(mut z: u64) -> u64 {
    z = splitmix64_mix(z);
    // Odd gamma for maximal period
    (z | 1).wrapping_mul(0x9e3779b97f4a7c15)
}
