//! Targeted property-based testing with search-guided generation.
//!
//! Properties report scalar observations through `target`. The search keeps,
//! per label, a small pool of the byte streams that scored best so far, and
//! the engine seeds some new trials with mutated copies of those streams
//! instead of fresh randomness. This is hill climbing over the input bytes,
//! so the search pressure lands on regions with extreme observations while
//! most trials keep exploring.
//!
//! The approach is inspired by the research presented in:
//! "Targeted property-based testing" by Andreas Löscher and Konstantinos Sagonas (ISSTA 2017)
//! Available at: <http://proper.softlab.ntua.gr/papers/issta2017.pdf>

use crate::error::Result;
use crate::stream::ByteStream;
use crate::trial::final_observations;
use crate::value::{validate_label, validate_observation, Value};
use rand::Rng;
use std::collections::BTreeMap;

/// Search objective for targeted testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchObjective {
    /// Maximize the observations
    Maximize,
    /// Minimize the observations
    Minimize,
}

impl SearchObjective {
    /// Whether `a` scores strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        match self {
            SearchObjective::Maximize => a > b,
            SearchObjective::Minimize => a < b,
        }
    }
}

/// Configuration for targeted search.
#[derive(Debug, Clone)]
pub struct TargetedConfig {
    /// Search objective (maximize or minimize observations)
    pub objective: SearchObjective,
    /// Streams kept per label
    pub pool_size: usize,
    /// Chance that a generated trial starts from a mutated pool entry
    pub mutation_probability: f64,
    /// Labels tracked; observations under further labels are ignored
    pub max_labels: usize,
}

impl Default for TargetedConfig {
    fn default() -> Self {
        TargetedConfig {
            objective: SearchObjective::Maximize,
            pool_size: 5,
            mutation_probability: 0.4,
            max_labels: 64,
        }
    }
}

impl TargetedConfig {
    pub fn with_objective(mut self, objective: SearchObjective) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size;
        self
    }

    pub fn with_mutation_probability(mut self, probability: f64) -> Self {
        self.mutation_probability = probability;
        self
    }
}

/// One stream in the pool with the score it earned.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub score: f64,
    pub bytes: Vec<u8>,
}

/// Label-keyed pools of the best-scoring byte streams, best first.
#[derive(Debug, Clone)]
pub struct TargetPool {
    objective: SearchObjective,
    pool_size: usize,
    max_labels: usize,
    pools: BTreeMap<String, Vec<PoolEntry>>,
}

impl TargetPool {
    pub fn new(config: &TargetedConfig) -> Self {
        TargetPool {
            objective: config.objective,
            pool_size: config.pool_size.max(1),
            max_labels: config.max_labels,
            pools: BTreeMap::new(),
        }
    }

    /// Offer `bytes` with `score` under `label`. Returns whether the entry
    /// made it into the pool.
    ///
    /// An existing entry with identical bytes is replaced, and a new entry
    /// ranks ahead of older entries with the same score.
    pub fn insert(&mut self, label: &str, score: f64, bytes: &[u8]) -> bool {
        if !self.pools.contains_key(label) && self.pools.len() >= self.max_labels {
            return false;
        }
        let objective = self.objective;
        let entries = self.pools.entry(label.to_string()).or_default();
        entries.retain(|entry| entry.bytes != bytes);

        let position = entries
            .iter()
            .position(|entry| !objective.is_better(entry.score, score))
            .unwrap_or(entries.len());
        if position >= self.pool_size {
            return false;
        }
        entries.insert(
            position,
            PoolEntry {
                score,
                bytes: bytes.to_vec(),
            },
        );
        entries.truncate(self.pool_size);
        true
    }

    /// The best entry under `label`.
    pub fn best(&self, label: &str) -> Option<&PoolEntry> {
        self.pools.get(label).and_then(|entries| entries.first())
    }

    pub fn entries(&self, label: &str) -> &[PoolEntry] {
        self.pools.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.pools.keys().map(String::as_str)
    }

    /// Total entries across all labels.
    pub fn len(&self) -> usize {
        self.pools.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Statistics about the search process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Observations offered to the pool
    pub reports: usize,
    /// Observations that beat the previous best for their label
    pub improvements: usize,
    /// Mutated prefixes handed out
    pub mutations: usize,
    /// Best score seen per label
    pub best: BTreeMap<String, f64>,
}

/// Mutation kinds applied to pool entries.
#[derive(Debug, Clone, Copy)]
enum Mutation {
    Replace,
    Nudge,
    DeleteSpan,
    DuplicateSpan,
}

const MUTATIONS: [Mutation; 4] = [
    Mutation::Replace,
    Mutation::Nudge,
    Mutation::DeleteSpan,
    Mutation::DuplicateSpan,
];

const MAX_SPAN: usize = 8;

/// The targeted search controller for one run.
#[derive(Debug, Clone)]
pub struct TargetSearch {
    config: TargetedConfig,
    allow_infinite: bool,
    pool: TargetPool,
    stats: SearchStats,
}

impl TargetSearch {
    pub fn new(config: TargetedConfig, allow_infinite: bool) -> Self {
        let pool = TargetPool::new(&config);
        TargetSearch {
            config,
            allow_infinite,
            pool,
            stats: SearchStats::default(),
        }
    }

    /// Validate an observation and offer `source`'s bytes to the pool.
    pub fn report(
        &mut self,
        observation: impl Into<Value>,
        label: impl Into<Value>,
        source: &ByteStream,
    ) -> Result<()> {
        let score = validate_observation(&observation.into(), self.allow_infinite)?;
        let label = validate_label(&label.into())?;
        self.offer(&label, score, source.bytes());
        Ok(())
    }

    /// Feed a finished trial's observations, keeping the last value reported
    /// per label.
    pub fn record_trial(&mut self, observations: &[(f64, String)], bytes: &[u8]) {
        for (label, score) in final_observations(observations) {
            self.offer(&label, score, bytes);
        }
    }

    fn offer(&mut self, label: &str, score: f64, bytes: &[u8]) {
        self.stats.reports += 1;
        let improved = match self.stats.best.get(label) {
            Some(&best) => self.config.objective.is_better(score, best),
            None => true,
        };
        if !self.pool.insert(label, score, bytes) {
            return;
        }
        if improved {
            self.stats.improvements += 1;
            tracing::debug!(label, score, len = bytes.len(), "new best target observation");
        }
        // Re-inserting known bytes can lower the pool's best.
        if let Some(best) = self.pool.best(label) {
            self.stats.best.insert(label.to_string(), best.score);
        }
    }

    /// Whether the next trial should start from a mutated pool entry.
    pub fn should_mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        !self.pool.is_empty() && rng.gen::<f64>() < self.config.mutation_probability
    }

    /// A prefix derived from a pool entry by one to three small mutations.
    ///
    /// Labels are picked uniformly; within a label the pick leans toward the
    /// best entries.
    pub fn mutated_prefix<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Vec<u8>> {
        let labels: Vec<&str> = self
            .pool
            .labels()
            .filter(|label| !self.pool.entries(label).is_empty())
            .collect();
        if labels.is_empty() {
            return None;
        }
        let entries = self.pool.entries(labels[rng.gen_range(0..labels.len())]);
        let index = rng.gen_range(0..entries.len()).min(rng.gen_range(0..entries.len()));
        let mut bytes = entries[index].bytes.clone();

        for _ in 0..rng.gen_range(1..=3) {
            mutate(&mut bytes, MUTATIONS[rng.gen_range(0..MUTATIONS.len())], rng);
        }
        self.stats.mutations += 1;
        Some(bytes)
    }

    pub fn pool(&self) -> &TargetPool {
        &self.pool
    }

    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }
}

fn mutate<R: Rng + ?Sized>(bytes: &mut Vec<u8>, mutation: Mutation, rng: &mut R) {
    if bytes.is_empty() {
        bytes.push(rng.gen());
        return;
    }
    let at = rng.gen_range(0..bytes.len());
    let span = rng.gen_range(1..=MAX_SPAN.min(bytes.len() - at));
    match mutation {
        Mutation::Replace => bytes[at] = rng.gen(),
        Mutation::Nudge => {
            bytes[at] = if rng.gen::<bool>() {
                bytes[at].wrapping_add(1)
            } else {
                bytes[at].wrapping_sub(1)
            }
        }
        Mutation::DeleteSpan => {
            bytes.drain(at..at + span);
        }
        Mutation::DuplicateSpan => {
            let copy = bytes[at..at + span].to_vec();
            bytes.splice(at + span..at + span, copy);
        }
    }
}
