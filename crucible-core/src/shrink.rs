//! Shrinking of failing byte streams.
//!
//! Shrinking works on the bytes, never on typed values: every strategy
//! decodes simpler bytes into simpler values, so one catalogue of byte-level
//! passes serves every type. Passes run in a fixed order and the whole
//! catalogue is swept until a sweep makes no progress.

use crate::stream::is_simpler;
use std::collections::HashSet;

/// Statistics about a shrink run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShrinkStats {
    /// Candidates accepted as the new smallest failure
    pub improvements: usize,
    /// Candidates actually executed
    pub calls: usize,
    /// Candidates skipped because they had been tried before
    pub cache_hits: usize,
    /// Full sweeps of the pass catalogue
    pub sweeps: usize,
}

type Pass = fn(&mut Shrinker<'_>);

/// Passes in the order they run.
const PASSES: &[(&str, Pass)] = &[
    ("truncate_tail", truncate_tail),
    ("delete_spans", delete_spans),
    ("zero_spans", zero_spans),
    ("minimize_integers", minimize_integers),
    ("sort_spans", sort_spans),
];

/// Widest span `delete_spans` removes in one candidate.
const MAX_DELETE: usize = 8;
const SPAN_SIZES: [usize; 4] = [8, 4, 2, 1];
const INTEGER_WIDTHS: [usize; 4] = [1, 2, 4, 8];
const SORT_SIZES: [usize; 3] = [8, 4, 2];

/// Decides whether a candidate still fails the same way. Returns the bytes
/// the trial actually consumed when it does.
type Predicate<'a> = dyn FnMut(&[u8]) -> Option<Vec<u8>> + 'a;

struct Shrinker<'a> {
    current: Vec<u8>,
    predicate: &'a mut Predicate<'a>,
    seen: HashSet<Vec<u8>>,
    max_improvements: usize,
    max_calls: usize,
    stats: ShrinkStats,
}

impl<'a> Shrinker<'a> {
    fn exhausted(&self) -> bool {
        self.stats.improvements >= self.max_improvements || self.stats.calls >= self.max_calls
    }

    /// Try `candidate`; on success it (or rather its consumed prefix)
    /// becomes the current best.
    fn consider(&mut self, candidate: Vec<u8>) -> bool {
        if self.exhausted() || !is_simpler(&candidate, &self.current) {
            return false;
        }
        if !self.seen.insert(candidate.clone()) {
            self.stats.cache_hits += 1;
            return false;
        }
        self.stats.calls += 1;
        match (self.predicate)(&candidate) {
            Some(consumed) if is_simpler(&consumed, &self.current) => {
                tracing::trace!(
                    from = self.current.len(),
                    to = consumed.len(),
                    "shrink candidate accepted"
                );
                self.current = consumed;
                self.stats.improvements += 1;
                true
            }
            _ => false,
        }
    }

    fn run(&mut self) {
        loop {
            self.stats.sweeps += 1;
            let before = self.stats.improvements;
            for (name, pass) in PASSES {
                if self.exhausted() {
                    break;
                }
                let improvements = self.stats.improvements;
                pass(&mut *self);
                if self.stats.improvements > improvements {
                    tracing::debug!(
                        pass = *name,
                        improvements = self.stats.improvements - improvements,
                        len = self.current.len(),
                        "shrink pass made progress"
                    );
                }
            }
            if self.stats.improvements == before || self.exhausted() {
                break;
            }
        }
    }
}

/// Shrink failing `bytes` to a local minimum under the shortlex order.
///
/// Stops at a fixed point, after `shrink_limit` improvements, or after
/// `shrink_limit * 10` executed candidates, whichever comes first.
pub fn shrink<F>(bytes: Vec<u8>, shrink_limit: usize, mut predicate: F) -> (Vec<u8>, ShrinkStats)
where
    F: FnMut(&[u8]) -> Option<Vec<u8>>,
{
    let mut shrinker = Shrinker {
        current: bytes,
        predicate: &mut predicate,
        seen: HashSet::new(),
        max_improvements: shrink_limit,
        max_calls: shrink_limit.saturating_mul(10),
        stats: ShrinkStats::default(),
    };
    shrinker.run();
    (shrinker.current, shrinker.stats)
}

fn truncate_tail(s: &mut Shrinker<'_>) {
    let len = s.current.len();
    let cuts = [0, len / 4, len / 2, len * 3 / 4, len.saturating_sub(1)];
    for keep in cuts {
        if keep < s.current.len() && s.consider(s.current[..keep].to_vec()) {
            return;
        }
    }
}

/// Every width up to `MAX_DELETE`, so an element of any encoded length can
/// be dropped together with its continue flag.
fn delete_spans(s: &mut Shrinker<'_>) {
    for size in (1..=MAX_DELETE).rev() {
        let mut at = 0;
        while at + size <= s.current.len() && !s.exhausted() {
            let mut candidate = s.current.clone();
            candidate.drain(at..at + size);
            if !s.consider(candidate) {
                at += 1;
            }
        }
    }
}

fn zero_spans(s: &mut Shrinker<'_>) {
    for size in SPAN_SIZES {
        let mut at = 0;
        while at + size <= s.current.len() && !s.exhausted() {
            if s.current[at..at + size].iter().any(|&b| b != 0) {
                let mut candidate = s.current.clone();
                candidate[at..at + size].fill(0);
                s.consider(candidate);
            }
            at += 1;
        }
    }
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn with_value(bytes: &[u8], at: usize, width: usize, value: u64) -> Vec<u8> {
    let mut out = bytes.to_vec();
    let encoded = value.to_be_bytes();
    out[at..at + width].copy_from_slice(&encoded[8 - width..]);
    out
}

/// Binary search each integer-like span toward zero.
fn minimize_integers(s: &mut Shrinker<'_>) {
    for width in INTEGER_WIDTHS {
        let mut at = 0;
        while at + width <= s.current.len() && !s.exhausted() {
            // A leading zero byte is covered by the narrower width.
            if width > 1 && s.current[at] == 0 {
                at += 1;
                continue;
            }
            let mut hi = read_be(&s.current[at..at + width]);
            let mut lo = 0;
            if hi > 0 && !s.consider(with_value(&s.current, at, width, 0)) {
                while lo + 1 < hi && !s.exhausted() {
                    if at + width > s.current.len() {
                        break;
                    }
                    let mid = lo + (hi - lo) / 2;
                    if s.consider(with_value(&s.current, at, width, mid)) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
            }
            at += 1;
        }
    }
}

fn sort_spans(s: &mut Shrinker<'_>) {
    for size in SORT_SIZES {
        let mut at = 0;
        while at + size <= s.current.len() && !s.exhausted() {
            let span = &s.current[at..at + size];
            if span.windows(2).any(|w| w[0] > w[1]) {
                let mut candidate = s.current.clone();
                candidate[at..at + size].sort_unstable();
                s.consider(candidate);
            }
            at += 1;
        }
    }
}
