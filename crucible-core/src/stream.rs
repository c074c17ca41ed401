//! Recordable byte streams that drive every generation decision.
//!
//! A stream replays a prefix first. Once the prefix is exhausted it either
//! continues with fresh pseudo-random bytes (generation mode) or overruns
//! (replay mode). Every byte handed out is recorded, so the recording of a
//! finished trial can be replayed to reproduce the exact same value.

use crate::data::Seed;
use crate::error::DrawError;
use rand::RngCore;
use std::cmp::Ordering;
use std::time::Instant;

/// A byte stream plus its cursor for one trial.
#[derive(Debug, Clone)]
pub struct ByteStream {
    prefix: Vec<u8>,
    recorded: Vec<u8>,
    rng: Option<Seed>,
    max_length: usize,
    deadline: Option<Instant>,
    overrun: bool,
    frozen: bool,
}

impl ByteStream {
    /// A stream that replays `prefix` and then draws fresh bytes from `rng`,
    /// never handing out more than `max_length` bytes in total.
    pub fn generate(prefix: Vec<u8>, rng: Seed, max_length: usize) -> Self {
        ByteStream {
            prefix,
            recorded: Vec::new(),
            rng: Some(rng),
            max_length,
            deadline: None,
            overrun: false,
            frozen: false,
        }
    }

    /// A stream that only replays `bytes` and overruns past their end.
    pub fn replay(bytes: &[u8]) -> Self {
        ByteStream {
            prefix: bytes.to_vec(),
            recorded: Vec::new(),
            rng: None,
            max_length: bytes.len(),
            deadline: None,
            overrun: false,
            frozen: false,
        }
    }

    /// Fail draws with `DrawError::Overtime` once `deadline` has passed.
    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Number of bytes consumed so far.
    pub fn cursor(&self) -> usize {
        self.recorded.len()
    }

    /// Upper bound on the cursor.
    pub fn limit(&self) -> usize {
        match self.rng {
            Some(_) => self.max_length,
            None => self.prefix.len().min(self.max_length),
        }
    }

    /// The bytes consumed so far.
    pub fn bytes(&self) -> &[u8] {
        &self.recorded
    }

    pub fn is_overrun(&self) -> bool {
        self.overrun
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Mark this stream as overrun and return the matching error.
    pub fn overrun(&mut self) -> DrawError {
        self.overrun = true;
        DrawError::Overrun
    }

    /// Stop accepting draws. The recorded bytes are final from here on.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Consume the stream, returning its recording.
    pub fn into_bytes(self) -> Vec<u8> {
        self.recorded
    }

    /// Exactly `n` bytes, or an overrun if the stream cannot supply them.
    pub fn draw_bytes(&mut self, n: usize) -> Result<Vec<u8>, DrawError> {
        if self.frozen {
            return Err(DrawError::Frozen);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(DrawError::Overtime);
            }
        }
        if self.overrun || self.cursor() + n > self.limit() {
            return Err(self.overrun());
        }

        let start = self.cursor();
        let from_prefix = self.prefix.len().saturating_sub(start).min(n);
        let mut out = Vec::with_capacity(n);
        if from_prefix > 0 {
            out.extend_from_slice(&self.prefix[start..start + from_prefix]);
        }
        if from_prefix < n {
            let mut fresh = vec![0u8; n - from_prefix];
            match self.rng.as_mut() {
                Some(rng) => rng.fill_bytes(&mut fresh),
                None => return Err(self.overrun()),
            }
            out.extend_from_slice(&fresh);
        }
        self.recorded.extend_from_slice(&out);
        Ok(out)
    }

    /// A big-endian integer of `n_bits` bits (at most 64) spread over
    /// `ceil(n_bits / 8)` bytes. All-zero bytes always decode to zero.
    pub fn draw_bits(&mut self, n_bits: u32) -> Result<u64, DrawError> {
        debug_assert!(n_bits <= 64);
        if n_bits == 0 {
            return Ok(0);
        }
        let n_bytes = n_bits.div_ceil(8) as usize;
        let bytes = self.draw_bytes(n_bytes)?;
        let value = bytes
            .iter()
            .fold(0u64, |acc, &b| acc.wrapping_shl(8) | b as u64);
        Ok(if n_bits == 64 {
            value
        } else {
            value & ((1u64 << n_bits) - 1)
        })
    }

    /// A biased coin: `true` with probability `p`. A zero byte is always
    /// `false`, and certain outcomes consume nothing.
    pub fn draw_boolean(&mut self, p: f64) -> Result<bool, DrawError> {
        if p <= 0.0 {
            return Ok(false);
        }
        if p >= 1.0 {
            return Ok(true);
        }
        let threshold = (p * 256.0).round().clamp(1.0, 255.0) as u64;
        let byte = self.draw_bits(8)?;
        Ok(byte >= 256 - threshold)
    }
}

/// Total order on byte streams by simplicity: shorter first, then bytewise.
pub fn shortlex(a: &[u8], b: &[u8]) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Whether `candidate` is strictly simpler than `current`.
pub fn is_simpler(candidate: &[u8], current: &[u8]) -> bool {
    shortlex(candidate, current) == Ordering::Less
}
