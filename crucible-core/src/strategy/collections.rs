//! Collection and text strategies.

use super::numeric::{draw_bounded, draw_index};
use super::{any, Arbitrary, Strategy};
use crate::error::DrawError;
use crate::stream::ByteStream;

/// Printable ASCII starting at '0', so that zero bytes shrink to "0".
const PRINTABLE_START: u32 = '0' as u32;
const PRINTABLE_LOW: u32 = 0x20;
const PRINTABLE_HIGH: u32 = 0x7e;

const SURROGATE_START: u32 = 0xd800;
const SURROGATE_COUNT: u32 = 0x800;

/// Probability a drawn character leaves the printable ASCII range.
const NON_ASCII_PROBABILITY: f64 = 0.2;

/// Decides, one element at a time, whether a collection keeps growing.
///
/// Every optional element is preceded by a continue flag, so deleting the
/// flag together with the element's bytes drops exactly that element, and a
/// zero flag ends the collection.
#[derive(Debug, Clone)]
pub struct Many {
    min_size: usize,
    max_size: usize,
    p_continue: f64,
    count: usize,
}

impl Many {
    pub fn new(min_size: usize, max_size: usize) -> Self {
        let average = ((min_size * 2).max(min_size + 5) as f64)
            .min(0.5 * (min_size as f64 + max_size as f64));
        let expected_extra = (average - min_size as f64).max(0.0);
        Many {
            min_size,
            max_size,
            p_continue: 1.0 - 1.0 / (1.0 + expected_extra),
            count: 0,
        }
    }

    /// Whether another element should be drawn.
    pub fn more(&mut self, stream: &mut ByteStream) -> Result<bool, DrawError> {
        let more = if self.count < self.min_size {
            true
        } else if self.count >= self.max_size {
            false
        } else {
            stream.draw_boolean(self.p_continue)?
        };
        if more {
            self.count += 1;
        }
        Ok(more)
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

/// Vectors of `element` with length in `[min_size, max_size]`, shrinking
/// toward shorter vectors of simpler elements.
pub fn vecs<T: 'static>(
    element: Strategy<T>,
    min_size: usize,
    max_size: usize,
) -> Strategy<Vec<T>> {
    Strategy::new(move |stream| {
        if min_size > max_size {
            return Err(DrawError::Invalid(format!(
                "empty size range [{min_size}, {max_size}]"
            )));
        }
        let mut many = Many::new(min_size, max_size);
        let mut out = Vec::new();
        while many.more(stream)? {
            out.push(element.draw(stream)?);
        }
        Ok(out)
    })
}

fn draw_char(stream: &mut ByteStream) -> Result<char, DrawError> {
    let code = if stream.draw_boolean(NON_ASCII_PROBABILITY)? {
        let index = draw_bounded(stream, (char::MAX as u32 - SURROGATE_COUNT) as u64)? as u32;
        if index >= SURROGATE_START {
            index + SURROGATE_COUNT
        } else {
            index
        }
    } else {
        let span = PRINTABLE_HIGH - PRINTABLE_LOW + 1;
        let offset = draw_bounded(stream, (span - 1) as u64)? as u32;
        PRINTABLE_LOW + (PRINTABLE_START - PRINTABLE_LOW + offset) % span
    };
    char::from_u32(code).ok_or_else(|| DrawError::Invalid(format!("no char for {code:#x}")))
}

/// Any unicode scalar value, mostly printable ASCII; shrinks toward '0'.
pub fn chars() -> Strategy<char> {
    Strategy::new(draw_char)
}

/// Strings of `chars()` with `[min_size, max_size]` characters.
pub fn text(min_size: usize, max_size: usize) -> Strategy<String> {
    vecs(chars(), min_size, max_size).map(|cs| cs.into_iter().collect())
}

/// Strings over a fixed alphabet; shrinks toward the first character.
pub fn text_from(alphabet: Vec<char>, min_size: usize, max_size: usize) -> Strategy<String> {
    let letter = Strategy::new(move |stream: &mut ByteStream| {
        if alphabet.is_empty() {
            return Err(DrawError::Invalid("empty alphabet".to_string()));
        }
        Ok(alphabet[draw_index(stream, alphabet.len())?])
    });
    vecs(letter, min_size, max_size).map(|cs| cs.into_iter().collect())
}

impl Arbitrary for char {
    fn arbitrary() -> Strategy<Self> {
        chars()
    }
}

impl Arbitrary for String {
    fn arbitrary() -> Strategy<Self> {
        text(0, usize::MAX)
    }
}

impl<T: Arbitrary> Arbitrary for Vec<T> {
    fn arbitrary() -> Strategy<Self> {
        vecs(any::<T>(), 0, usize::MAX)
    }
}
