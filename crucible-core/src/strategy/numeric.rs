//! Integer, boolean and float strategies.
//!
//! Integers shrink toward zero (or the bound closest to it). Floats use a
//! lexicographic encoding where small, simple values sit at small byte
//! values: non-negative integral floats first, then fractions ordered by
//! exponent with the mantissa bits reversed.

use super::{Arbitrary, Strategy};
use crate::error::DrawError;
use crate::stream::ByteStream;
use std::sync::OnceLock;

/// Bit widths an unbounded-looking magnitude is drawn at. Small first.
const MAGNITUDE_WIDTHS: [u32; 4] = [8, 16, 32, 64];

/// Probability of drawing from `NASTY_FLOATS` instead of the encoding.
const NASTY_FLOAT_PROBABILITY: f64 = 0.05;

const NASTY_FLOATS: [f64; 16] = [
    0.5,
    1.1,
    1.5,
    1.9,
    1.0 / 3.0,
    10e6,
    10e-6,
    1.175494351e-38,
    f64::MIN_POSITIVE,
    f64::MAX,
    f32::MAX as f64,
    9007199254740992.0,
    1.0 - 10e-6,
    2.0 + 10e-6,
    f64::EPSILON,
    f64::INFINITY,
];

/// Integer in `[0, max]` by rejection sampling on the smallest covering bit
/// width. Zero bytes always decode to zero, so the loop ends on replay.
pub fn draw_bounded(stream: &mut ByteStream, max: u64) -> Result<u64, DrawError> {
    if max == 0 {
        return Ok(0);
    }
    let bits = 64 - max.leading_zeros();
    loop {
        let probe = stream.draw_bits(bits)?;
        if probe <= max {
            return Ok(probe);
        }
    }
}

/// Index into a collection of `len` items.
pub fn draw_index(stream: &mut ByteStream, len: usize) -> Result<usize, DrawError> {
    debug_assert!(len > 0);
    Ok(draw_bounded(stream, len.saturating_sub(1) as u64)? as usize)
}

/// A magnitude in `[0, max]`, biased toward small values for wide ranges.
fn draw_magnitude(stream: &mut ByteStream, max: u64) -> Result<u64, DrawError> {
    if max <= u8::MAX as u64 {
        return draw_bounded(stream, max);
    }
    let needed = 64 - max.leading_zeros();
    let widths: Vec<u32> = MAGNITUDE_WIDTHS
        .iter()
        .copied()
        .take_while(|&w| w < needed)
        .chain(std::iter::once(needed))
        .collect();
    let width = widths[draw_index(stream, widths.len())?];
    let candidate = stream.draw_bits(width)?;
    if candidate <= max {
        Ok(candidate)
    } else {
        draw_bounded(stream, max)
    }
}

/// Integer in `[min, max]` shrinking toward the value closest to zero.
pub fn draw_integer(stream: &mut ByteStream, min: i128, max: i128) -> Result<i128, DrawError> {
    if min > max {
        return Err(DrawError::Invalid(format!(
            "empty integer range [{min}, {max}]"
        )));
    }
    if min == max {
        return Ok(min);
    }
    let origin = 0i128.clamp(min, max);
    let above = (max - origin) as u64;
    let below = (origin - min) as u64;
    let negative = match (above, below) {
        (0, _) => true,
        (_, 0) => false,
        _ => stream.draw_boolean(0.5)?,
    };
    if negative {
        Ok(origin - draw_magnitude(stream, below)? as i128)
    } else {
        Ok(origin + draw_magnitude(stream, above)? as i128)
    }
}

/// Primitive integer types with a full-range strategy.
pub trait Integer: Copy + PartialOrd + std::fmt::Debug + 'static {
    const MIN: Self;
    const MAX: Self;
    fn to_i128(self) -> i128;
    fn from_i128(value: i128) -> Self;
}

macro_rules! impl_integer {
    ($($t:ty),*) => {
        $(
            impl Integer for $t {
                const MIN: Self = <$t>::MIN;
                const MAX: Self = <$t>::MAX;

                fn to_i128(self) -> i128 {
                    self as i128
                }

                fn from_i128(value: i128) -> Self {
                    value as $t
                }
            }

            impl Arbitrary for $t {
                fn arbitrary() -> Strategy<Self> {
                    integers(<$t>::MIN, <$t>::MAX)
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Integers in the inclusive range `[min, max]`.
pub fn integers<T: Integer>(min: T, max: T) -> Strategy<T> {
    let (lo, hi) = (min.to_i128(), max.to_i128());
    Strategy::new(move |stream| draw_integer(stream, lo, hi).map(T::from_i128))
}

/// Fair booleans, shrinking to `false`.
pub fn booleans() -> Strategy<bool> {
    weighted(0.5)
}

/// Booleans that are `true` with probability `p`.
pub fn weighted(p: f64) -> Strategy<bool> {
    Strategy::new(move |stream| stream.draw_boolean(p))
}

/// Constraints for float generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatOptions {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub allow_nan: bool,
    pub allow_infinity: bool,
}

impl Default for FloatOptions {
    fn default() -> Self {
        FloatOptions {
            min: None,
            max: None,
            allow_nan: false,
            allow_infinity: false,
        }
    }
}

impl FloatOptions {
    pub fn between(min: f64, max: f64) -> Self {
        FloatOptions {
            min: Some(min),
            max: Some(max),
            ..FloatOptions::default()
        }
    }

    fn permits(&self, value: f64) -> bool {
        if value.is_nan() {
            return self.allow_nan;
        }
        if value.is_infinite() && !self.allow_infinity {
            return false;
        }
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }
}

/// Finite floats, no bounds.
pub fn finite_floats() -> Strategy<f64> {
    floats(FloatOptions::default())
}

/// Floats satisfying `options`.
pub fn floats(options: FloatOptions) -> Strategy<f64> {
    Strategy::new(move |stream| draw_float(stream, &options))
}

fn draw_float(stream: &mut ByteStream, options: &FloatOptions) -> Result<f64, DrawError> {
    if let (Some(min), Some(max)) = (options.min, options.max) {
        if min.is_finite() && max.is_finite() {
            return draw_bounded_float(stream, min, max);
        }
    }

    if stream.draw_boolean(NASTY_FLOAT_PROBABILITY)? {
        let candidates: Vec<f64> = NASTY_FLOATS
            .iter()
            .flat_map(|&x| [x, -x])
            .filter(|&x| options.permits(x))
            .collect();
        if !candidates.is_empty() {
            return Ok(candidates[draw_index(stream, candidates.len())?]);
        }
    }

    let negative = stream.draw_boolean(0.5)?;
    let magnitude = lex_to_float(stream.draw_bits(64)?);
    let value = match (options.min, options.max) {
        (Some(min), None) => min + magnitude,
        (None, Some(max)) => max - magnitude,
        _ if negative => -magnitude,
        _ => magnitude,
    };
    if options.permits(value) {
        Ok(value)
    } else {
        Err(DrawError::Invalid(format!(
            "float {value} outside the permitted values"
        )))
    }
}

/// Uniform-ish float in a finite range, shrinking toward the point closest
/// to zero.
fn draw_bounded_float(stream: &mut ByteStream, min: f64, max: f64) -> Result<f64, DrawError> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(DrawError::Invalid(format!("empty float range [{min}, {max}]")));
    }
    if min == max {
        return Ok(min);
    }
    let origin = 0f64.clamp(min, max);
    let negative = if origin == max {
        true
    } else if origin == min {
        false
    } else {
        stream.draw_boolean(0.5)?
    };
    let fraction = stream.draw_bits(53)? as f64 / (1u64 << 53) as f64;
    let far = if negative { min } else { max };
    let value = origin * (1.0 - fraction) + far * fraction;
    Ok(value.clamp(min, max))
}

impl Arbitrary for f64 {
    fn arbitrary() -> Strategy<Self> {
        finite_floats()
    }
}

impl Arbitrary for f32 {
    fn arbitrary() -> Strategy<Self> {
        floats(FloatOptions {
            min: Some(f32::MIN as f64),
            max: Some(f32::MAX as f64),
            ..FloatOptions::default()
        })
        .map(|x| x as f32)
    }
}

const MANTISSA_BITS: u32 = 52;
const MANTISSA_MASK: u64 = (1 << MANTISSA_BITS) - 1;
const MAX_EXPONENT: u32 = 0x7ff;
const BIAS: i64 = 1023;
/// Integral floats below 2^56 are encoded directly.
const SIMPLE_BITS: u32 = 56;

/// Exponents in encoding order: non-negative unbiased exponents ascending,
/// then negative ones by increasing magnitude, then infinity/NaN last.
fn exponent_order() -> &'static [u32] {
    static ORDER: OnceLock<Vec<u32>> = OnceLock::new();
    ORDER.get_or_init(|| {
        let mut exponents: Vec<u32> = (0..=MAX_EXPONENT).collect();
        exponents.sort_by_key(|&e| {
            let unbiased = e as i64 - BIAS;
            if e == MAX_EXPONENT {
                u64::MAX
            } else if unbiased < 0 {
                (10_000 - unbiased) as u64
            } else {
                unbiased as u64
            }
        });
        exponents
    })
}

fn reverse_low_bits(x: u64, n: u32) -> u64 {
    if n == 0 {
        0
    } else {
        x.reverse_bits() >> (64 - n)
    }
}

/// Reverse the fractional bits of the mantissa so that, within an exponent,
/// values with fewer fractional bits come first.
fn update_mantissa(unbiased_exponent: i64, mantissa: u64) -> u64 {
    if unbiased_exponent <= 0 {
        reverse_low_bits(mantissa, MANTISSA_BITS)
    } else if unbiased_exponent <= MANTISSA_BITS as i64 {
        let fractional_bits = MANTISSA_BITS - unbiased_exponent as u32;
        let fractional_mask = (1u64 << fractional_bits) - 1;
        let fractional = mantissa & fractional_mask;
        (mantissa & !fractional_mask) | reverse_low_bits(fractional, fractional_bits)
    } else {
        mantissa
    }
}

/// Decode a lexicographically ordered 64-bit value into a non-negative float.
pub fn lex_to_float(i: u64) -> f64 {
    if i >> 63 == 0 {
        return (i & ((1u64 << SIMPLE_BITS) - 1)) as f64;
    }
    let index = ((i >> MANTISSA_BITS) & MAX_EXPONENT as u64) as usize;
    let exponent = exponent_order()[index] as u64;
    let mantissa = update_mantissa(exponent as i64 - BIAS, i & MANTISSA_MASK);
    f64::from_bits((exponent << MANTISSA_BITS) | mantissa)
}
