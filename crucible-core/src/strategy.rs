//! Strategy combinators for property-based testing.
//!
//! A strategy is an explicit, first-class draw function from a byte stream
//! to a value. Strategies compose with combinators; every encoding they use is
//! prefix-free, so trimming or zeroing bytes yields a simpler value or an
//! overrun, never an unrelated value.

use crate::error::DrawError;
use crate::stream::ByteStream;
use std::rc::Rc;

pub mod collections;
pub mod numeric;

pub use collections::*;
pub use numeric::*;

type DrawFn<T> = Rc<dyn Fn(&mut ByteStream) -> Result<T, DrawError>>;

/// How many times a filtered strategy redraws before giving up on a trial.
const FILTER_ATTEMPTS: usize = 3;

/// A generator for test data of type `T`.
pub struct Strategy<T> {
    draw_fn: DrawFn<T>,
}

impl<T> Clone for Strategy<T> {
    fn clone(&self) -> Self {
        Strategy {
            draw_fn: Rc::clone(&self.draw_fn),
        }
    }
}

impl<T> Strategy<T> {
    /// Create a new strategy from a draw function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut ByteStream) -> Result<T, DrawError> + 'static,
    {
        Strategy {
            draw_fn: Rc::new(f),
        }
    }

    /// Draw a value, consuming bytes from `stream`.
    pub fn draw(&self, stream: &mut ByteStream) -> Result<T, DrawError> {
        (self.draw_fn)(stream)
    }

    /// Create a strategy that always produces the same value.
    pub fn constant(value: T) -> Self
    where
        T: Clone + 'static,
    {
        Strategy::new(move |_stream| Ok(value.clone()))
    }
}

impl<T> Strategy<T>
where
    T: 'static,
{
    /// Map a function over the drawn values.
    pub fn map<U, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> U + 'static,
        U: 'static,
    {
        Strategy::new(move |stream| self.draw(stream).map(&f))
    }

    /// Bind/flatmap for dependent generation: the second strategy is chosen
    /// by the first value and draws from the same stream right after it.
    pub fn flat_map<U, F>(self, f: F) -> Strategy<U>
    where
        F: Fn(T) -> Strategy<U> + 'static,
        U: 'static,
    {
        Strategy::new(move |stream| {
            let value = self.draw(stream)?;
            f(value).draw(stream)
        })
    }

    /// Keep only values satisfying `predicate`. After a few rejected draws
    /// the trial is marked invalid.
    pub fn filter<F>(self, predicate: F) -> Strategy<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        Strategy::new(move |stream| {
            for _ in 0..FILTER_ATTEMPTS {
                let value = self.draw(stream)?;
                if predicate(&value) {
                    return Ok(value);
                }
            }
            Err(DrawError::Invalid(format!(
                "filter rejected {FILTER_ATTEMPTS} draws in a row"
            )))
        })
    }

    /// Draw from `self` then from `other`.
    pub fn zip<U>(self, other: Strategy<U>) -> Strategy<(T, U)>
    where
        U: 'static,
    {
        Strategy::new(move |stream| Ok((self.draw(stream)?, other.draw(stream)?)))
    }
}

/// A strategy that always produces `value`.
pub fn just<T: Clone + 'static>(value: T) -> Strategy<T> {
    Strategy::constant(value)
}

/// Draw from one of `strategies`, shrinking toward the first.
///
/// With no alternatives every draw is invalid.
pub fn one_of<T: 'static>(strategies: Vec<Strategy<T>>) -> Strategy<T> {
    Strategy::new(move |stream| {
        if strategies.is_empty() {
            return Err(DrawError::Invalid("one_of has no alternatives".to_string()));
        }
        let index = draw_index(stream, strategies.len())?;
        strategies[index].draw(stream)
    })
}

/// Pick one of `values`, shrinking toward the first.
pub fn sampled_from<T: Clone + 'static>(values: Vec<T>) -> Strategy<T> {
    Strategy::new(move |stream| {
        if values.is_empty() {
            return Err(DrawError::Invalid(
                "sampled_from has no values".to_string(),
            ));
        }
        let index = draw_index(stream, values.len())?;
        Ok(values[index].clone())
    })
}

/// `None` or a value from `inner`; shrinks toward `None`.
pub fn optional<T: 'static>(inner: Strategy<T>) -> Strategy<Option<T>> {
    Strategy::new(move |stream| {
        if stream.draw_boolean(0.75)? {
            inner.draw(stream).map(Some)
        } else {
            Ok(None)
        }
    })
}

pub fn tuple_of<A: 'static, B: 'static>(a: Strategy<A>, b: Strategy<B>) -> Strategy<(A, B)> {
    a.zip(b)
}

pub fn triple_of<A: 'static, B: 'static, C: 'static>(
    a: Strategy<A>,
    b: Strategy<B>,
    c: Strategy<C>,
) -> Strategy<(A, B, C)> {
    Strategy::new(move |stream| Ok((a.draw(stream)?, b.draw(stream)?, c.draw(stream)?)))
}

/// Types with a canonical strategy.
pub trait Arbitrary: Sized + 'static {
    fn arbitrary() -> Strategy<Self>;
}

/// The canonical strategy for `T`.
pub fn any<T: Arbitrary>() -> Strategy<T> {
    T::arbitrary()
}

impl Arbitrary for () {
    fn arbitrary() -> Strategy<Self> {
        just(())
    }
}

impl Arbitrary for bool {
    fn arbitrary() -> Strategy<Self> {
        booleans()
    }
}

impl<T: Arbitrary> Arbitrary for Option<T> {
    fn arbitrary() -> Strategy<Self> {
        optional(any::<T>())
    }
}

impl<A: Arbitrary, B: Arbitrary> Arbitrary for (A, B) {
    fn arbitrary() -> Strategy<Self> {
        tuple_of(any::<A>(), any::<B>())
    }
}

impl<A: Arbitrary, B: Arbitrary, C: Arbitrary> Arbitrary for (A, B, C) {
    fn arbitrary() -> Strategy<Self> {
        triple_of(any::<A>(), any::<B>(), any::<C>())
    }
}
