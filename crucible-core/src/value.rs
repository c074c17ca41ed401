//! Dynamically typed argument values and their validation.
//!
//! `target` accepts "anything" at its boundary and checks the shape at
//! runtime, so callers can forward values they did not produce themselves
//! (for example, values drawn from another strategy) and get a descriptive
//! `InvalidArgument` back instead of a type error at a distance.

use crate::error::{CrucibleError, Result};
use std::fmt;

/// A tagged union of the argument shapes `target` may be handed.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "{b:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x as f64)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(i: $t) -> Self {
                    Value::Int(i as i128)
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::None, Into::into)
    }
}

/// Check that `value` is a usable target observation.
///
/// Only floats are accepted. NaN is always rejected; infinities only pass
/// when `allow_infinite` is set.
pub fn validate_observation(value: &Value, allow_infinite: bool) -> Result<f64> {
    match value {
        Value::Float(x) if x.is_nan() => Err(CrucibleError::InvalidArgument(
            "target observation must not be NaN".to_string(),
        )),
        Value::Float(x) if x.is_infinite() && !allow_infinite => {
            Err(CrucibleError::InvalidArgument(format!(
                "target observation must be finite, got {x}"
            )))
        }
        Value::Float(x) => Ok(*x),
        other => Err(CrucibleError::InvalidArgument(format!(
            "target observation must be a float, got {} {}",
            other.kind(),
            other
        ))),
    }
}

/// Check that `value` is a usable target label (text only).
pub fn validate_label(value: &Value) -> Result<String> {
    match value {
        Value::Text(label) => Ok(label.clone()),
        other => Err(CrucibleError::InvalidArgument(format!(
            "target label must be text, got {} {}",
            other.kind(),
            other
        ))),
    }
}
