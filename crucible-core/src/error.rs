//! Error types for Crucible property testing.

use std::fmt;
use thiserror::Error;

/// Main error type for Crucible property testing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrucibleError {
    /// The caller passed a value of the wrong type or shape, or called a
    /// trial-only function outside of a running trial.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Property test failed with a (shrunk) counterexample.
    #[error("{0}")]
    PropertyFailed(Box<FailureReport>),

    /// A failure did not reproduce when its bytes were replayed.
    #[error("Flaky property: {message}")]
    Flaky { message: String },

    /// Too many trials were invalid or overran before enough valid ones ran.
    #[error(
        "Unable to generate valid examples ({valid} valid, {invalid} invalid, {overruns} overruns)"
    )]
    Unsatisfiable {
        valid: usize,
        invalid: usize,
        overruns: usize,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Result type for Crucible operations.
pub type Result<T> = std::result::Result<T, CrucibleError>;

/// Why a draw from a byte stream could not produce a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// The stream ran out of bytes.
    #[error("byte stream overrun")]
    Overrun,

    /// No valid value exists for this byte content.
    #[error("invalid draw: {0}")]
    Invalid(String),

    /// The per-trial deadline passed while drawing.
    #[error("trial exceeded its deadline")]
    Overtime,

    /// The stream was frozen when its trial completed.
    #[error("draw from a frozen byte stream")]
    Frozen,
}

/// Error a property returns to end its trial early.
#[derive(Error, Debug)]
pub enum PropertyError {
    /// The property does not hold for this input.
    #[error("{0}")]
    Failed(String),

    /// The input does not satisfy an assumption; the trial is discarded.
    #[error("test case rejected")]
    Rejected,

    /// An interactive draw inside the property failed.
    #[error(transparent)]
    Draw(#[from] DrawError),

    /// Misuse of the API; aborts the run.
    #[error(transparent)]
    Crucible(#[from] CrucibleError),
}

impl PropertyError {
    /// Fail the current trial with a message.
    pub fn fail(message: impl Into<String>) -> Self {
        PropertyError::Failed(message.into())
    }
}

/// Outcome type returned by property functions.
pub type PropertyResult = std::result::Result<(), PropertyError>;

/// Where a failure came from. Shrinking only accepts candidates that fail the
/// same way as the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureOrigin {
    /// The property returned a failure (or `false`).
    Returned,
    /// The property panicked at this location.
    Panic { file: String, line: u32 },
}

impl fmt::Display for FailureOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureOrigin::Returned => write!(f, "returned failure"),
            FailureOrigin::Panic { file, line } => write!(f, "panic at {file}:{line}"),
        }
    }
}

/// Everything the engine knows about a confirmed, minimized failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureReport {
    /// `Debug` rendering of the minimal counterexample.
    pub counterexample: String,
    /// The minimal byte stream; replay it with `Property::reproduce`.
    pub bytes: Vec<u8>,
    /// The failure message (panic payload or returned message).
    pub message: String,
    pub origin: FailureOrigin,
    /// Notes recorded by the property during the minimal trial.
    pub notes: Vec<String>,
    pub tests_run: usize,
    pub shrinks_performed: usize,
    /// Seed of the run; `None` when the failure came from an explicit example.
    pub seed: Option<u64>,
    pub property_name: Option<String>,
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.property_name.as_deref().unwrap_or("property");
        write!(
            f,
            "{} failed after {} tests and {} shrinks: {} ({})",
            name, self.tests_run, self.shrinks_performed, self.counterexample, self.message
        )
    }
}
