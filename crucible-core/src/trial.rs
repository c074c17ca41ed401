//! Trials: one execution of a property against one byte stream.
//!
//! The property receives a `TestCase` handle for the running trial. The
//! handle is how it reports target observations, notes and events, rejects
//! inputs, and draws more data. For code that cannot thread the handle
//! through, a thread-local ambient slot is set up for the duration of each
//! trial and backs the free `target` functions.

use crate::data::Config;
use crate::error::{CrucibleError, DrawError, FailureOrigin, PropertyError, PropertyResult, Result};
use crate::stream::ByteStream;
use crate::strategy::Strategy;
use crate::unwind;
use crate::value::{validate_label, validate_observation, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Classification of a finished trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// The byte stream ran out.
    Overrun,
    /// The input was rejected or could not be drawn.
    Invalid,
    /// The property held.
    Valid,
    /// The property failed.
    Interesting(FailureOrigin),
}

impl Status {
    pub fn is_interesting(&self) -> bool {
        matches!(self, Status::Interesting(_))
    }
}

/// Handle to the running trial, passed to the property.
#[derive(Debug)]
pub struct TestCase {
    stream: ByteStream,
    observations: Vec<(f64, String)>,
    /// Call stamps parallel to `observations`.
    stamps: Vec<u64>,
    notes: Vec<String>,
    events: Vec<String>,
    description: Option<String>,
    allow_infinite: bool,
    active: bool,
}

impl TestCase {
    pub(crate) fn new(stream: ByteStream, allow_infinite: bool) -> Self {
        TestCase {
            stream,
            observations: Vec::new(),
            stamps: Vec::new(),
            notes: Vec::new(),
            events: Vec::new(),
            description: None,
            allow_infinite,
            active: true,
        }
    }

    /// Draw a value from `strategy` in the middle of the property.
    pub fn draw<T>(&mut self, strategy: &Strategy<T>) -> std::result::Result<T, DrawError> {
        strategy.draw(&mut self.stream)
    }

    /// Discard the trial unless `condition` holds.
    pub fn assume(&self, condition: bool) -> PropertyResult {
        if condition {
            Ok(())
        } else {
            Err(PropertyError::Rejected)
        }
    }

    /// Report an observation under the empty label.
    pub fn target(&mut self, observation: impl Into<Value>) -> Result<()> {
        self.target_labelled(observation, "")
    }

    /// Report an observation to be maximized under `label`.
    ///
    /// The observation must be a finite float and the label must be text;
    /// anything else is `InvalidArgument`. Repeated calls with one label keep
    /// the last value for ranking.
    pub fn target_labelled(
        &mut self,
        observation: impl Into<Value>,
        label: impl Into<Value>,
    ) -> Result<()> {
        let (observation, label) =
            validate_target(&observation.into(), &label.into(), self.allow_infinite)?;
        if !self.active {
            return Err(outside_trial());
        }
        self.observations.push((observation, label));
        self.stamps.push(next_stamp());
        Ok(())
    }

    /// Attach a message to this trial, reported if it ends up minimal.
    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }

    /// Count an event for the run's statistics.
    pub fn event(&mut self, label: impl Into<String>) {
        self.events.push(label.into());
    }

    /// Observations reported through this handle, in call order.
    pub fn observations(&self) -> &[(f64, String)] {
        &self.observations
    }

    pub fn stream(&self) -> &ByteStream {
        &self.stream
    }

    pub(crate) fn describe(&mut self, description: String) {
        self.description = Some(description);
    }
}

fn validate_target(
    observation: &Value,
    label: &Value,
    allow_infinite: bool,
) -> Result<(f64, String)> {
    let observation = validate_observation(observation, allow_infinite)?;
    let label = validate_label(label)?;
    Ok((observation, label))
}

fn outside_trial() -> CrucibleError {
    CrucibleError::InvalidArgument("target() called outside of a running trial".to_string())
}

/// Collapse observations so each label keeps its last value.
pub fn final_observations(observations: &[(f64, String)]) -> BTreeMap<String, f64> {
    observations
        .iter()
        .map(|(value, label)| (label.clone(), *value))
        .collect()
}

struct Ambient {
    observations: Vec<(u64, f64, String)>,
    allow_infinite: bool,
}

thread_local! {
    static AMBIENT: RefCell<Vec<Ambient>> = const { RefCell::new(Vec::new()) };
    static STAMP: Cell<u64> = const { Cell::new(0) };
}

/// Thread-wide call counter ordering handle and free-function observations.
fn next_stamp() -> u64 {
    STAMP.with(|stamp| {
        let next = stamp.get();
        stamp.set(next + 1);
        next
    })
}

/// Ambient trial slot for the current thread. Entering pushes a fresh slot;
/// finishing or dropping pops it, so nested runs stay isolated.
struct TrialScope {
    finished: bool,
}

impl TrialScope {
    fn enter(allow_infinite: bool) -> Self {
        AMBIENT.with(|stack| {
            stack.borrow_mut().push(Ambient {
                observations: Vec::new(),
                allow_infinite,
            })
        });
        TrialScope { finished: false }
    }

    fn finish(mut self) -> Vec<(u64, f64, String)> {
        self.finished = true;
        AMBIENT
            .with(|stack| stack.borrow_mut().pop())
            .map(|ambient| ambient.observations)
            .unwrap_or_default()
    }
}

impl Drop for TrialScope {
    fn drop(&mut self) {
        if !self.finished {
            AMBIENT.with(|stack| stack.borrow_mut().pop());
        }
    }
}

/// Report an observation for the running trial under the empty label.
///
/// Fails with `InvalidArgument` when no trial is running on this thread.
pub fn target(observation: impl Into<Value>) -> Result<()> {
    target_labelled(observation, "")
}

/// Report a labelled observation for the running trial.
pub fn target_labelled(observation: impl Into<Value>, label: impl Into<Value>) -> Result<()> {
    let (observation, label) = (observation.into(), label.into());
    AMBIENT.with(|stack| {
        let mut stack = stack.borrow_mut();
        let ambient = stack.last_mut().ok_or_else(outside_trial)?;
        let (observation, label) =
            validate_target(&observation, &label, ambient.allow_infinite)?;
        ambient.observations.push((next_stamp(), observation, label));
        Ok(())
    })
}

/// Record of one completed trial.
#[derive(Debug, Clone)]
pub struct Trial {
    /// The frozen input stream.
    pub stream: ByteStream,
    pub status: Status,
    /// `Debug` rendering of the drawn value, when the draw succeeded.
    pub value: Option<String>,
    /// Failure or rejection message.
    pub message: Option<String>,
    pub observations: Vec<(f64, String)>,
    pub notes: Vec<String>,
    pub events: Vec<String>,
    pub elapsed: Duration,
    /// The trial passed but ran past the deadline.
    pub too_slow: bool,
    /// API misuse inside the property; the run must stop and surface it.
    pub usage_error: Option<CrucibleError>,
}

impl Trial {
    pub fn bytes(&self) -> &[u8] {
        self.stream.bytes()
    }
}

/// Interleave handle and ambient observations back into call order.
fn merge_observations(
    handle: Vec<(f64, String)>,
    stamps: Vec<u64>,
    ambient: Vec<(u64, f64, String)>,
) -> Vec<(f64, String)> {
    let mut all: Vec<(u64, f64, String)> = stamps
        .into_iter()
        .zip(handle)
        .map(|(stamp, (observation, label))| (stamp, observation, label))
        .chain(ambient)
        .collect();
    all.sort_by_key(|(stamp, _, _)| *stamp);
    all.into_iter()
        .map(|(_, observation, label)| (observation, label))
        .collect()
}

/// Run `body` as one trial on `stream`, catching panics and classifying the
/// outcome.
pub(crate) fn execute<F>(stream: ByteStream, config: &Config, body: F) -> Trial
where
    F: FnOnce(&mut TestCase) -> PropertyResult,
{
    let started = Instant::now();
    let deadline = config.deadline.map(|d| started + d);
    let mut case = TestCase::new(
        stream.with_deadline(deadline),
        config.allow_infinite_observations,
    );

    let scope = TrialScope::enter(config.allow_infinite_observations);
    let outcome = unwind::catch_silent(|| body(&mut case));
    let ambient = scope.finish();
    let elapsed = started.elapsed();

    case.active = false;
    case.stream.freeze();
    let observations = merge_observations(
        std::mem::take(&mut case.observations),
        std::mem::take(&mut case.stamps),
        ambient,
    );

    let overtime = config.deadline.is_some_and(|d| elapsed > d);
    let mut too_slow = false;
    let mut usage_error = None;
    let (status, message) = match outcome {
        Ok(Ok(())) if overtime => {
            too_slow = true;
            (Status::Invalid, Some(format!("trial took {elapsed:?}")))
        }
        Ok(Ok(())) => (Status::Valid, None),
        Ok(Err(PropertyError::Failed(message))) => {
            (Status::Interesting(FailureOrigin::Returned), Some(message))
        }
        Ok(Err(PropertyError::Rejected)) => (Status::Invalid, None),
        Ok(Err(PropertyError::Draw(DrawError::Overrun))) => (Status::Overrun, None),
        Ok(Err(PropertyError::Draw(DrawError::Overtime))) => {
            too_slow = true;
            (Status::Invalid, Some(format!("trial took {elapsed:?}")))
        }
        Ok(Err(PropertyError::Draw(err))) => (Status::Invalid, Some(err.to_string())),
        Ok(Err(PropertyError::Crucible(err))) => {
            let message = err.to_string();
            usage_error = Some(err);
            (Status::Invalid, Some(message))
        }
        Err(panic) => (
            Status::Interesting(FailureOrigin::Panic {
                file: panic.file,
                line: panic.line,
            }),
            Some(panic.message),
        ),
    };

    Trial {
        stream: case.stream,
        status,
        value: case.description,
        message,
        observations,
        notes: case.notes,
        events: case.events,
        elapsed,
        too_slow,
        usage_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Seed;
    use crate::strategy::integers;

    fn fresh() -> ByteStream {
        ByteStream::generate(Vec::new(), Seed::from_u64(1), 1024)
    }

    #[test]
    fn test_target_accepts_finite_float_and_text() {
        let mut case = TestCase::new(fresh(), false);
        case.target(0.0).unwrap();
        case.target_labelled(1.5, "a").unwrap();
        assert_eq!(
            case.observations(),
            &[(0.0, String::new()), (1.5, "a".to_string())]
        );
    }

    #[test]
    fn test_target_without_label_matches_empty_label() {
        let mut implicit = TestCase::new(fresh(), false);
        let mut explicit = TestCase::new(fresh(), false);
        implicit.target(2.0).unwrap();
        explicit.target_labelled(2.0, "").unwrap();
        assert_eq!(implicit.observations(), explicit.observations());
    }

    #[test]
    fn test_target_rejects_bad_arguments() {
        let mut case = TestCase::new(fresh(), false);
        assert!(case.target(f64::NAN).is_err());
        assert!(case.target(f64::INFINITY).is_err());
        assert!(case.target(f64::NEG_INFINITY).is_err());
        assert!(case.target("1").is_err());
        assert!(case.target_labelled(0.0, vec!["x"]).is_err());
        assert!(case.observations().is_empty());
    }

    #[test]
    fn test_last_observation_per_label_wins() {
        let mut case = TestCase::new(fresh(), false);
        for i in 0..10 {
            case.target_labelled(i as f64, "same").unwrap();
        }
        let finals = final_observations(case.observations());
        assert_eq!(finals.len(), 1);
        assert_eq!(finals["same"], 9.0);
    }

    #[test]
    fn test_free_target_outside_trial_is_invalid_argument() {
        assert!(matches!(
            target(0.0),
            Err(CrucibleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_free_target_inside_trial_is_recorded() {
        let trial = execute(fresh(), &Config::default(), |_case| {
            target(3.0)?;
            target_labelled(4.0, "x")?;
            Ok(())
        });
        assert_eq!(trial.status, Status::Valid);
        assert_eq!(
            trial.observations,
            vec![(3.0, String::new()), (4.0, "x".to_string())]
        );
        // The scope is torn down afterwards.
        assert!(target(0.0).is_err());
    }

    #[test]
    fn test_mixed_target_paths_keep_call_order() {
        let trial = execute(fresh(), &Config::default(), |case| {
            case.target_labelled(1.0, "a")?;
            target_labelled(2.0, "a")?;
            case.target_labelled(3.0, "a")?;
            target(4.0)?;
            case.target(5.0)?;
            Ok(())
        });
        assert_eq!(
            trial.observations,
            vec![
                (1.0, "a".to_string()),
                (2.0, "a".to_string()),
                (3.0, "a".to_string()),
                (4.0, String::new()),
                (5.0, String::new()),
            ]
        );
        let finals = final_observations(&trial.observations);
        assert_eq!(finals["a"], 3.0);
        assert_eq!(finals[""], 5.0);
    }

    #[test]
    fn test_classification() {
        let config = Config::default();
        let failed = execute(fresh(), &config, |_| Err(PropertyError::fail("nope")));
        assert_eq!(failed.status, Status::Interesting(FailureOrigin::Returned));
        assert_eq!(failed.message.as_deref(), Some("nope"));

        let rejected = execute(fresh(), &config, |case| case.assume(false));
        assert_eq!(rejected.status, Status::Invalid);

        let overrun = execute(ByteStream::replay(&[]), &config, |case| {
            case.draw(&integers::<u8>(0, 100))?;
            Ok(())
        });
        assert_eq!(overrun.status, Status::Overrun);

        let panicked = execute(fresh(), &config, |_| panic!("kaboom"));
        assert!(matches!(
            panicked.status,
            Status::Interesting(FailureOrigin::Panic { .. })
        ));
        assert_eq!(panicked.message.as_deref(), Some("kaboom"));

        let misuse = execute(fresh(), &config, |case| {
            case.target(f64::NAN)?;
            Ok(())
        });
        assert!(matches!(
            misuse.usage_error,
            Some(CrucibleError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_stream_is_frozen_after_trial() {
        let trial = execute(fresh(), &Config::default(), |case| {
            case.draw(&integers::<u32>(0, 1000))?;
            Ok(())
        });
        assert!(trial.stream.is_frozen());
        assert!(!trial.bytes().is_empty());
    }

    #[test]
    fn test_slow_passing_trial_is_too_slow() {
        let config = Config::default().with_deadline(Duration::from_millis(1));
        let trial = execute(fresh(), &config, |_| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(())
        });
        assert_eq!(trial.status, Status::Invalid);
        assert!(trial.too_slow);
    }
}
