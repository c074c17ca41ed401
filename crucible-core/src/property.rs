//! Property definitions for property-based testing.

use crate::data::Config;
use crate::engine::{Engine, RunStats, TrialRunner};
use crate::error::{DrawError, PropertyError, PropertyResult, Result};
use crate::stream::ByteStream;
use crate::strategy::Strategy;
use crate::trial::{execute, TestCase, Trial};
use std::fmt::Debug;

type Body<T> = Box<dyn Fn(&mut TestCase, T) -> PropertyResult>;
type ClassificationFn<T> = Box<dyn Fn(&T) -> bool>;

/// A property that can be tested with generated inputs.
pub struct Property<T> {
    strategy: Strategy<T>,
    body: Body<T>,
    name: Option<String>,
    variable_name: Option<String>,
    classifications: Vec<(String, ClassificationFn<T>)>,
    examples: Vec<T>,
}

impl<T> Property<T>
where
    T: 'static + Debug + Clone,
{
    /// Create a new property from a strategy and a test body that gets the
    /// trial handle along with the drawn value.
    pub fn new<F>(strategy: Strategy<T>, body: F) -> Self
    where
        F: Fn(&mut TestCase, T) -> PropertyResult + 'static,
    {
        Property {
            strategy,
            body: Box::new(body),
            name: None,
            variable_name: None,
            classifications: Vec::new(),
            examples: Vec::new(),
        }
    }

    /// Create a property that checks a boolean condition.
    pub fn for_all<F>(strategy: Strategy<T>, condition: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        Property::new(strategy, move |_, input| {
            if condition(&input) {
                Ok(())
            } else {
                Err(PropertyError::fail("condition does not hold"))
            }
        })
    }

    /// Create a property that checks a boolean condition with a named variable.
    pub fn for_all_named<F>(strategy: Strategy<T>, variable_name: &str, condition: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        let mut property = Property::for_all(strategy, condition);
        property.variable_name = Some(variable_name.to_string());
        property
    }

    /// Name the property in reports and logs.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Count an event for every input matching `predicate`.
    pub fn classify<F>(mut self, name: &str, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.classifications
            .push((name.to_string(), Box::new(predicate)));
        self
    }

    /// Test explicit examples before anything is generated.
    ///
    /// Examples are classified like any other trial but never shrunk: a
    /// failing example is reported as is.
    ///
    /// # Example
    /// ```rust
    /// use crucible_core::*;
    ///
    /// let prop = for_all(integers::<i32>(1, 100), |&n| n > 0)
    ///     .with_examples(vec![1, 50, 100]);
    /// assert!(prop.run(&Config::default()).is_ok());
    /// ```
    pub fn with_examples(mut self, examples: Vec<T>) -> Self {
        self.examples.extend(examples);
        self
    }

    /// Add one explicit example.
    pub fn example(mut self, example: T) -> Self {
        self.examples.push(example);
        self
    }

    /// Run this property with the given configuration.
    pub fn run(&self, config: &Config) -> Result<RunStats> {
        Engine::new(self, config).run()
    }

    /// Run with the default configuration overlaid by `CRUCIBLE_*`
    /// environment variables.
    pub fn check(&self) -> Result<RunStats> {
        self.run(&Config::from_env()?)
    }

    /// Decode the value a byte stream stands for, such as the bytes of a
    /// failure report.
    pub fn decode(&self, bytes: &[u8]) -> std::result::Result<T, DrawError> {
        self.strategy.draw(&mut ByteStream::replay(bytes))
    }

    /// Replay a single trial on `bytes`.
    pub fn reproduce(&self, bytes: &[u8], config: &Config) -> Trial {
        TrialRunner::run(self, ByteStream::replay(bytes), config)
    }

    fn describe(&self, value: &T) -> String {
        match &self.variable_name {
            Some(name) => format!("{name} = {value:?}"),
            None => format!("{value:?}"),
        }
    }

    fn check_value(&self, tc: &mut TestCase, value: T) -> PropertyResult {
        tc.describe(self.describe(&value));
        for (name, predicate) in &self.classifications {
            if predicate(&value) {
                tc.event(name.as_str());
            }
        }
        (self.body)(tc, value)
    }
}

impl<T> TrialRunner for Property<T>
where
    T: 'static + Debug + Clone,
{
    fn run(&self, stream: ByteStream, config: &Config) -> Trial {
        execute(stream, config, |tc| {
            let value = tc.draw(&self.strategy)?;
            self.check_value(tc, value)
        })
    }

    fn example_count(&self) -> usize {
        self.examples.len()
    }

    fn run_example(&self, index: usize, config: &Config) -> Option<Trial> {
        let value = self.examples.get(index)?.clone();
        Some(execute(ByteStream::replay(&[]), config, |tc| {
            self.check_value(tc, value)
        }))
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Create a property from a strategy and a body receiving the trial handle.
pub fn given<T, F>(strategy: Strategy<T>, body: F) -> Property<T>
where
    T: 'static + Debug + Clone,
    F: Fn(&mut TestCase, T) -> PropertyResult + 'static,
{
    Property::new(strategy, body)
}

/// Create a property that checks a boolean condition.
pub fn for_all<T, F>(strategy: Strategy<T>, condition: F) -> Property<T>
where
    T: 'static + Debug + Clone,
    F: Fn(&T) -> bool + 'static,
{
    Property::for_all(strategy, condition)
}

/// Create a property that checks a boolean condition with a named variable.
pub fn for_all_named<T, F>(strategy: Strategy<T>, variable_name: &str, condition: F) -> Property<T>
where
    T: 'static + Debug + Clone,
    F: Fn(&T) -> bool + 'static,
{
    Property::for_all_named(strategy, variable_name, condition)
}
