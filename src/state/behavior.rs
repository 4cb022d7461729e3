//! Per-column customization points.
//!
//! Each hook returns `None` (or `Ok`) to fall back to the engine's default
//! logic, so a behaviour only needs to implement what it overrides.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::state::data_model::Lookup;
use crate::state::filter::FilterCondition;

pub trait ColumnBehavior: Send + Sync {
    /// Replaces the default comparator when it returns `Some`.
    fn compare(&self, _a: Lookup<'_>, _b: Lookup<'_>) -> Option<Ordering> {
        None
    }

    /// Replaces the default filter logic for this column when it returns `Some`.
    fn matches(&self, _value: Lookup<'_>, _condition: &FilterCondition) -> Option<bool> {
        None
    }

    /// Replaces the configured aggregation for this column when it returns `Some`.
    fn aggregate(&self, _values: &[Lookup<'_>]) -> Option<Value> {
        None
    }

    /// Rejects an edit commit with a message.
    fn validate(&self, _old: &Value, _new: &Value) -> Result<(), String> {
        Ok(())
    }

    fn format(&self, _value: Lookup<'_>) -> Option<String> {
        None
    }
}

#[derive(Clone)]
pub struct Behavior(Arc<dyn ColumnBehavior>);

impl Behavior {
    pub fn new<B: ColumnBehavior + 'static>(behavior: B) -> Self {
        Self(Arc::new(behavior))
    }

    pub fn get(&self) -> &dyn ColumnBehavior {
        self.0.as_ref()
    }
}

impl fmt::Debug for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Behavior(..)")
    }
}

type CompareFn = Arc<dyn Fn(Lookup<'_>, Lookup<'_>) -> Ordering + Send + Sync>;
type MatchFn = Arc<dyn Fn(Lookup<'_>, &FilterCondition) -> bool + Send + Sync>;
type AggregateFn = Arc<dyn Fn(&[Lookup<'_>]) -> Value + Send + Sync>;
type ValidateFn = Arc<dyn Fn(&Value, &Value) -> Result<(), String> + Send + Sync>;
type FormatFn = Arc<dyn Fn(Lookup<'_>) -> String + Send + Sync>;

/// Closure-backed [`ColumnBehavior`] for hosts that do not want a type per column.
#[derive(Clone, Default)]
pub struct Callbacks {
    comparator: Option<CompareFn>,
    filter: Option<MatchFn>,
    aggregator: Option<AggregateFn>,
    validator: Option<ValidateFn>,
    formatter: Option<FormatFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn comparator<F>(mut self, f: F) -> Self
    where
        F: Fn(Lookup<'_>, Lookup<'_>) -> Ordering + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(f));
        self
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(Lookup<'_>, &FilterCondition) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(f));
        self
    }

    pub fn aggregator<F>(mut self, f: F) -> Self
    where
        F: Fn(&[Lookup<'_>]) -> Value + Send + Sync + 'static,
    {
        self.aggregator = Some(Arc::new(f));
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn formatter<F>(mut self, f: F) -> Self
    where
        F: Fn(Lookup<'_>) -> String + Send + Sync + 'static,
    {
        self.formatter = Some(Arc::new(f));
        self
    }
}

impl ColumnBehavior for Callbacks {
    fn compare(&self, a: Lookup<'_>, b: Lookup<'_>) -> Option<Ordering> {
        self.comparator.as_ref().map(|f| f(a, b))
    }

    fn matches(&self, value: Lookup<'_>, condition: &FilterCondition) -> Option<bool> {
        self.filter.as_ref().map(|f| f(value, condition))
    }

    fn aggregate(&self, values: &[Lookup<'_>]) -> Option<Value> {
        self.aggregator.as_ref().map(|f| f(values))
    }

    fn validate(&self, old: &Value, new: &Value) -> Result<(), String> {
        match self.validator.as_ref() {
            Some(f) => f(old, new),
            None => Ok(()),
        }
    }

    fn format(&self, value: Lookup<'_>) -> Option<String> {
        self.formatter.as_ref().map(|f| f(value))
    }
}
