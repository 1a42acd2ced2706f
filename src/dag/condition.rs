// src/dag/condition.rs

//! Edge conditionals as an explicit boolean expression tree.
//!
//! A conditional is evaluated when the parent finalizes, against the
//! parent's attribute snapshot merged with the finalize-time keyword
//! arguments. An edge without a conditional always passes.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::types::Params;

type PredicateFn = Arc<dyn Fn(&Params) -> bool + Send + Sync>;

/// Opaque caller-supplied predicate over the keyword-argument mapping.
#[derive(Clone)]
pub struct Predicate {
    label: String,
    func: PredicateFn,
}

impl Predicate {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Params) -> bool + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn call(&self, kwargs: &Params) -> bool {
        (self.func)(kwargs)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Condition {
    /// `kwargs[field] == value`; a missing field never matches.
    Equals { field: String, value: Value },
    Predicate(Predicate),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn predicate<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Params) -> bool + Send + Sync + 'static,
    {
        Condition::Predicate(Predicate::new(label, func))
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Self {
        Condition::Not(Box::new(self))
    }

    pub fn evaluate(&self, kwargs: &Params) -> bool {
        match self {
            Condition::Equals { field, value } => kwargs.get(field) == Some(value),
            Condition::Predicate(p) => p.call(kwargs),
            Condition::And(a, b) => a.evaluate(kwargs) && b.evaluate(kwargs),
            Condition::Or(a, b) => a.evaluate(kwargs) || b.evaluate(kwargs),
            Condition::Not(inner) => !inner.evaluate(kwargs),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { field, value } => write!(f, "{field} == {value}"),
            Condition::Predicate(p) => write!(f, "<{}>", p.label()),
            Condition::And(a, b) => write!(f, "({a} && {b})"),
            Condition::Or(a, b) => write!(f, "({a} || {b})"),
            Condition::Not(inner) => write!(f, "!{inner}"),
        }
    }
}
