// src/dag/binder.rs

//! Parameter binding: static parameters + term arguments + overrides.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::types::{Params, TermArg};

/// Parameters as seen by template expansion and pre-hooks.
///
/// Each key maps to a list of values because a term-argument key may recur.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundParameters {
    named: BTreeMap<String, Vec<Value>>,
    positional: Vec<Value>,
}

impl BoundParameters {
    /// Merge a node's static parameters with its accumulated term arguments.
    ///
    /// - static parameters start as single-value entries;
    /// - the first keyed term argument for a key replaces the static value,
    ///   further ones for the same key accumulate;
    /// - positional term arguments are kept in order.
    pub fn bind(params: &Params, termargs: &[TermArg]) -> Self {
        let mut named: BTreeMap<String, Vec<Value>> = params
            .iter()
            .map(|(k, v)| (k.clone(), vec![v.clone()]))
            .collect();
        let mut positional = Vec::new();
        let mut dynamic: HashSet<&str> = HashSet::new();

        for arg in termargs {
            match arg {
                TermArg::Keyed(key, value) => {
                    let values = named.entry(key.clone()).or_default();
                    if dynamic.insert(key.as_str()) {
                        values.clear();
                    }
                    values.push(value.clone());
                }
                TermArg::Positional(value) => positional.push(value.clone()),
            }
        }

        Self { named, positional }
    }

    /// Explicit overrides replace whatever was bound for the same key.
    pub fn with_overrides(mut self, overrides: &Params) -> Self {
        for (k, v) in overrides {
            self.set(k.clone(), v.clone());
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.named.insert(key.into(), vec![value.into()]);
    }

    pub fn values(&self, key: &str) -> Option<&[Value]> {
        self.named.get(key).map(|v| v.as_slice())
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn contains(&self, key: &str) -> bool {
        self.named.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.named.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Text substituted for `{key}` (or `{0}`, `{1}`... for positional
    /// arguments). Several distinct values are joined by single spaces.
    pub fn render(&self, key: &str) -> Option<String> {
        if let Ok(index) = key.parse::<usize>() {
            return self.positional.get(index).map(value_text);
        }

        let values = self.named.get(key)?;
        let mut seen = Vec::with_capacity(values.len());
        for text in values.iter().map(value_text) {
            if !seen.contains(&text) {
                seen.push(text);
            }
        }
        Some(seen.join(" "))
    }
}

/// Plain-text rendering of a parameter value for command lines.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
