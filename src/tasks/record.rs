// src/tasks/record.rs

//! Boundary with an external record-management system.
//!
//! The engine never talks to the record system itself. An adapter exposes
//! a [`RecordSource`]; the engine only ever sees the flat, read-only
//! [`RecordSnapshot`] captured from it.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::types::Params;

/// Anything that can hand over a flat copy of an external record.
pub trait RecordSource {
    fn fields(&self) -> Params;

    /// Named filesystem paths attached to the record, if any.
    fn named_paths(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// Read-only copy of an external record's fields and named paths.
///
/// Fields whose key contains `__` are internal to the record system and
/// are not copied.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordSnapshot {
    fields: Params,
    named_paths: BTreeMap<String, String>,
}

impl RecordSnapshot {
    pub fn capture(source: &dyn RecordSource) -> Self {
        let fields = source
            .fields()
            .into_iter()
            .filter(|(k, _)| !k.contains("__"))
            .collect();
        Self {
            fields,
            named_paths: source.named_paths(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn named_path(&self, name: &str) -> Option<&str> {
        self.named_paths.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &Params {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.named_paths.is_empty()
    }
}
