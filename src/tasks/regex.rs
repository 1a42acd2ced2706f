// src/tasks/regex.rs

//! Output-scraping node.

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::dag::{BoundParameters, NodeState};
use crate::errors::{DagError, Result};
use crate::tasks::TaskKind;
use crate::types::{Params, TaskStatus, TermArg};

/// Group names containing this marker are never turned into term arguments.
const RESERVED_GROUP_MARKER: &str = "default";

/// Searches output text for a pattern with named groups.
///
/// Every matched, non-reserved named group becomes a keyed term argument.
/// With `stop_on_miss`, text that does not match sends the node to `fatal`.
#[derive(Debug, Clone)]
pub struct RegexTask {
    regex: Regex,
    stop_on_miss: bool,
}

impl RegexTask {
    pub fn new(pattern: &str, stop_on_miss: bool) -> Result<Self> {
        Ok(Self {
            regex: compile(pattern)?,
            stop_on_miss,
        })
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn stop_on_miss(&self) -> bool {
        self.stop_on_miss
    }

    /// Scrape `text` into `state`. Returns whether the pattern matched.
    pub fn scrape(&self, text: &str, state: &mut NodeState) -> bool {
        let Some(caps) = self.regex.captures(text) else {
            if self.stop_on_miss {
                warn!(task = %state.slug, pattern = %self.regex, "no match in task output; marking fatal");
                state.status = TaskStatus::Fatal;
                state.term_error = Some(format!(
                    "RegexMiss;pattern {:?} did not match task output",
                    self.regex.as_str()
                ));
            } else {
                debug!(task = %state.slug, pattern = %self.regex, "no match in task output");
            }
            return false;
        };

        for name in self.regex.capture_names().flatten() {
            if name.contains(RESERVED_GROUP_MARKER) {
                continue;
            }
            if let Some(m) = caps.name(name) {
                state.termargs.push(TermArg::keyed(name, m.as_str()));
            }
        }
        true
    }
}

impl TaskKind for RegexTask {
    fn kind(&self) -> &'static str {
        "regex"
    }

    fn clone_kind(&self) -> Box<dyn TaskKind> {
        Box::new(self.clone())
    }

    fn scan_input(&self, state: &mut NodeState) {
        let text = state.input_text.clone();
        self.scrape(&text, state);
    }

    fn start(&self, state: &mut NodeState, _params: &BoundParameters) -> Result<Vec<String>> {
        if state.status != TaskStatus::Fatal {
            state.status = TaskStatus::Completed;
        }
        Ok(Vec::new())
    }

    fn snapshot_fields(&self) -> Params {
        let mut fields = Params::new();
        fields.insert("regex".into(), Value::from(self.regex.as_str()));
        fields.insert("stop_on_miss".into(), Value::from(self.stop_on_miss));
        fields
    }

    fn restore_field(&mut self, key: &str, value: &Value) -> Result<bool> {
        match key {
            "regex" => {
                let pattern = value.as_str().ok_or_else(|| {
                    DagError::Snapshot(format!("regex must be a string, got {value}"))
                })?;
                self.regex = compile(pattern)?;
                Ok(true)
            }
            "stop_on_miss" => {
                self.stop_on_miss = value.as_bool().ok_or_else(|| {
                    DagError::Snapshot(format!("stop_on_miss must be a boolean, got {value}"))
                })?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| DagError::Configuration(format!("invalid regex {pattern:?}: {e}")))
}
