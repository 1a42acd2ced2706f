// src/dag/template.rs

//! Command templates with `{name}` placeholders.
//!
//! `{{` and `}}` produce literal braces. Numeric placeholders (`{0}`) refer
//! to positional term arguments.

use std::sync::LazyLock;

use regex::Regex;

use crate::dag::binder::BoundParameters;
use crate::errors::{DagError, Result};

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").unwrap());
static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last = 0;

        for caps in TOKEN_RE.captures_iter(source) {
            let Some(token) = caps.get(0) else {
                continue;
            };
            literal.push_str(&source[last..token.start()]);
            last = token.end();

            match token.as_str() {
                "{{" => literal.push('{'),
                "}}" => literal.push('}'),
                "{" | "}" => {
                    return Err(DagError::Template(format!(
                        "unbalanced brace at offset {} in {source:?}",
                        token.start()
                    )));
                }
                _ => {
                    let name = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                    if !NAME_RE.is_match(name) {
                        return Err(DagError::Template(format!(
                            "invalid placeholder {{{name}}} in {source:?}"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
            }
        }

        literal.push_str(&source[last..]);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn references(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Expand against bound parameters; the first unbound placeholder is an
    /// error.
    pub fn render(&self, params: &BoundParameters) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let value = params.render(name).ok_or_else(|| {
                        DagError::Template(format!(
                            "missing value for placeholder {{{name}}} in {:?}",
                            self.source
                        ))
                    })?;
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }
}
