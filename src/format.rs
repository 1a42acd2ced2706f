// src/format.rs

//! Literate rendering of a workflow definition file.
//!
//! Comment lines become prose (leading `#`s stripped, `_` escaped as `\_`);
//! everything else becomes an indented code block.

const CODE_INDENT: &str = "    ";

/// Render a whole definition, one output line per input line.
pub fn format_definition(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + source.len() / 4);
    for line in source.lines() {
        out.push_str(&format_line(line));
        out.push('\n');
    }
    out
}

pub fn format_line(line: &str) -> String {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with('#') {
        line.trim_start_matches('#').replace('_', "\\_")
    } else {
        format!("{CODE_INDENT}{}", line.replace('\t', CODE_INDENT))
    }
}
