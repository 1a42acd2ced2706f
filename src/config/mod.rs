// src/config/mod.rs

//! Workflow definition loading and validation.
//!
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a definition from disk (`loader.rs`).
//! - Validate references, task kinds, slugs and acyclicity (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{
    default_config_path, load_and_validate, load_from_path, parse_and_validate, parse_raw,
};
pub use model::{
    AfterSpec, ConfigFile, DefaultSection, FileFilterSpec, RawConfigFile, TaskConfig,
    TaskKindName, WhenSpec, WorkflowSection,
};
pub use validate::validate_config;
