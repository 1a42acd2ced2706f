// tests/config_loading.rs

use std::io::Write;

use clusterdag::config::{
    DefaultSection, FileFilterSpec, TaskKindName, load_and_validate, load_from_path,
    parse_and_validate,
};
use clusterdag::errors::DagError;
use clusterdag_test_utils::{TaskConfigBuilder, WorkflowConfigBuilder};
use serde_json::json;
use tempfile::NamedTempFile;

const ASSEMBLY: &str = r#"
[workflow]
name = "assembly"

[default]
modules = ["gcc/4.9"]

[task.fetch]
name = "Fetch reads"
run = "fetch --out {out}"
params = { out = "/data", threads = 4 }

[task.trim]
kind = "cluster"
run = "trim -i {input}"
modules = ["trimmomatic"]
append_default_modules = true
file_filter = ["*.fastq", "*.fq"]
after = ["fetch", { task = "qc", when = { field = "passed", equals = true } }]

[task.qc]
regex = "passed=(?P<passed>\\w+)"
stop_on_miss = true
after = ["fetch"]

[task.report]
file_filter = "*.html"
after = ["trim"]
"#;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_loads_full_definition() {
    let file = write_temp(ASSEMBLY);
    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.workflow.name, "assembly");
    assert_eq!(cfg.task.len(), 4);
    assert_eq!(cfg.entry_tasks(), vec!["fetch"]);

    let fetch = &cfg.task["fetch"];
    assert_eq!(fetch.display_name("fetch"), "Fetch reads");
    assert_eq!(fetch.effective_kind(), TaskKindName::Cluster);
    assert_eq!(fetch.params["threads"], json!(4));
    assert_eq!(fetch.effective_modules(&cfg.default), vec!["gcc/4.9"]);

    let trim = &cfg.task["trim"];
    assert_eq!(
        trim.effective_modules(&cfg.default),
        vec!["trimmomatic", "gcc/4.9"]
    );
    assert_eq!(
        trim.file_filter,
        Some(FileFilterSpec::Many(vec!["*.fastq".into(), "*.fq".into()]))
    );
    assert_eq!(trim.after[0].task(), "fetch");
    assert!(trim.after[0].when().is_none());
    let when = trim.after[1].when().unwrap();
    assert_eq!(trim.after[1].task(), "qc");
    assert_eq!(when.field, "passed");
    assert_eq!(when.equals, json!(true));

    assert_eq!(cfg.task["qc"].effective_kind(), TaskKindName::Regex);
    assert!(cfg.task["qc"].stop_on_miss);
    assert_eq!(cfg.task["report"].effective_kind(), TaskKindName::Noop);
    assert_eq!(
        cfg.task["report"].file_filter,
        Some(FileFilterSpec::One("*.html".into()))
    );
}

#[test]
fn test_load_from_path_does_not_validate() {
    let file = write_temp(
        r#"
[task.a]
after = ["missing"]
"#,
    );
    let raw = load_from_path(file.path()).unwrap();
    assert_eq!(raw.task.len(), 1);
    assert!(load_and_validate(file.path()).is_err());
}

#[test]
fn test_cycle_returns_structured_error() {
    let result = parse_and_validate(
        r#"
[task.A]
after = ["B"]

[task.B]
after = ["A"]
"#,
    );

    match result {
        Err(DagError::Cycle(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected Cycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

fn expect_config_error(toml: &str, needle: &str) {
    match parse_and_validate(toml) {
        Err(DagError::Configuration(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
        }
        Err(e) => panic!("Expected Configuration error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_semantic_errors() {
    expect_config_error("", "at least one");
    expect_config_error("[task.a]\nafter = [\"b\"]\n", "unknown dependency 'b'");
    expect_config_error("[task.a]\nafter = [\"a\"]\n", "cannot depend on itself");
    expect_config_error("[task.a]\nkind = \"cluster\"\n", "needs a `run`");
    expect_config_error("[task.a]\nkind = \"regex\"\n", "needs a `regex`");
    expect_config_error("[task.a]\nregex = \"(oops\"\n", "invalid regex");
    expect_config_error("[task.a]\nrun = \"echo {\"\n", "bad `run`");
    expect_config_error("[task.a]\nfile_filter = \"[z-a]\"\n", "glob");
    expect_config_error(
        "[task.fetch]\n[task.other]\nname = \"Fetch\"\n",
        "share the slug 'fetch'",
    );
    expect_config_error("[task.a]\nname = \"!!!\"\n", "empty slug");
    expect_config_error("[workflow]\nroot = \"nope\"\n[task.a]\n", "unknown task 'nope'");
}

#[test]
fn test_toml_syntax_error_is_toml_variant() {
    assert!(matches!(
        parse_and_validate("[task.a\n"),
        Err(DagError::Toml(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        load_and_validate("/definitely/not/here/Workflow.toml"),
        Err(DagError::Io(_))
    ));
}

#[test]
fn test_effective_modules_rules() {
    let defaults = DefaultSection {
        modules: vec!["gcc".into()],
    };
    let inherit = TaskConfigBuilder::cluster("x").build();
    let replace = TaskConfigBuilder::cluster("x").module("own").build();
    let append = TaskConfigBuilder::cluster("x")
        .module("own")
        .append_default_modules(true)
        .build();

    assert_eq!(inherit.effective_modules(&defaults), vec!["gcc"]);
    assert_eq!(replace.effective_modules(&defaults), vec!["own"]);
    assert_eq!(append.effective_modules(&defaults), vec!["own", "gcc"]);
}

#[test]
fn test_kind_inference_and_explicit_kind() {
    assert_eq!(
        TaskConfigBuilder::noop().build().effective_kind(),
        TaskKindName::Noop
    );
    assert_eq!(
        TaskConfigBuilder::regex("x").build().effective_kind(),
        TaskKindName::Regex
    );
    assert_eq!(
        TaskConfigBuilder::cluster("echo")
            .kind(TaskKindName::Noop)
            .build()
            .effective_kind(),
        TaskKindName::Noop
    );
}

#[test]
fn test_builder_produces_valid_config() {
    let cfg = WorkflowConfigBuilder::new()
        .name("demo")
        .default_module("gcc")
        .with_task("a", TaskConfigBuilder::cluster("echo a").build())
        .with_task("b", TaskConfigBuilder::noop().after("a").build())
        .build();
    assert_eq!(cfg.workflow.name, "demo");
    assert_eq!(cfg.entry_tasks(), vec!["a"]);
}
