//! Shared helpers for the `clusterdag` integration tests.
//!
//! - [`builders`] constructs workflow definitions and fake records.
//! - [`fake_cluster`] stands in for the batch scheduler.

pub mod builders;
pub mod fake_cluster;

use std::sync::Once;

use clusterdag::dag::{Graph, NodeId};
use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{StaticRecord, TaskConfigBuilder, WorkflowConfigBuilder};
pub use fake_cluster::{FakeCluster, JobFailed, JobScript, run_to_completion};

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured per test and shown for failures only, unless
/// running with `-- --nocapture`. Filter with `RUST_LOG`, e.g.
/// `RUST_LOG=clusterdag=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Look a node up by slug, panicking with a readable message if absent.
pub fn id_of(graph: &Graph, slug: &str) -> NodeId {
    graph
        .find(slug)
        .unwrap_or_else(|| panic!("no task with slug '{slug}' in graph"))
}

/// Run a future with a 5-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}
