use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use clusterdag::dag::{FinalizeArgs, Graph, NodeId};
use clusterdag::errors::{DagError, Result};
use clusterdag::types::{Params, TaskStatus};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// What the fake cluster was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobScript {
    pub job_id: String,
    pub slug: String,
    pub commands: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Succeeded(FinalizeArgs),
    Failed(String),
}

/// Completion report sent back to the scheduling loop.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub node: NodeId,
    pub job_id: String,
    pub outcome: JobOutcome,
}

/// Error recorded on a node when its fake job fails.
#[derive(Debug, Error)]
#[error("job failed: {0}")]
pub struct JobFailed(pub String);

/// A fake cluster that:
/// - records every submitted job script
/// - completes each job on a spawned task, reporting over a channel
/// - answers with scripted finalize arguments (or a failure) per slug.
pub struct FakeCluster {
    outputs: HashMap<String, FinalizeArgs>,
    failures: HashMap<String, String>,
    submitted: Arc<Mutex<Vec<JobScript>>>,
    next_job: u64,
}

impl FakeCluster {
    pub fn new() -> Self {
        Self {
            outputs: HashMap::new(),
            failures: HashMap::new(),
            submitted: Arc::new(Mutex::new(Vec::new())),
            next_job: 1,
        }
    }

    /// Finalize arguments reported when the job for `slug` finishes.
    pub fn succeed(mut self, slug: &str, args: FinalizeArgs) -> Self {
        self.outputs.insert(slug.to_string(), args);
        self
    }

    /// Make the job for `slug` fail with `message`.
    pub fn fail(mut self, slug: &str, message: &str) -> Self {
        self.failures.insert(slug.to_string(), message.to_string());
        self
    }

    pub fn submitted(&self) -> Vec<JobScript> {
        self.submitted.lock().unwrap().clone()
    }

    fn submit(
        &mut self,
        node: NodeId,
        slug: &str,
        commands: Vec<String>,
        tx: mpsc::Sender<JobReport>,
    ) -> String {
        let job_id = format!("job-{}", self.next_job);
        self.next_job += 1;

        self.submitted.lock().unwrap().push(JobScript {
            job_id: job_id.clone(),
            slug: slug.to_string(),
            commands,
        });

        let outcome = match self.failures.get(slug) {
            Some(message) => JobOutcome::Failed(message.clone()),
            None => JobOutcome::Succeeded(self.outputs.get(slug).cloned().unwrap_or_default()),
        };
        let report = JobReport {
            node,
            job_id: job_id.clone(),
            outcome,
        };

        tokio::spawn(async move {
            tokio::task::yield_now().await;
            let _ = tx.send(report).await;
        });

        job_id
    }
}

impl Default for FakeCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive `graph` until nothing is ready and nothing is in flight.
///
/// The graph is owned by this loop alone; jobs only talk back through the
/// completion channel. A terminal failure surfaces as the error of
/// `ready_set`.
pub async fn run_to_completion(graph: &mut Graph, cluster: &mut FakeCluster) -> Result<()> {
    let (tx, mut rx) = mpsc::channel::<JobReport>(64);
    let mut in_flight: HashSet<NodeId> = HashSet::new();

    loop {
        let mut progressed = false;
        for id in graph.ready_set()? {
            if in_flight.contains(&id) || graph.status(id) != Some(TaskStatus::Pending) {
                continue;
            }
            progressed = true;

            let outcome = graph.start(id, &Params::new())?;
            match outcome.status {
                // Nothing to submit; propagate right away.
                TaskStatus::Completed => {
                    graph.finalize(id, FinalizeArgs::new())?;
                    continue;
                }
                TaskStatus::Pending => {}
                _ => continue,
            }

            let slug = graph
                .state(id)
                .map(|s| s.slug.clone())
                .unwrap_or_default();
            let job_id = cluster.submit(id, &slug, outcome.commands, tx.clone());
            graph.set_running(id, job_id.as_str())?;
            in_flight.insert(id);
        }

        if in_flight.is_empty() {
            if progressed {
                continue;
            }
            break;
        }

        let report = rx
            .recv()
            .await
            .ok_or_else(|| DagError::Usage("completion channel closed".into()))?;
        in_flight.remove(&report.node);
        debug!(job_id = %report.job_id, "job report received");

        match report.outcome {
            JobOutcome::Succeeded(args) => graph.finalize(report.node, args)?,
            JobOutcome::Failed(message) => graph.set_fatal(report.node, &JobFailed(message))?,
        }
    }

    Ok(())
}
