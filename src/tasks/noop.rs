use crate::dag::{BoundParameters, NodeState};
use crate::errors::Result;
use crate::tasks::TaskKind;
use crate::types::TaskStatus;

/// Does nothing; starting it completes the node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTask;

impl TaskKind for NoopTask {
    fn kind(&self) -> &'static str {
        "noop"
    }

    fn clone_kind(&self) -> Box<dyn TaskKind> {
        Box::new(self.clone())
    }

    fn start(&self, state: &mut NodeState, _params: &BoundParameters) -> Result<Vec<String>> {
        state.status = TaskStatus::Completed;
        Ok(Vec::new())
    }
}
