use crate::domain::utils::id::WorkflowId;
use crate::error::Result;

/// Refreshes the historical summary of a workflow in `workflow_instance_table`
/// before the manager reads it.
pub trait WorkflowCollector: std::fmt::Debug + Send {
    fn collect(&mut self, workflow_id: &WorkflowId) -> Result<()>;
}

/// For deployments where an external pipeline keeps the summaries current.
#[derive(Debug, Default, Clone)]
pub struct ExternalWorkflowCollector;

impl WorkflowCollector for ExternalWorkflowCollector {
    fn collect(&mut self, workflow_id: &WorkflowId) -> Result<()> {
        log::debug!("Workflow summary of {} is maintained externally", workflow_id);
        Ok(())
    }
}
