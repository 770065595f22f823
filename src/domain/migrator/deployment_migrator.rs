use std::sync::Arc;

use futures::future::join_all;

use crate::domain::clock::clock::SharedClock;
use crate::domain::data_access::data_access_facade::DataAccessFacade;
use crate::domain::migrator::redeploy::RedeployCollaborator;
use crate::domain::utils::id::WorkflowId;
use crate::domain::utils::time::parse_time;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub dispatched: Vec<WorkflowId>,
    pub expired: Vec<WorkflowId>,
    pub failed: Vec<(WorkflowId, String)>,
}

/// Polls the staging table and hands every live record to the collaborator.
/// Staging records are never modified here.
pub struct DeploymentMigrator {
    facade: DataAccessFacade,
    collaborator: Arc<dyn RedeployCollaborator>,
    clock: SharedClock,
}

impl DeploymentMigrator {
    pub fn new(facade: DataAccessFacade, collaborator: Arc<dyn RedeployCollaborator>, clock: SharedClock) -> Self {
        DeploymentMigrator { facade, collaborator, clock }
    }

    pub async fn check(&self) -> Result<MigrationReport> {
        let now = self.clock.now();
        let mut report = MigrationReport::default();
        let mut pending = Vec::new();

        for workflow_id in self.facade.staging_workflow_ids()? {
            let Some(record) = self.facade.staging_record(&workflow_id)? else {
                continue;
            };
            let expiry = match parse_time(&record.expiry_time) {
                Ok(expiry) => expiry,
                Err(e) => {
                    log::warn!("Staging record of {} has an unreadable expiry: {}", workflow_id, e);
                    report.failed.push((workflow_id, e.to_string()));
                    continue;
                }
            };
            if expiry <= now {
                log::info!("Staging record of {} expired, skipping", workflow_id);
                report.expired.push(workflow_id);
            } else {
                pending.push(workflow_id);
            }
        }

        let results = join_all(pending.iter().map(|workflow_id| self.collaborator.redeploy(workflow_id))).await;

        for (workflow_id, result) in pending.into_iter().zip(results) {
            match result {
                Ok(()) => report.dispatched.push(workflow_id),
                Err(e) => {
                    log::error!("Redeploy of {} failed: {}", workflow_id, e);
                    report.failed.push((workflow_id, e.to_string()));
                }
            }
        }

        log::info!("Migrator dispatched {} workflows, {} expired, {} failed", report.dispatched.len(), report.expired.len(), report.failed.len());
        Ok(report)
    }
}
