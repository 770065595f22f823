use async_trait::async_trait;
use serde::Serialize;

use crate::api::table_dto::PlacementDecisionDto;
use crate::domain::clock::clock::SharedClock;
use crate::domain::data_access::data_access_facade::DataAccessFacade;
use crate::domain::utils::id::WorkflowId;
use crate::domain::utils::time::format_time;
use crate::error::{Error, Result};

/// Consumes the staging record of a workflow and rolls the placement out.
#[async_trait]
pub trait RedeployCollaborator: Send + Sync {
    async fn redeploy(&self, workflow_id: &WorkflowId) -> Result<()>;
}

/// Promotes the staging record to `workflow_placement_decision_table`.
pub struct LocalRedeployer {
    facade: DataAccessFacade,
    clock: SharedClock,
}

impl LocalRedeployer {
    pub fn new(facade: DataAccessFacade, clock: SharedClock) -> Self {
        LocalRedeployer { facade, clock }
    }
}

#[async_trait]
impl RedeployCollaborator for LocalRedeployer {
    async fn redeploy(&self, workflow_id: &WorkflowId) -> Result<()> {
        let Some(record) = self.facade.staging_record(workflow_id)? else {
            log::debug!("Staging record of {} was already consumed", workflow_id);
            return Ok(());
        };

        let decision = PlacementDecisionDto { time_keys_to_staging_area_data: record.time_keys_to_staging_area_data, migrated_at: format_time(self.clock.now()) };
        self.facade.set_placement_decision(workflow_id, &decision)?;
        self.facade.remove_staging_record(workflow_id)?;

        log::info!("Promoted {} hourly placements of {}", decision.time_keys_to_staging_area_data.len(), workflow_id);
        Ok(())
    }
}

#[derive(Serialize)]
struct RedeployRequest<'a> {
    action: &'static str,
    workflow_id: &'a str,
}

/// Hands the workflow to a remote deploy service that reads staging itself.
pub struct RemoteRedeployer {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteRedeployer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(RemoteRedeployer { client, endpoint: endpoint.into() })
    }
}

#[async_trait]
impl RedeployCollaborator for RemoteRedeployer {
    async fn redeploy(&self, workflow_id: &WorkflowId) -> Result<()> {
        let request = RedeployRequest { action: "re_deploy", workflow_id: workflow_id.as_str() };
        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            log::error!(
                "Redeploy of {} was rejected by {}.\nResponse-Status-Code: <<{}>>\nResponse-Body: <<{}>>",
                workflow_id,
                self.endpoint,
                status,
                body
            );
            Err(Error::RemoteRedeploy(format!("{} answered {}", self.endpoint, status)))
        }
    }
}
