//! Request entry point: one JSON event in, one `{status, message}` response out.

use std::sync::Arc;

use serde_json::json;

use crate::api::event_dto::{EventDto, ResponseDto};
use crate::config::OptimizerConfig;
use crate::domain::clock::clock::SharedClock;
use crate::domain::data_access::data_access_facade::DataAccessFacade;
use crate::domain::deployment_manager::deployment_manager::DeploymentManager;
use crate::domain::migrator::deployment_migrator::DeploymentMigrator;
use crate::domain::migrator::redeploy::RedeployCollaborator;
use crate::domain::utils::id::WorkflowId;
use crate::error::Result;
use crate::loader::parser::parse_json_str;

pub const MANAGE_DEPLOYMENTS: &str = "manage_deployments";
pub const RUN_DEPLOYMENT_MIGRATOR: &str = "run_deployment_migrator";

/// Actions of the surrounding service that this binary does not serve.
pub const UNSUPPORTED_ACTIONS: [&str; 6] = ["data_collect", "log_sync", "run", "list", "remove", "version"];

#[derive(Clone)]
pub struct HandlerContext {
    pub facade: DataAccessFacade,
    pub config: OptimizerConfig,
    pub clock: SharedClock,
    pub collaborator: Arc<dyn RedeployCollaborator>,
}

pub async fn handle_json(raw_event: &str, ctx: &HandlerContext) -> ResponseDto {
    match parse_json_str::<EventDto>(raw_event) {
        Ok(event) => handle(&event, ctx).await,
        Err(e) => ResponseDto::bad_request(format!("Malformed event: {}", e)),
    }
}

pub async fn handle(event: &EventDto, ctx: &HandlerContext) -> ResponseDto {
    log::info!("Handling action '{}'", event.action);

    let result = match event.action.as_str() {
        MANAGE_DEPLOYMENTS => manage_deployments(event.workflow_id.clone(), ctx).await,
        RUN_DEPLOYMENT_MIGRATOR => run_deployment_migrator(ctx).await,
        action if UNSUPPORTED_ACTIONS.contains(&action) => return ResponseDto::bad_request(format!("Action '{}' is not supported", action)),
        action => return ResponseDto::bad_request(format!("Unknown action '{}'", action)),
    };

    result.unwrap_or_else(|e| {
        log::error!("Action '{}' failed: {}", event.action, e);
        ResponseDto::internal_error(e.to_string())
    })
}

async fn manage_deployments(workflow_id: Option<String>, ctx: &HandlerContext) -> Result<ResponseDto> {
    let facade = ctx.facade.clone();
    let config = ctx.config.clone();
    let clock = ctx.clock.clone();

    // Solving is CPU bound and drives its own worker threads.
    let joined = tokio::task::spawn_blocking(move || -> Result<ResponseDto> {
        let mut manager = DeploymentManager::new(facade, config, clock)?;
        match workflow_id {
            Some(workflow_id) => {
                let workflow_id = WorkflowId::new(workflow_id);
                let outcome = manager.check_workflow(&workflow_id)?;
                Ok(ResponseDto::ok("Deployment check finished").with_details(json!({ workflow_id.as_str(): outcome.to_string() })))
            }
            None => {
                let report = manager.check()?;
                let outcomes: serde_json::Map<String, serde_json::Value> =
                    report.outcomes.iter().map(|(id, outcome)| (id.to_string(), json!(outcome.to_string()))).collect();
                let failures: serde_json::Map<String, serde_json::Value> = report.failures.iter().map(|(id, e)| (id.to_string(), json!(e))).collect();
                Ok(ResponseDto::ok(format!("Checked {} workflows", outcomes.len() + failures.len()))
                    .with_details(json!({ "run_id": report.run_id.as_str(), "outcomes": outcomes, "failures": failures })))
            }
        }
    })
    .await;

    match joined {
        Ok(response) => response,
        Err(e) => Ok(ResponseDto::internal_error(format!("Deployment manager task failed: {}", e))),
    }
}

async fn run_deployment_migrator(ctx: &HandlerContext) -> Result<ResponseDto> {
    let migrator = DeploymentMigrator::new(ctx.facade.clone(), ctx.collaborator.clone(), ctx.clock.clone());
    let report = migrator.check().await?;

    let ids = |ids: &[WorkflowId]| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
    let failed: serde_json::Map<String, serde_json::Value> = report.failed.iter().map(|(id, e)| (id.to_string(), json!(e))).collect();
    Ok(ResponseDto::ok(format!("Dispatched {} workflows", report.dispatched.len()))
        .with_details(json!({ "dispatched": ids(&report.dispatched), "expired": ids(&report.expired), "failed": failed })))
}
