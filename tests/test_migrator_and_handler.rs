mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use carbon_placement::api::table_dto::{HourlyPlacementDto, StagingAreaRecordDto};
use carbon_placement::domain::clock::clock::SharedClock;
use carbon_placement::domain::clock::clock_mock::MockClock;
use carbon_placement::domain::migrator::deployment_migrator::DeploymentMigrator;
use carbon_placement::domain::migrator::redeploy::{LocalRedeployer, RedeployCollaborator};
use carbon_placement::domain::utils::id::WorkflowId;
use carbon_placement::domain::utils::time::{format_time, parse_time};
use carbon_placement::error::{Error, Result};
use carbon_placement::handler::{self, HandlerContext};

use common::{Fixture, region_dto, summary_with_runtimes, t0, test_config, workflow_dto};

fn clock() -> SharedClock {
    SharedClock(Arc::new(MockClock::new(t0())))
}

fn staging_record(expiry_offset: Duration) -> StagingAreaRecordDto {
    let placement = HourlyPlacementDto { instances: [("A".to_string(), region_dto("alt"))].into_iter().collect(), metrics: None };
    StagingAreaRecordDto { expiry_time: format_time(t0() + expiry_offset), time_keys_to_staging_area_data: BTreeMap::from([("0".to_string(), placement)]) }
}

/// Records every dispatched workflow and rejects the ones listed in `reject`.
#[derive(Default)]
struct RecordingRedeployer {
    calls: Mutex<Vec<String>>,
    reject: Vec<String>,
}

#[async_trait]
impl RedeployCollaborator for RecordingRedeployer {
    async fn redeploy(&self, workflow_id: &WorkflowId) -> Result<()> {
        self.calls.lock().unwrap().push(workflow_id.to_string());
        if self.reject.contains(&workflow_id.to_string()) {
            return Err(Error::RemoteRedeploy(format!("{} rejected", workflow_id)));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_migrator_skips_expired_records() {
    let fixture = Fixture::new();
    let live = WorkflowId::new("live-1");
    let stale = WorkflowId::new("stale-1");
    let refused = WorkflowId::new("refused-1");
    fixture.facade.set_staging_record(&live, &staging_record(Duration::hours(1))).unwrap();
    fixture.facade.set_staging_record(&stale, &staging_record(Duration::hours(-1))).unwrap();
    fixture.facade.set_staging_record(&refused, &staging_record(Duration::hours(1))).unwrap();

    let collaborator = Arc::new(RecordingRedeployer { reject: vec![refused.to_string()], ..Default::default() });
    let migrator = DeploymentMigrator::new(fixture.facade.clone(), collaborator.clone(), clock());

    let report = migrator.check().await.unwrap();

    assert_eq!(report.dispatched, vec![live.clone()]);
    assert_eq!(report.expired, vec![stale.clone()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, refused);

    let mut calls = collaborator.calls.lock().unwrap().clone();
    calls.sort();
    assert_eq!(calls, vec![live.to_string(), refused.to_string()]);

    // staging records are left to the collaborator
    assert!(fixture.facade.staging_record(&live).unwrap().is_some());
    assert!(fixture.facade.staging_record(&stale).unwrap().is_some());
}

#[tokio::test]
async fn test_local_redeployer_promotes_staging_record() {
    let fixture = Fixture::new();
    let workflow_id = WorkflowId::new("wf-1");
    let record = staging_record(Duration::hours(1));
    fixture.facade.set_staging_record(&workflow_id, &record).unwrap();

    let redeployer = LocalRedeployer::new(fixture.facade.clone(), clock());
    redeployer.redeploy(&workflow_id).await.unwrap();

    assert_eq!(fixture.facade.staging_record(&workflow_id).unwrap(), None);
    let decision = fixture.facade.placement_decision(&workflow_id).unwrap().unwrap();
    assert_eq!(decision.time_keys_to_staging_area_data, record.time_keys_to_staging_area_data);
    assert_eq!(parse_time(&decision.migrated_at).unwrap(), t0());

    // consumed records are ignored on a second call
    redeployer.redeploy(&workflow_id).await.unwrap();
}

fn handler_context(fixture: &Fixture) -> HandlerContext {
    HandlerContext {
        facade: fixture.facade.clone(),
        config: test_config(),
        clock: clock(),
        collaborator: Arc::new(LocalRedeployer::new(fixture.facade.clone(), clock())),
    }
}

#[tokio::test]
async fn test_handler_rejects_unknown_and_unsupported_actions() {
    let fixture = Fixture::new();
    let ctx = handler_context(&fixture);

    let unsupported = handler::handle_json(r#"{"action": "version"}"#, &ctx).await;
    assert_eq!(unsupported.status, 400);
    assert!(unsupported.message.contains("not supported"));

    let unknown = handler::handle_json(r#"{"action": "launch_rockets"}"#, &ctx).await;
    assert_eq!(unknown.status, 400);
    assert!(unknown.message.contains("Unknown action"));

    let malformed = handler::handle_json("{action", &ctx).await;
    assert_eq!(malformed.status, 400);
}

#[tokio::test]
async fn test_handler_solves_then_migrates() {
    let fixture = Fixture::new();
    fixture.add_region(common::RegionSetup::new("home", 100.0));
    let workflow_id = fixture.add_workflow(
        workflow_dto("handled", "home", &[("A", &[])]),
        &summary_with_runtimes(&[("A", 1.0)], &["home"], &[("2024-03-14", 25)]),
    );
    let ctx = handler_context(&fixture);

    let solved = handler::handle_json(r#"{"action": "manage_deployments"}"#, &ctx).await;
    assert_eq!(solved.status, 200, "{:?}", solved);
    let details = solved.details.unwrap();
    assert!(details["outcomes"][workflow_id.as_str()].as_str().unwrap().starts_with("solved"));
    assert!(fixture.facade.staging_record(&workflow_id).unwrap().is_some());

    let migrated = handler::handle_json(r#"{"action": "run_deployment_migrator"}"#, &ctx).await;
    assert_eq!(migrated.status, 200, "{:?}", migrated);
    assert_eq!(migrated.details.unwrap()["dispatched"][0], workflow_id.as_str());
    assert!(fixture.facade.placement_decision(&workflow_id).unwrap().is_some());
    assert_eq!(fixture.facade.staging_record(&workflow_id).unwrap(), None);

    let single = handler::handle_json(&format!(r#"{{"action": "manage_deployments", "workflow_id": "{}"}}"#, workflow_id), &ctx).await;
    assert_eq!(single.status, 200);
    assert!(single.details.unwrap()[workflow_id.as_str()].as_str().unwrap().starts_with("not due"));
}
