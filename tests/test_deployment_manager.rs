mod common;

use std::sync::{Arc, Mutex};

use chrono::Duration;
use tracing_test::traced_test;

use carbon_placement::config::OptimizerConfig;
use carbon_placement::domain::clock::clock::SharedClock;
use carbon_placement::domain::clock::clock_mock::SharedMockClock;
use carbon_placement::domain::data_access::data_access_facade::WorkflowInfo;
use carbon_placement::domain::deployment_algorithms::deployment_algorithm_type::DeploymentAlgorithmType;
use carbon_placement::domain::deployment_manager::deployment_manager::{DeploymentManager, WorkflowCheckOutcome};
use carbon_placement::domain::deployment_manager::token_budget::{
    deficit_cooldown_s, minimum_cost, positive_tokens, potential_carbon_savings_per_invocation_s,
};
use carbon_placement::domain::deployment_manager::workflow_collector::WorkflowCollector;
use carbon_placement::domain::store::remote_table::RemoteTableClient;
use carbon_placement::domain::store::tables::DATACENTER_REGION_TABLE;
use carbon_placement::domain::utils::id::WorkflowId;
use carbon_placement::error::Result;

use common::{Fixture, RegionSetup, region_key, summary_with_runtimes, t0, test_config, workflow_dto};

const COOLDOWN: i64 = 86_400;

fn manager(fixture: &Fixture, clock: &SharedMockClock, config: OptimizerConfig) -> DeploymentManager {
    DeploymentManager::new(fixture.facade.clone(), config, SharedClock(Arc::new(clock.clone()))).unwrap()
}

fn home_only_workflow(fixture: &Fixture, name: &str, invocations: &[(&str, u64)]) -> WorkflowId {
    fixture.add_region(RegionSetup::new("home", 100.0));
    let summary = summary_with_runtimes(&[("A", 1.0), ("B", 2.0)], &["home"], invocations);
    fixture.add_workflow(workflow_dto(name, "home", &[("A", &["B"]), ("B", &[])]), &summary)
}

#[derive(Debug, Clone, Default)]
struct RecordingCollector {
    collected: Arc<Mutex<Vec<String>>>,
}

impl WorkflowCollector for RecordingCollector {
    fn collect(&mut self, workflow_id: &WorkflowId) -> Result<()> {
        self.collected.lock().unwrap().push(workflow_id.to_string());
        Ok(())
    }
}

#[test]
fn test_home_only_workflow_gets_bootstrap_solve() {
    let fixture = Fixture::new();
    let workflow_id = home_only_workflow(&fixture, "home-only", &[("2024-03-14", 40)]);
    let clock = SharedMockClock::new(t0());
    let collector = RecordingCollector::default();
    let mut manager = manager(&fixture, &clock, test_config()).with_collector(Box::new(collector.clone()));

    let report = manager.check().unwrap();

    assert!(report.failures.is_empty());
    let (id, outcome) = &report.outcomes[0];
    assert_eq!(id, &workflow_id);
    match outcome {
        WorkflowCheckOutcome::Solved { algorithm, number_of_solves, placements, .. } => {
            assert_eq!(*algorithm, DeploymentAlgorithmType::CoarseGrained);
            assert_eq!(*number_of_solves, 1);
            assert_eq!(placements, &vec![(0, vec![0, 0])]);
        }
        other => panic!("expected a solve, got {:?}", other),
    }
    assert_eq!(*collector.collected.lock().unwrap(), vec![workflow_id.to_string()]);

    let record = fixture.facade.staging_record(&workflow_id).unwrap().unwrap();
    assert_eq!(record.time_keys_to_staging_area_data.keys().collect::<Vec<_>>(), vec!["0"]);
    let placement = &record.time_keys_to_staging_area_data["0"];
    assert_eq!(placement.instances["A"].region, "home");
    assert_eq!(placement.instances["B"].region, "home");

    let info = fixture.facade.workflow_info(&workflow_id).unwrap().unwrap();
    assert_eq!(info, WorkflowInfo { last_solved: Some(t0()), tokens_left: 0.0, next_check: t0() + Duration::seconds(COOLDOWN), credited_invocations: 0 });
}

#[test]
fn test_immediate_rerun_does_nothing() {
    let fixture = Fixture::new();
    let workflow_id = home_only_workflow(&fixture, "rerun", &[("2024-03-14", 40)]);
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    manager.check().unwrap();
    let info = fixture.facade.workflow_info(&workflow_id).unwrap();
    fixture.facade.remove_staging_record(&workflow_id).unwrap();

    clock.advance(Duration::minutes(5));
    let outcome = manager.check_workflow(&workflow_id).unwrap();

    assert_eq!(outcome, WorkflowCheckOutcome::NotDue { next_check: t0() + Duration::seconds(COOLDOWN) });
    assert_eq!(fixture.facade.workflow_info(&workflow_id).unwrap(), info);
    assert_eq!(fixture.facade.staging_record(&workflow_id).unwrap(), None);
}

#[test]
fn test_too_few_invocations_wait_for_traffic() {
    let fixture = Fixture::new();
    let workflow_id = home_only_workflow(&fixture, "quiet", &[("2024-03-14", 3), ("2023-01-01", 500)]);
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let outcome = manager.check_workflow(&workflow_id).unwrap();

    assert_eq!(outcome, WorkflowCheckOutcome::BelowThreshold { invocations: 3 });
    assert_eq!(fixture.facade.workflow_info(&workflow_id).unwrap(), None);
    assert_eq!(fixture.facade.staging_record(&workflow_id).unwrap(), None);
}

#[test]
fn test_exhausted_budget_defers_solve() {
    let fixture = Fixture::new();
    let workflow_id = home_only_workflow(&fixture, "poor", &[("2024-03-15", 2)]);
    let last_solved = t0() - Duration::days(2);
    fixture.facade.set_workflow_info(&workflow_id, &WorkflowInfo { last_solved: Some(last_solved), tokens_left: 0.0, next_check: t0() - Duration::hours(1), credited_invocations: 0 }).unwrap();
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let outcome = manager.check_workflow(&workflow_id).unwrap();

    let cheapest = minimum_cost(2, 100.0);
    let expected_next_check = t0() + Duration::seconds(deficit_cooldown_s(cheapest, COOLDOWN));
    assert_eq!(outcome, WorkflowCheckOutcome::BudgetExhausted { tokens_left: -cheapest, next_check: expected_next_check });
    assert!(expected_next_check > t0() + Duration::seconds(COOLDOWN / 2));

    assert_eq!(fixture.facade.staging_record(&workflow_id).unwrap(), None);
    let info = fixture.facade.workflow_info(&workflow_id).unwrap().unwrap();
    assert_eq!(info, WorkflowInfo { last_solved: Some(last_solved), tokens_left: -cheapest, next_check: expected_next_check, credited_invocations: 2 });
}

#[test]
fn test_deferred_checks_credit_traffic_once() {
    let fixture = Fixture::new();
    fixture.add_region(RegionSetup::new("home", 100.0)).add_region(RegionSetup::new("alt", 300.0));
    let dto = workflow_dto("deferred", "home", &[("A", &["B"]), ("B", &[])]);
    let workflow_id = fixture.add_workflow(dto.clone(), &summary_with_runtimes(&[("A", 0.01), ("B", 0.01)], &["home", "alt"], &[("2024-03-14", 10)]));
    let last_solved = t0() - Duration::days(2);
    fixture
        .facade
        .set_workflow_info(&workflow_id, &WorkflowInfo { last_solved: Some(last_solved), tokens_left: 0.0, next_check: t0(), credited_invocations: 0 })
        .unwrap();
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let per_invocation = positive_tokens(potential_carbon_savings_per_invocation_s(&[100.0, 300.0]), 0.02, 1);
    let cheapest = minimum_cost(2, 100.0);
    assert!(10.0 * per_invocation < cheapest);

    let first = manager.check_workflow(&workflow_id).unwrap();
    let WorkflowCheckOutcome::BudgetExhausted { tokens_left: after_first, .. } = first else {
        panic!("expected a deferral, got {:?}", first);
    };
    assert!((after_first - (10.0 * per_invocation - cheapest)).abs() < 1e-9, "{}", after_first);
    assert_eq!(fixture.facade.workflow_info(&workflow_id).unwrap().unwrap().credited_invocations, 10);

    // no new traffic: only the second charge applies
    clock.advance(Duration::days(3));
    let second = manager.check_workflow(&workflow_id).unwrap();
    let WorkflowCheckOutcome::BudgetExhausted { tokens_left: after_second, .. } = second else {
        panic!("expected a deferral, got {:?}", second);
    };
    assert!((after_second - (after_first - cheapest)).abs() < 1e-9, "{}", after_second);

    // fresh traffic is credited exactly once
    let summary = summary_with_runtimes(&[("A", 0.01), ("B", 0.01)], &["home", "alt"], &[("2024-03-14", 10), ("2024-03-17", 5)]);
    fixture.add_workflow(dto, &summary);
    clock.advance(Duration::days(3));
    let third = manager.check_workflow(&workflow_id).unwrap();
    let WorkflowCheckOutcome::BudgetExhausted { tokens_left: after_third, .. } = third else {
        panic!("expected a deferral, got {:?}", third);
    };
    assert!((after_third - (after_second + 5.0 * per_invocation - cheapest)).abs() < 1e-9, "{}", after_third);
    assert_eq!(fixture.facade.workflow_info(&workflow_id).unwrap().unwrap().credited_invocations, 15);
}

#[test]
fn test_regions_without_known_distance_earn_no_savings() {
    let fixture = Fixture::new();
    fixture.add_region(RegionSetup::new("home", 100.0)).add_region(RegionSetup::new("nowhere", 900.0));
    fixture.store.remove_key(DATACENTER_REGION_TABLE, &region_key("nowhere")).unwrap();
    let summary = summary_with_runtimes(&[("A", 1.0), ("B", 1.0)], &["home"], &[("2024-03-14", 1_000)]);
    let workflow_id = fixture.add_workflow(workflow_dto("isolated", "home", &[("A", &["B"]), ("B", &[])]), &summary);
    fixture
        .facade
        .set_workflow_info(&workflow_id, &WorkflowInfo { last_solved: Some(t0() - Duration::days(2)), tokens_left: 0.0, next_check: t0(), credited_invocations: 0 })
        .unwrap();
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let outcome = manager.check_workflow(&workflow_id).unwrap();

    let cheapest = minimum_cost(2, 100.0);
    let WorkflowCheckOutcome::BudgetExhausted { tokens_left, .. } = outcome else {
        panic!("expected a deferral, got {:?}", outcome);
    };
    assert_eq!(tokens_left, -cheapest);
}

#[test]
fn test_rich_budget_solves_every_hour() {
    let fixture = Fixture::new();
    fixture.add_region(RegionSetup::new("home", 300.0)).add_region(RegionSetup::new("alt", 50.0).location(50.1, 8.7));
    let summary = summary_with_runtimes(&[("A", 1.0), ("B", 2.0)], &["home", "alt"], &[("2024-03-15", 100)]);
    let mut dto = workflow_dto("rich", "home", &[("A", &["B"]), ("B", &[])]);
    dto.constraints.priority_order = vec!["carbon".to_string()];
    let workflow_id = fixture.add_workflow(dto, &summary);
    fixture
        .facade
        .set_workflow_info(&workflow_id, &WorkflowInfo { last_solved: Some(t0() - Duration::days(1)), tokens_left: 1_000.0, next_check: t0(), credited_invocations: 0 })
        .unwrap();
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let outcome = manager.check_workflow(&workflow_id).unwrap();

    let WorkflowCheckOutcome::Solved { algorithm, number_of_solves, placements, tokens_left, next_check } = outcome else {
        panic!("expected a solve, got {:?}", outcome);
    };
    assert_eq!(algorithm, DeploymentAlgorithmType::StochasticHeuristic);
    assert_eq!(number_of_solves, 24);
    assert_eq!(placements.len(), 24);
    assert!(placements.iter().all(|(_, deployment)| deployment == &vec![1, 1]));
    assert!(tokens_left > 0.0 && tokens_left < 1_000.0 + 100.0);
    assert_eq!(next_check, t0() + Duration::seconds(COOLDOWN));

    let record = fixture.facade.staging_record(&workflow_id).unwrap().unwrap();
    assert_eq!(record.time_keys_to_staging_area_data.len(), 24);
    assert!(record.time_keys_to_staging_area_data.contains_key("23"));
}

#[test]
fn test_failing_workflow_does_not_stop_the_others() {
    let fixture = Fixture::new();
    let healthy = home_only_workflow(&fixture, "healthy", &[("2024-03-14", 40)]);
    let mut cyclic = workflow_dto("cyclic", "home", &[("A", &["B"]), ("B", &["C"]), ("C", &["B"])]);
    cyclic.entry_point = Some("A".to_string());
    let broken = fixture.add_workflow(cyclic, &summary_with_runtimes(&[("A", 1.0)], &["home"], &[("2024-03-14", 40)]));
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let report = manager.check().unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, broken);
    assert!(report.failures[0].1.contains("cycle"));
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(report.outcomes[0].0, healthy);
    assert!(fixture.facade.staging_record(&healthy).unwrap().is_some());
}

#[test]
fn test_solver_statistics_are_written() {
    let path = std::env::temp_dir().join(format!("placement_stats_{}.csv", uuid::Uuid::new_v4()));
    let fixture = Fixture::new();
    let workflow_id = home_only_workflow(&fixture, "stats", &[("2024-03-14", 40)]);
    let clock = SharedMockClock::new(t0());
    let config = OptimizerConfig { statistics_file: Some(path.to_string_lossy().to_string()), ..test_config() };

    {
        let mut manager = manager(&fixture, &clock, config);
        manager.check().unwrap();
    }

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    let row: Vec<&str> = lines[1].split(';').collect();
    assert_eq!(row[2], workflow_id.as_str());
    assert_eq!(row[3], "0");
    assert_eq!(row[4], "coarse_grained_deployment_algorithm");
    std::fs::remove_file(&path).unwrap();
}

#[test]
#[traced_test]
fn test_finished_solves_emit_analytics() {
    let fixture = Fixture::new();
    home_only_workflow(&fixture, "traced", &[("2024-03-14", 40)]);
    let clock = SharedMockClock::new(t0());
    let mut manager = manager(&fixture, &clock, test_config());

    let report = manager.check().unwrap();

    assert!(logs_contain("Hourly solve finished"));
    assert!(logs_contain(&format!("RunId={}", report.run_id)));
    assert!(logs_contain("EvaluatedDeployments=0"));
}
