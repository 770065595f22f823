use std::fmt;
use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Duration, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::api::table_dto::WorkflowSummaryDto;
use crate::config::OptimizerConfig;
use crate::constants::{DISTANCE_FOR_POTENTIAL_MIGRATION, MINIMAL_SOLVE_THRESHOLD, SOLVER_INPUT_GRID_CARBON_DEFAULT};
use crate::domain::calculators::carbon_calculator::CarbonCalculator;
use crate::domain::clock::clock::SharedClock;
use crate::domain::data_access::data_access_facade::{DataAccessFacade, WorkflowInfo};
use crate::domain::data_access::solver_data::{SolverData, non_negative};
use crate::domain::deployment_algorithms::deployment_algorithm_type::DeploymentAlgorithmType;
use crate::domain::deployment_algorithms::formatter::{StagingAreaBuilder, format_deployment, hour_keys};
use crate::domain::deployment_algorithms::solve_context::SolveContext;
use crate::domain::deployment_manager::solver_statistics::{ANALYTICS_TARGET, SolverStatistics, StatParameter, StatisticEvent};
use crate::domain::deployment_manager::token_budget::{
    SolvePlan, choose_plan, deficit_cooldown_s, invocations_since, minimum_cost, positive_tokens, potential_carbon_savings_per_invocation_s,
};
use crate::domain::deployment_manager::workflow_collector::{ExternalWorkflowCollector, WorkflowCollector};
use crate::domain::simulation::deployment_metrics_calculator::DeploymentMetricsCalculator;
use crate::domain::simulation::statistics::mean;
use crate::domain::utils::id::{RunId, WorkflowId};
use crate::domain::utils::time::format_time;
use crate::domain::workflow::workflow_model::{Deployment, WorkflowModel};
use crate::error::Result;

/// What one check did for one workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowCheckOutcome {
    /// `next_check` lies in the future.
    NotDue { next_check: DateTime<Utc> },
    /// Never solved and too little traffic to justify a first solve.
    BelowThreshold { invocations: u64 },
    /// No plan fits the budget; the deficit was recorded.
    BudgetExhausted { tokens_left: f64, next_check: DateTime<Utc> },
    Solved {
        algorithm: DeploymentAlgorithmType,
        number_of_solves: u32,
        /// Winning deployment per solve hour.
        placements: Vec<(u32, Deployment)>,
        tokens_left: f64,
        next_check: DateTime<Utc>,
    },
}

impl fmt::Display for WorkflowCheckOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowCheckOutcome::NotDue { next_check } => write!(f, "not due before {}", format_time(*next_check)),
            WorkflowCheckOutcome::BelowThreshold { invocations } => write!(f, "only {} invocations, not solved", invocations),
            WorkflowCheckOutcome::BudgetExhausted { tokens_left, next_check } => {
                write!(f, "budget exhausted ({:.6} tokens), next check {}", tokens_left, format_time(*next_check))
            }
            WorkflowCheckOutcome::Solved { algorithm, number_of_solves, .. } => write!(f, "solved with {} x{}", algorithm, number_of_solves),
        }
    }
}

/// Outcomes of one manager tick.
#[derive(Debug, Clone)]
pub struct ManagerReport {
    pub run_id: RunId,
    pub outcomes: Vec<(WorkflowId, WorkflowCheckOutcome)>,
    /// Workflows whose check failed, with the error message.
    pub failures: Vec<(WorkflowId, String)>,
}

/// Per-workflow monitor: decides from the token budget whether and how to
/// re-solve, runs the solves and publishes the staging record.
pub struct DeploymentManager {
    facade: DataAccessFacade,
    config: OptimizerConfig,
    clock: SharedClock,
    collector: Box<dyn WorkflowCollector>,
    statistics: Option<SolverStatistics>,
}

impl DeploymentManager {
    pub fn new(facade: DataAccessFacade, config: OptimizerConfig, clock: SharedClock) -> Result<Self> {
        config.validate()?;
        let statistics = match &config.statistics_file {
            Some(path) => Some(SolverStatistics::init(Some(path.clone()))?),
            None => None,
        };
        Ok(DeploymentManager { facade, config, clock, collector: Box::new(ExternalWorkflowCollector), statistics })
    }

    pub fn with_collector(mut self, collector: Box<dyn WorkflowCollector>) -> Self {
        self.collector = collector;
        self
    }

    /// Checks every known workflow. A failing workflow is logged and skipped.
    pub fn check(&mut self) -> Result<ManagerReport> {
        let run_id = RunId::generate();
        let workflow_ids = self.facade.workflow_ids()?;
        log::info!("[{}] Checking {} workflows", run_id, workflow_ids.len());

        let mut report = ManagerReport { run_id: run_id.clone(), outcomes: Vec::new(), failures: Vec::new() };
        for workflow_id in workflow_ids {
            match self.check_workflow_in_run(&run_id, &workflow_id) {
                Ok(outcome) => {
                    log::info!("[{}] {}: {}", run_id, workflow_id, outcome);
                    report.outcomes.push((workflow_id, outcome));
                }
                Err(e) => {
                    log::error!("[{}] Check of workflow {} failed: {}", run_id, workflow_id, e);
                    report.failures.push((workflow_id, e.to_string()));
                }
            }
        }

        if let Some(statistics) = &self.statistics {
            statistics.flush();
        }
        Ok(report)
    }

    pub fn check_workflow(&mut self, workflow_id: &WorkflowId) -> Result<WorkflowCheckOutcome> {
        let run_id = RunId::generate();
        self.check_workflow_in_run(&run_id, workflow_id)
    }

    fn check_workflow_in_run(&mut self, run_id: &RunId, workflow_id: &WorkflowId) -> Result<WorkflowCheckOutcome> {
        let now = self.clock.now();
        let info = self.facade.workflow_info(workflow_id)?;
        if let Some(info) = &info {
            if now < info.next_check {
                return Ok(WorkflowCheckOutcome::NotDue { next_check: info.next_check });
            }
        }

        self.collector.collect(workflow_id)?;

        let config = self.facade.workflow_config(workflow_id)?;
        let summary = match self.facade.workflow_summary(workflow_id) {
            Ok(summary) => summary,
            Err(e) if e.is_missing_data() => WorkflowSummaryDto::default(),
            Err(e) => return Err(e),
        };
        let available_regions = self.facade.available_regions()?;
        let model = Arc::new(WorkflowModel::build(config, &available_regions)?);
        let data = Arc::new(SolverData::load(&self.facade, &model, &summary)?);

        let last_solved = info.as_ref().and_then(|info| info.last_solved);
        let invocations = invocations_since(&summary.daily_invocation_counts, last_solved, now);

        let (plan, tokens_after_solve) = match &info {
            None if invocations >= MINIMAL_SOLVE_THRESHOLD => {
                log::info!("[{}] {} has no solve history, running a bootstrap solve", run_id, workflow_id);
                (SolvePlan { algorithm: DeploymentAlgorithmType::CoarseGrained, number_of_solves: 1, cost: 0.0 }, 0.0)
            }
            _ if last_solved.is_none() && invocations < MINIMAL_SOLVE_THRESHOLD => {
                return Ok(WorkflowCheckOutcome::BelowThreshold { invocations });
            }
            _ => {
                let carried = info.as_ref().map(|info| info.tokens_left).unwrap_or(0.0);
                let credited = info.as_ref().map(|info| info.credited_invocations).unwrap_or(0);
                let savings = self.potential_carbon_savings(&model, &data);
                let tokens = positive_tokens(savings, Self::average_runtime_s(&summary), invocations.saturating_sub(credited)) + carried;
                let system_intensity = self.system_carbon_intensity(&model)?;

                match choose_plan(tokens, model.instance_count(), system_intensity) {
                    Some(plan) => (plan, tokens - plan.cost),
                    None => {
                        let cheapest = minimum_cost(model.instance_count(), system_intensity);
                        let tokens_left = tokens - cheapest;
                        let next_check = now + Duration::seconds(deficit_cooldown_s(cheapest - tokens, self.config.default_monitor_cooldown_s));
                        let deferred = WorkflowInfo { last_solved, tokens_left, next_check, credited_invocations: invocations.max(credited) };
                        self.facade.set_workflow_info(workflow_id, &deferred)?;
                        return Ok(WorkflowCheckOutcome::BudgetExhausted { tokens_left, next_check });
                    }
                }
            }
        };

        let placements = self.solve(run_id, &model, data, plan, now)?;

        let cooldown = Duration::seconds(self.config.default_monitor_cooldown_s);
        let next_check = now + cooldown;
        // today's traffic falls inside the next window as well
        let credited_invocations = invocations_since(&summary.daily_invocation_counts, Some(now), now);
        self.facade.set_workflow_info(workflow_id, &WorkflowInfo { last_solved: Some(now), tokens_left: tokens_after_solve, next_check, credited_invocations })?;

        Ok(WorkflowCheckOutcome::Solved {
            algorithm: plan.algorithm,
            number_of_solves: plan.number_of_solves,
            placements,
            tokens_left: tokens_after_solve,
            next_check,
        })
    }

    /// Runs `plan` for every solve hour and publishes the staging record once
    /// all hours succeeded.
    fn solve(&mut self, run_id: &RunId, model: &Arc<WorkflowModel>, data: Arc<SolverData>, plan: SolvePlan, now: DateTime<Utc>) -> Result<Vec<(u32, Deployment)>> {
        let workflow_id = model.config.workflow_id.clone();
        let hours = hour_keys(plan.number_of_solves)?;
        let per_hour_budget = StdDuration::from_secs_f64(self.config.solve_time_budget_s as f64 / plan.number_of_solves as f64);

        let mut calculator = DeploymentMetricsCalculator::new(model.clone(), data, &self.config)?;
        let seed = self.config.seed.map(|seed| seed ^ 0x5eed).unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut builder = StagingAreaBuilder::new();
        let mut placements = Vec::with_capacity(hours.len());

        for hour in hours {
            let started = Instant::now();
            let carbon_setting = if plan.number_of_solves == 1 { None } else { Some(hour) };
            calculator.update_data_for_new_hour(carbon_setting)?;

            let mut algorithm = plan.algorithm.get_instance();
            let run = {
                let mut ctx = SolveContext::new(&mut calculator, &mut rng, Some(started + per_hour_budget))?;
                algorithm.run(&mut ctx)?
            };
            let processing_time_ms = started.elapsed().as_millis() as i64;

            tracing::info!(
                target: ANALYTICS_TARGET,
                RunId = %run_id,
                WorkflowId = %workflow_id,
                Hour = hour,
                Algorithm = %plan.algorithm,
                EvaluatedDeployments = run.evaluated,
                TimedOut = run.timed_out,
                BestAverageCarbon = run.best.metrics.average_carbon,
                HomeAverageCarbon = run.home.metrics.average_carbon,
                ProcessingTime = processing_time_ms,
                "Hourly solve finished"
            );

            if let Some(statistics) = &self.statistics {
                let mut event = StatisticEvent::new();
                event
                    .set(StatParameter::Time, format_time(now))
                    .set(StatParameter::RunId, run_id.as_str())
                    .set(StatParameter::WorkflowId, workflow_id.as_str())
                    .set(StatParameter::Hour, hour)
                    .set(StatParameter::Algorithm, plan.algorithm.to_string())
                    .set(StatParameter::NumberOfSolves, plan.number_of_solves)
                    .set(StatParameter::EvaluatedDeployments, run.evaluated)
                    .set(StatParameter::TimedOut, run.timed_out)
                    .set(StatParameter::BestAverageCost, run.best.metrics.average_cost)
                    .set(StatParameter::BestAverageRuntime, run.best.metrics.average_runtime)
                    .set(StatParameter::BestAverageCarbon, run.best.metrics.average_carbon)
                    .set(StatParameter::HomeAverageCarbon, run.home.metrics.average_carbon)
                    .set(StatParameter::ProcessingTime, processing_time_ms);
                statistics.add_event(event);
            }

            builder.add_hour(hour, format_deployment(model, &run.best));
            placements.push((hour, run.best.deployment));
        }

        let expiry = now + Duration::seconds(self.config.default_monitor_cooldown_s);
        builder.publish(&self.facade, &workflow_id, expiry)?;
        log::info!("[{}] Published {} hourly placements for {}", run_id, placements.len(), workflow_id);

        Ok(placements)
    }

    /// Spread of the overall intensities of the regions near the home region.
    fn potential_carbon_savings(&self, model: &Arc<WorkflowModel>, data: &Arc<SolverData>) -> f64 {
        let mut carbon = CarbonCalculator::new(model.clone(), data.clone());
        let mut nearby = Vec::new();
        for region in 0..model.region_count() {
            if carbon.known_distance_km(model.home_region, region).is_some_and(|km| km <= DISTANCE_FOR_POTENTIAL_MIGRATION) {
                nearby.push(carbon.carbon_intensity(region));
            }
        }
        potential_carbon_savings_per_invocation_s(&nearby)
    }

    /// Sum over instances of the mean observed runtime.
    fn average_runtime_s(summary: &WorkflowSummaryDto) -> f64 {
        summary
            .runtime_samples
            .values()
            .map(|by_region| {
                let samples: Vec<f64> = by_region.values().flat_map(|samples| non_negative(samples)).collect();
                mean(&samples)
            })
            .sum()
    }

    fn system_carbon_intensity(&self, model: &WorkflowModel) -> Result<f64> {
        let region = self.config.system_region()?.unwrap_or_else(|| model.config.home_region.clone());
        Ok(self.facade.overall_carbon_intensity(&region)?.unwrap_or(SOLVER_INPUT_GRID_CARBON_DEFAULT))
    }
}
