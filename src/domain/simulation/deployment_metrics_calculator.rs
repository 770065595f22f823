use std::sync::Arc;
use std::time::Instant;

use crate::config::OptimizerConfig;
use crate::domain::data_access::solver_data::SolverData;
use crate::domain::simulation::deployment_metrics::{DeploymentMetrics, TrialSample};
use crate::domain::simulation::statistics::relative_confidence_width;
use crate::domain::simulation::worker_pool::WorkerPool;
use crate::domain::workflow::workflow_model::{Deployment, WorkflowModel};
use crate::error::{Error, Result};

/// Estimates the metrics of a deployment by Monte Carlo simulation.
///
/// Trials run in batches until the 95% confidence interval of every metric is
/// narrow enough relative to its mean, or `max_iterations` trials were run.
pub struct DeploymentMetricsCalculator {
    model: Arc<WorkflowModel>,
    pool: WorkerPool,
    batch_size: usize,
    max_iterations: usize,
    tail_threshold: f64,
    confidence_relative_width: f64,
    home_deployment: Deployment,
    home_metrics: Option<DeploymentMetrics>,
    home_computations: usize,
    deadline: Option<Instant>,
    total_trials: usize,
}

impl DeploymentMetricsCalculator {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>, config: &OptimizerConfig) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        let pool = WorkerPool::new(model.clone(), data, config.worker_count, seed)?;
        let home_deployment = model.home_deployment();

        Ok(DeploymentMetricsCalculator {
            model,
            pool,
            batch_size: config.batch_size,
            max_iterations: config.max_iterations,
            tail_threshold: config.tail_threshold,
            confidence_relative_width: config.confidence_relative_width,
            home_deployment,
            home_metrics: None,
            home_computations: 0,
            deadline: None,
            total_trials: 0,
        })
    }

    pub fn model(&self) -> &Arc<WorkflowModel> {
        &self.model
    }

    /// Barrier: switches every worker to the carbon intensities of `hour` and
    /// drops the cached home metrics.
    pub fn update_data_for_new_hour(&mut self, hour: Option<u32>) -> Result<()> {
        self.pool.alter_carbon_setting(hour)?;
        self.home_metrics = None;
        Ok(())
    }

    /// Once past `deadline`, a running simulation stops after its current batch.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Number of times the home deployment was simulated since construction.
    pub fn home_computation_count(&self) -> usize {
        self.home_computations
    }

    pub fn total_trials(&self) -> usize {
        self.total_trials
    }

    pub fn home_deployment(&self) -> &Deployment {
        &self.home_deployment
    }

    /// Metrics of the home deployment, simulated at most once per carbon setting.
    pub fn home_metrics(&mut self) -> Result<DeploymentMetrics> {
        if let Some(metrics) = self.home_metrics {
            return Ok(metrics);
        }
        let home = self.home_deployment.clone();
        let metrics = self.simulate(&home)?;
        self.home_computations += 1;
        self.home_metrics = Some(metrics);
        Ok(metrics)
    }

    pub fn calculate_deployment_metrics(&mut self, deployment: &[usize]) -> Result<DeploymentMetrics> {
        if !self.model.is_valid_deployment(deployment) {
            return Err(Error::InvalidParameter(format!("deployment {:?} places an instance outside its permitted regions", deployment)));
        }
        if deployment == self.home_deployment.as_slice() {
            return self.home_metrics();
        }
        self.simulate(deployment)
    }

    fn converged(&self, samples: &[TrialSample]) -> bool {
        let columns: [fn(&TrialSample) -> f64; 3] = [|s| s.cost, |s| s.runtime, |s| s.carbon];
        columns.iter().all(|column| {
            let values: Vec<f64> = samples.iter().map(column).collect();
            relative_confidence_width(&values) <= self.confidence_relative_width
        })
    }

    fn simulate(&mut self, deployment: &[usize]) -> Result<DeploymentMetrics> {
        let mut samples: Vec<TrialSample> = Vec::with_capacity(self.batch_size);
        while samples.len() < self.max_iterations {
            let batch = self.batch_size.min(self.max_iterations - samples.len());
            samples.extend(self.pool.run_trials(deployment, batch)?);

            if self.converged(&samples) {
                break;
            }
            if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                log::debug!("Deadline reached after {} trials of {:?}", samples.len(), deployment);
                break;
            }
        }
        self.total_trials += samples.len();
        Ok(DeploymentMetrics::from_samples(&samples, self.tail_threshold))
    }
}
