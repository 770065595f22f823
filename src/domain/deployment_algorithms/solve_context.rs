use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;

use crate::domain::deployment_algorithms::ranker::{EvaluatedDeployment, Ranker};
use crate::domain::simulation::deployment_metrics_calculator::DeploymentMetricsCalculator;
use crate::domain::workflow::workflow_model::{Deployment, WorkflowModel};
use crate::error::Result;

/// State shared by the generators during one hourly solve.
pub struct SolveContext<'a> {
    model: Arc<WorkflowModel>,
    calculator: &'a mut DeploymentMetricsCalculator,
    pub rng: &'a mut StdRng,
    deadline: Option<Instant>,
    home: EvaluatedDeployment,
    timed_out: bool,
    evaluated: usize,
}

impl<'a> SolveContext<'a> {
    /// Simulates (or reuses) the home deployment of the calculator's current hour.
    pub fn new(calculator: &'a mut DeploymentMetricsCalculator, rng: &'a mut StdRng, deadline: Option<Instant>) -> Result<Self> {
        calculator.set_deadline(deadline);
        let home_metrics = calculator.home_metrics()?;
        let home = EvaluatedDeployment::new(calculator.home_deployment().clone(), home_metrics);
        let model = calculator.model().clone();

        Ok(SolveContext { model, calculator, rng, deadline, home, timed_out: false, evaluated: 0 })
    }

    pub fn model(&self) -> &Arc<WorkflowModel> {
        &self.model
    }

    pub fn home(&self) -> &EvaluatedDeployment {
        &self.home
    }

    pub fn ranker(&self) -> Ranker<'_> {
        Ranker::new(&self.model.config, &self.home)
    }

    /// Checked between candidates. Once true it stays true.
    pub fn deadline_passed(&mut self) -> bool {
        if !self.timed_out && self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            log::debug!("Solve deadline reached after {} candidates", self.evaluated);
            self.timed_out = true;
        }
        self.timed_out
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Simulates `deployment`; `None` when it fails a hard constraint.
    pub fn evaluate(&mut self, deployment: Deployment) -> Result<Option<EvaluatedDeployment>> {
        let metrics = self.calculator.calculate_deployment_metrics(&deployment)?;
        self.evaluated += 1;
        let candidate = EvaluatedDeployment::new(deployment, metrics);
        if self.ranker().passes_hard_constraints(&candidate) { Ok(Some(candidate)) } else { Ok(None) }
    }
}
