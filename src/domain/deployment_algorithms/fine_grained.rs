use crate::domain::deployment_algorithms::deployment_algorithm_trait::DeploymentAlgorithm;
use crate::domain::deployment_algorithms::ranker::EvaluatedDeployment;
use crate::domain::deployment_algorithms::solve_context::SolveContext;
use crate::domain::workflow::workflow_model::WorkflowModel;
use crate::error::Result;

/// Exhaustive search over the cartesian product of the per-instance permitted regions.
#[derive(Debug, Default, Clone)]
pub struct FineGrainedDeploymentAlgorithm;

impl FineGrainedDeploymentAlgorithm {
    pub fn new() -> Self {
        FineGrainedDeploymentAlgorithm
    }
}

/// Odometer over `permitted_regions(i)` for every instance, last instance fastest.
struct PermittedProduct<'a> {
    model: &'a WorkflowModel,
    positions: Vec<usize>,
    exhausted: bool,
}

impl<'a> PermittedProduct<'a> {
    fn new(model: &'a WorkflowModel) -> Self {
        PermittedProduct { model, positions: vec![0; model.instance_count()], exhausted: model.instance_count() == 0 }
    }
}

impl Iterator for PermittedProduct<'_> {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self.positions.iter().enumerate().map(|(instance, &position)| self.model.permitted_regions(instance)[position]).collect();

        self.exhausted = true;
        for instance in (0..self.positions.len()).rev() {
            self.positions[instance] += 1;
            if self.positions[instance] < self.model.permitted_regions(instance).len() {
                self.exhausted = false;
                break;
            }
            self.positions[instance] = 0;
        }

        Some(current)
    }
}

impl DeploymentAlgorithm for FineGrainedDeploymentAlgorithm {
    fn name(&self) -> &'static str {
        "fine_grained_deployment_algorithm"
    }

    fn generate_candidates(&mut self, ctx: &mut SolveContext<'_>) -> Result<Vec<EvaluatedDeployment>> {
        let model = ctx.model().clone();
        let home = model.home_deployment();
        let mut candidates = Vec::new();

        for deployment in PermittedProduct::new(&model) {
            if deployment == home || !model.is_valid_deployment(&deployment) {
                continue;
            }
            if ctx.deadline_passed() {
                break;
            }
            if let Some(candidate) = ctx.evaluate(deployment)? {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
