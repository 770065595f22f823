use crate::domain::deployment_algorithms::deployment_algorithm_trait::DeploymentAlgorithm;
use crate::domain::deployment_algorithms::ranker::EvaluatedDeployment;
use crate::domain::deployment_algorithms::solve_context::SolveContext;
use crate::error::Result;

/// Places the whole workflow in one region, for every region all instances may use.
#[derive(Debug, Default, Clone)]
pub struct CoarseGrainedDeploymentAlgorithm;

impl CoarseGrainedDeploymentAlgorithm {
    pub fn new() -> Self {
        CoarseGrainedDeploymentAlgorithm
    }
}

impl DeploymentAlgorithm for CoarseGrainedDeploymentAlgorithm {
    fn name(&self) -> &'static str {
        "coarse_grained_deployment_algorithm"
    }

    fn generate_candidates(&mut self, ctx: &mut SolveContext<'_>) -> Result<Vec<EvaluatedDeployment>> {
        let model = ctx.model().clone();
        let mut candidates = Vec::new();

        for region in model.regions_permitted_for_all() {
            if region == model.home_region {
                continue;
            }
            if ctx.deadline_passed() {
                break;
            }
            if let Some(candidate) = ctx.evaluate(vec![region; model.instance_count()])? {
                candidates.push(candidate);
            }
        }

        Ok(candidates)
    }
}
