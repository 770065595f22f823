use std::fmt::Debug;

use crate::domain::deployment_algorithms::ranker::EvaluatedDeployment;
use crate::domain::deployment_algorithms::solve_context::SolveContext;
use crate::error::Result;

/// Result of running one generator for one solve hour.
#[derive(Debug, Clone)]
pub struct AlgorithmRun {
    pub best: EvaluatedDeployment,
    pub home: EvaluatedDeployment,
    /// Candidates that survived the hard constraints, home included.
    pub ranked_count: usize,
    /// Deployments simulated, home excluded.
    pub evaluated: usize,
    pub timed_out: bool,
}

pub trait DeploymentAlgorithm: Debug + Send {
    fn name(&self) -> &'static str;

    /// Enumerates and evaluates candidates, returning those that pass the hard
    /// constraints. Must stop between candidates once the deadline passed.
    fn generate_candidates(&mut self, ctx: &mut SolveContext<'_>) -> Result<Vec<EvaluatedDeployment>>;

    fn run(&mut self, ctx: &mut SolveContext<'_>) -> Result<AlgorithmRun> {
        let candidates = self.generate_candidates(ctx)?;
        let ranked = ctx.ranker().rank(candidates);
        let ranked_count = ranked.len();
        let best = ranked.into_iter().next().unwrap_or_else(|| ctx.home().clone());

        log::debug!(
            "{} evaluated {} deployments for {}, best {:?}",
            self.name(),
            ctx.evaluated(),
            ctx.model().config.workflow_id,
            best.deployment
        );

        Ok(AlgorithmRun { best, home: ctx.home().clone(), ranked_count, evaluated: ctx.evaluated(), timed_out: ctx.timed_out() })
    }
}
