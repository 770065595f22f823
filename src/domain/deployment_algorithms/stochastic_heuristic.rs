use std::collections::HashSet;

use rand::Rng;
use rand::seq::{IndexedRandom, index};

use crate::constants::{STOCHASTIC_BIAS_PROBABILITY, STOCHASTIC_COOLING_RATE, STOCHASTIC_INITIAL_TEMPERATURE, STOCHASTIC_LEARNING_RATE_FACTOR};
use crate::domain::deployment_algorithms::coarse_grained::CoarseGrainedDeploymentAlgorithm;
use crate::domain::deployment_algorithms::deployment_algorithm_trait::DeploymentAlgorithm;
use crate::domain::deployment_algorithms::ranker::EvaluatedDeployment;
use crate::domain::deployment_algorithms::solve_context::SolveContext;
use crate::domain::workflow::workflow_model::{Deployment, WorkflowModel};
use crate::error::Result;

/// Simulated-annealing search seeded with the coarse-grained result.
///
/// Each step moves `ceil(0.2 n + 1)` instances to new regions. A move is kept
/// when it lowers the average of the top-priority metric, or by chance with
/// probability `2^(-|home - T| / T)`; the temperature `T` cools on every kept move.
#[derive(Debug, Clone)]
pub struct StochasticHeuristicDeploymentAlgorithm {
    learning_rate_factor: f64,
    bias_probability: f64,
    initial_temperature: f64,
    cooling_rate: f64,
}

impl Default for StochasticHeuristicDeploymentAlgorithm {
    fn default() -> Self {
        StochasticHeuristicDeploymentAlgorithm {
            learning_rate_factor: STOCHASTIC_LEARNING_RATE_FACTOR,
            bias_probability: STOCHASTIC_BIAS_PROBABILITY,
            initial_temperature: STOCHASTIC_INITIAL_TEMPERATURE,
            cooling_rate: STOCHASTIC_COOLING_RATE,
        }
    }
}

impl StochasticHeuristicDeploymentAlgorithm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learning_rate(&self, instance_count: usize) -> usize {
        ((self.learning_rate_factor * instance_count as f64 + 1.0).ceil() as usize).min(instance_count)
    }

    /// Number of distinct valid deployments, saturating.
    fn combination_count(model: &WorkflowModel) -> usize {
        model.instances.indices().fold(1usize, |acc, instance| acc.saturating_mul(model.permitted_regions(instance).len()))
    }

    fn acceptance_probability(home_metric: f64, temperature: f64) -> f64 {
        2f64.powf(-(home_metric - temperature).abs() / temperature).clamp(0.0, 1.0)
    }

    fn mutate<R: Rng + ?Sized>(&self, model: &WorkflowModel, current: &[usize], bias_regions: &HashSet<usize>, rng: &mut R) -> Deployment {
        let mut next = current.to_vec();
        let flips = self.learning_rate(model.instance_count());

        for instance in index::sample(rng, model.instance_count(), flips) {
            let permitted = model.permitted_regions(instance);
            let biased: Vec<usize> = permitted.iter().copied().filter(|region| bias_regions.contains(region)).collect();

            let choice = if !biased.is_empty() && rng.random_bool(self.bias_probability) { biased.choose(rng) } else { permitted.choose(rng) };
            if let Some(&region) = choice {
                next[instance] = region;
            }
        }
        next
    }
}

impl DeploymentAlgorithm for StochasticHeuristicDeploymentAlgorithm {
    fn name(&self) -> &'static str {
        "stochastic_heuristic_deployment_algorithm"
    }

    fn generate_candidates(&mut self, ctx: &mut SolveContext<'_>) -> Result<Vec<EvaluatedDeployment>> {
        let model = ctx.model().clone();
        let top_metric = model.config.priority_order[0];
        let home = ctx.home().clone();
        let home_metric = home.metrics.average(top_metric);

        let mut candidates = CoarseGrainedDeploymentAlgorithm::new().generate_candidates(ctx)?;

        // every coarse deployment, including those rejected by the hard constraints
        let mut seen: HashSet<Deployment> =
            model.regions_permitted_for_all().into_iter().map(|region| vec![region; model.instance_count()]).collect();
        seen.insert(home.deployment.clone());

        let mut current = ctx.ranker().rank(candidates.clone()).into_iter().next().unwrap_or_else(|| home.clone());
        let mut bias_regions: HashSet<usize> = HashSet::new();
        if current.metrics.average(top_metric) < home_metric {
            bias_regions.extend(current.deployment.iter().copied());
        }

        let total_combinations = Self::combination_count(&model);
        let iterations = model.region_count() * model.instance_count() * 3;
        let mut temperature = self.initial_temperature;

        for _ in 0..iterations {
            if seen.len() >= total_combinations || ctx.deadline_passed() {
                break;
            }

            let next = self.mutate(&model, &current.deployment, &bias_regions, ctx.rng);
            if !seen.insert(next.clone()) {
                continue;
            }
            let Some(candidate) = ctx.evaluate(next)? else {
                continue;
            };

            let improved = candidate.metrics.average(top_metric) < current.metrics.average(top_metric);
            let accepted = improved || ctx.rng.random_bool(Self::acceptance_probability(home_metric, temperature));
            if improved {
                for (instance, &region) in candidate.deployment.iter().enumerate() {
                    if region != current.deployment[instance] {
                        bias_regions.insert(region);
                    }
                }
            }
            candidates.push(candidate.clone());
            if accepted {
                current = candidate;
                temperature *= self.cooling_rate;
            }
        }

        log::debug!("Stochastic search saw {} of {} deployments, final temperature {:.4}", seen.len(), total_combinations, temperature);
        Ok(candidates)
    }
}
