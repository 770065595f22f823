use std::cmp::Ordering;

use crate::domain::simulation::deployment_metrics::DeploymentMetrics;
use crate::domain::workflow::workflow_config::{Metric, WorkflowConfig};
use crate::domain::workflow::workflow_model::Deployment;

/// A deployment together with its simulated metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedDeployment {
    pub deployment: Deployment,
    pub metrics: DeploymentMetrics,
}

impl EvaluatedDeployment {
    pub fn new(deployment: Deployment, metrics: DeploymentMetrics) -> Self {
        EvaluatedDeployment { deployment, metrics }
    }
}

/// Applies the hard constraints and orders deployments by the priority order.
///
/// Relative constraints are measured against the tail metrics of the home
/// deployment of the current solve hour.
#[derive(Debug, Clone)]
pub struct Ranker<'a> {
    config: &'a WorkflowConfig,
    home: &'a EvaluatedDeployment,
}

impl<'a> Ranker<'a> {
    pub fn new(config: &'a WorkflowConfig, home: &'a EvaluatedDeployment) -> Self {
        Ranker { config, home }
    }

    /// The home deployment always passes.
    pub fn passes_hard_constraints(&self, candidate: &EvaluatedDeployment) -> bool {
        if candidate.deployment == self.home.deployment {
            return true;
        }
        Metric::ALL.iter().all(|&metric| match self.config.hard_resource_constraints.get(metric) {
            Some(constraint) => !constraint.is_absolute_or_relative_failed(candidate.metrics.tail(metric), self.home.metrics.tail(metric)),
            None => true,
        })
    }

    /// Whether the tail of `metric` is within its soft constraint. Unconstrained metrics always are.
    pub fn soft_constraint_satisfied(&self, metric: Metric, metrics: &DeploymentMetrics) -> bool {
        match self.config.soft_resource_constraints.get(metric) {
            Some(constraint) => !constraint.is_absolute_or_relative_failed(metrics.tail(metric), self.home.metrics.tail(metric)),
            None => true,
        }
    }

    /// Lexicographic over the priority order: satisfied soft constraint first,
    /// then the smaller average. Full ties go to the home deployment, then to the
    /// smaller region vector.
    pub fn compare(&self, a: &EvaluatedDeployment, b: &EvaluatedDeployment) -> Ordering {
        for &metric in &self.config.priority_order {
            let soft_a = self.soft_constraint_satisfied(metric, &a.metrics);
            let soft_b = self.soft_constraint_satisfied(metric, &b.metrics);
            let ordering = soft_b.cmp(&soft_a).then_with(|| a.metrics.average(metric).total_cmp(&b.metrics.average(metric)));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        let a_home = a.deployment == self.home.deployment;
        let b_home = b.deployment == self.home.deployment;
        b_home.cmp(&a_home).then_with(|| a.deployment.cmp(&b.deployment))
    }

    /// Filters `candidates` by the hard constraints and sorts the rest, best first.
    /// The home deployment is added when missing, so the result is never empty.
    pub fn rank(&self, candidates: Vec<EvaluatedDeployment>) -> Vec<EvaluatedDeployment> {
        let mut ranked: Vec<EvaluatedDeployment> = candidates.into_iter().filter(|candidate| self.passes_hard_constraints(candidate)).collect();
        if !ranked.iter().any(|candidate| candidate.deployment == self.home.deployment) {
            ranked.push(self.home.clone());
        }
        ranked.sort_by(|a, b| self.compare(a, b));
        ranked.dedup_by(|a, b| a.deployment == b.deployment);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::workflow_config_dto::WorkflowConfigDto;

    fn config(hard: &str, soft: &str, priority: &str) -> WorkflowConfig {
        let json = format!(
            r#"{{
                "workflow_name": "wf", "workflow_version": "1",
                "instances": [{{"instance_name": "a", "succeeding_instances": [], "preceding_instances": [], "regions_and_providers": {{}}}}],
                "home_region": {{"provider": "p", "region": "home"}},
                "regions_and_providers": {{}},
                "constraints": {{"hard_resource_constraints": {}, "soft_resource_constraints": {}, "priority_order": {}}}
            }}"#,
            hard, soft, priority
        );
        let dto: WorkflowConfigDto = serde_json::from_str(&json).unwrap();
        WorkflowConfig::from_dto(&dto).unwrap()
    }

    fn metrics(cost: f64, runtime: f64, carbon: f64) -> DeploymentMetrics {
        DeploymentMetrics {
            average_cost: cost,
            average_runtime: runtime,
            average_carbon: carbon,
            tail_cost: cost * 1.5,
            tail_runtime: runtime * 1.5,
            tail_carbon: carbon * 1.5,
        }
    }

    #[test]
    fn test_hard_constraints_filter_but_keep_home() {
        let config = config(r#"{"cost": {"value": 1.0, "type": "absolute"}}"#, "{}", r#"["carbon"]"#);
        let home = EvaluatedDeployment::new(vec![0], metrics(2.0, 1.0, 100.0));
        let ranker = Ranker::new(&config, &home);

        let cheap = EvaluatedDeployment::new(vec![1], metrics(0.5, 1.0, 80.0));
        let expensive = EvaluatedDeployment::new(vec![2], metrics(5.0, 1.0, 10.0));

        assert!(ranker.passes_hard_constraints(&home));
        assert!(ranker.passes_hard_constraints(&cheap));
        assert!(!ranker.passes_hard_constraints(&expensive));

        let ranked = ranker.rank(vec![expensive, cheap.clone()]);
        assert_eq!(ranked.iter().map(|c| c.deployment.clone()).collect::<Vec<_>>(), vec![vec![1], vec![0]]);
    }

    #[test]
    fn test_relative_hard_constraint_uses_home_tail() {
        let config = config(r#"{"runtime": {"value": 1.1, "type": "relative"}}"#, "{}", r#"["carbon"]"#);
        let home = EvaluatedDeployment::new(vec![0], metrics(1.0, 10.0, 100.0));
        let ranker = Ranker::new(&config, &home);

        // home tail runtime = 15, bound = 16.5
        assert!(ranker.passes_hard_constraints(&EvaluatedDeployment::new(vec![1], metrics(1.0, 11.0, 50.0))));
        assert!(!ranker.passes_hard_constraints(&EvaluatedDeployment::new(vec![1], metrics(1.0, 11.1, 50.0))));
    }

    #[test]
    fn test_soft_constraint_tier_beats_lower_average() {
        let config = config("{}", r#"{"carbon": {"value": 60.0, "type": "absolute"}}"#, r#"["carbon", "cost"]"#);
        let home = EvaluatedDeployment::new(vec![0], metrics(1.0, 1.0, 100.0));
        let ranker = Ranker::new(&config, &home);

        // tail 45 satisfies the bound, tail 75 does not
        let satisfied = EvaluatedDeployment::new(vec![1], metrics(1.0, 1.0, 30.0));
        let violated = EvaluatedDeployment::new(vec![2], metrics(1.0, 1.0, 50.0));
        assert_eq!(ranker.compare(&satisfied, &violated), Ordering::Less);

        let better_average_same_tier = EvaluatedDeployment::new(vec![3], metrics(1.0, 1.0, 20.0));
        assert_eq!(ranker.rank(vec![satisfied, violated, better_average_same_tier])[0].deployment, vec![3]);
    }

    #[test]
    fn test_ties_fall_through_priorities_then_prefer_home() {
        let config = config("{}", "{}", r#"["carbon"]"#);
        let home = EvaluatedDeployment::new(vec![1], metrics(2.0, 1.0, 100.0));
        let ranker = Ranker::new(&config, &home);

        // equal carbon, cheaper wins on the appended cost priority
        let cheaper = EvaluatedDeployment::new(vec![2], metrics(1.0, 1.0, 100.0));
        assert_eq!(ranker.rank(vec![cheaper.clone()])[0], cheaper);

        // full tie: home first, then the smaller vector
        let same_as_home = EvaluatedDeployment::new(vec![2], home.metrics);
        let also_same = EvaluatedDeployment::new(vec![0], home.metrics);
        let ranked = ranker.rank(vec![same_as_home, also_same]);
        assert_eq!(ranked.iter().map(|c| c.deployment[0]).collect::<Vec<_>>(), vec![1, 0, 2]);
    }

    #[test]
    fn test_empty_candidate_list_yields_home() {
        let config = config("{}", "{}", "[]");
        let home = EvaluatedDeployment::new(vec![0], metrics(1.0, 1.0, 1.0));
        let ranked = Ranker::new(&config, &home).rank(Vec::new());
        assert_eq!(ranked, vec![home]);
    }
}
