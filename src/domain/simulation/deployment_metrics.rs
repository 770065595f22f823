use crate::api::table_dto::PlacementMetricsDto;
use crate::domain::simulation::statistics::{mean, tail};
use crate::domain::workflow::workflow_config::Metric;

/// Totals of one Monte Carlo trial.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrialSample {
    pub cost: f64,
    pub runtime: f64,
    pub carbon: f64,
}

/// Averages and tails of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeploymentMetrics {
    pub average_cost: f64,
    pub average_runtime: f64,
    pub average_carbon: f64,
    pub tail_cost: f64,
    pub tail_runtime: f64,
    pub tail_carbon: f64,
}

impl DeploymentMetrics {
    pub fn from_samples(samples: &[TrialSample], tail_threshold: f64) -> Self {
        let costs: Vec<f64> = samples.iter().map(|s| s.cost).collect();
        let runtimes: Vec<f64> = samples.iter().map(|s| s.runtime).collect();
        let carbons: Vec<f64> = samples.iter().map(|s| s.carbon).collect();

        DeploymentMetrics {
            average_cost: mean(&costs),
            average_runtime: mean(&runtimes),
            average_carbon: mean(&carbons),
            tail_cost: tail(&costs, tail_threshold),
            tail_runtime: tail(&runtimes, tail_threshold),
            tail_carbon: tail(&carbons, tail_threshold),
        }
    }

    pub fn average(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cost => self.average_cost,
            Metric::Runtime => self.average_runtime,
            Metric::Carbon => self.average_carbon,
        }
    }

    pub fn tail(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Cost => self.tail_cost,
            Metric::Runtime => self.tail_runtime,
            Metric::Carbon => self.tail_carbon,
        }
    }

    pub fn to_dto(&self) -> PlacementMetricsDto {
        PlacementMetricsDto {
            average_cost: self.average_cost,
            average_runtime: self.average_runtime,
            average_carbon: self.average_carbon,
            tail_cost: self.tail_cost,
            tail_runtime: self.tail_runtime,
            tail_carbon: self.tail_carbon,
        }
    }
}
