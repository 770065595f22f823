use std::fmt;
use std::str::FromStr;

use crate::constants::{
    COARSE_GRAINED_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE, STOCHASTIC_HEURISTIC_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE,
};
use crate::domain::deployment_algorithms::coarse_grained::CoarseGrainedDeploymentAlgorithm;
use crate::domain::deployment_algorithms::deployment_algorithm_trait::DeploymentAlgorithm;
use crate::domain::deployment_algorithms::fine_grained::FineGrainedDeploymentAlgorithm;
use crate::domain::deployment_algorithms::stochastic_heuristic::StochasticHeuristicDeploymentAlgorithm;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeploymentAlgorithmType {
    CoarseGrained,
    FineGrained,
    StochasticHeuristic,
}

impl FromStr for DeploymentAlgorithmType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "coarse_grained_deployment_algorithm" | "coarse" => Ok(DeploymentAlgorithmType::CoarseGrained),
            "fine_grained_deployment_algorithm" | "fine" => Ok(DeploymentAlgorithmType::FineGrained),
            "stochastic_heuristic_deployment_algorithm" | "stochastic" => Ok(DeploymentAlgorithmType::StochasticHeuristic),
            _ => Err(Error::UnknownIdentifier(format!("deployment algorithm '{}'", s))),
        }
    }
}

impl fmt::Display for DeploymentAlgorithmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeploymentAlgorithmType::CoarseGrained => "coarse_grained_deployment_algorithm",
            DeploymentAlgorithmType::FineGrained => "fine_grained_deployment_algorithm",
            DeploymentAlgorithmType::StochasticHeuristic => "stochastic_heuristic_deployment_algorithm",
        };
        write!(f, "{}", name)
    }
}

impl DeploymentAlgorithmType {
    /// Algorithms the token budget may pick, most powerful first.
    pub const BUDGETED: [DeploymentAlgorithmType; 2] = [DeploymentAlgorithmType::StochasticHeuristic, DeploymentAlgorithmType::CoarseGrained];

    pub fn get_instance(&self) -> Box<dyn DeploymentAlgorithm> {
        match self {
            DeploymentAlgorithmType::CoarseGrained => Box::new(CoarseGrainedDeploymentAlgorithm::new()),
            DeploymentAlgorithmType::FineGrained => Box::new(FineGrainedDeploymentAlgorithm::new()),
            DeploymentAlgorithmType::StochasticHeuristic => Box::new(StochasticHeuristicDeploymentAlgorithm::new()),
        }
    }

    /// Solver carbon per instance and solve per gCO2eq/kWh. The fine-grained search
    /// has no estimate and is never chosen by the budget.
    pub fn carbon_per_instance_estimate(&self) -> Option<f64> {
        match self {
            DeploymentAlgorithmType::CoarseGrained => Some(COARSE_GRAINED_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE),
            DeploymentAlgorithmType::StochasticHeuristic => Some(STOCHASTIC_HEURISTIC_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE),
            DeploymentAlgorithmType::FineGrained => None,
        }
    }
}
