pub mod coarse_grained;
pub mod deployment_algorithm_trait;
pub mod deployment_algorithm_type;
pub mod fine_grained;
pub mod formatter;
pub mod ranker;
pub mod solve_context;
pub mod stochastic_heuristic;
