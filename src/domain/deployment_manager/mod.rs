pub mod deployment_manager;
pub mod solver_statistics;
pub mod token_budget;
pub mod workflow_collector;
