pub mod deployment_metrics;
pub mod deployment_metrics_calculator;
pub mod input_manager;
pub mod statistics;
pub mod worker_pool;
pub mod workflow_instance;
