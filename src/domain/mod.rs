pub mod calculators;
pub mod clock;
pub mod data_access;
pub mod deployment_algorithms;
pub mod deployment_manager;
pub mod migrator;
pub mod simulation;
pub mod store;
pub mod utils;
pub mod workflow;
