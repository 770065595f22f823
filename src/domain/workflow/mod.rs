pub mod dag;
pub mod indexer;
pub mod region;
pub mod workflow_config;
pub mod workflow_model;
