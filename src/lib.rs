pub mod api;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod handler;
pub mod loader;
pub mod logger;
