use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_CONFIDENCE_RELATIVE_WIDTH, DEFAULT_MAX_ITERATIONS, DEFAULT_MONITOR_COOLDOWN, DEFAULT_SOLVE_TIME_BUDGET_S,
    DEFAULT_WORKER_COUNT, TAIL_LATENCY_THRESHOLD,
};
use crate::domain::workflow::region::Region;
use crate::error::{Error, Result};
use crate::loader::parser::parse_json_file;

fn default_worker_count() -> usize {
    DEFAULT_WORKER_COUNT
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_tail_threshold() -> f64 {
    TAIL_LATENCY_THRESHOLD
}

fn default_confidence_relative_width() -> f64 {
    DEFAULT_CONFIDENCE_RELATIVE_WIDTH
}

fn default_monitor_cooldown_s() -> i64 {
    DEFAULT_MONITOR_COOLDOWN
}

fn default_solve_time_budget_s() -> u64 {
    DEFAULT_SOLVE_TIME_BUDGET_S
}

/// Tuning of the solver. Every field has a default, so `{}` is a valid file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Simulation threads per deployment metrics calculator; 1 runs trials inline.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Percentile reported as tail, within [50, 100].
    #[serde(default = "default_tail_threshold")]
    pub tail_threshold: f64,
    #[serde(default = "default_confidence_relative_width")]
    pub confidence_relative_width: f64,
    /// Fixed seed for reproducible solves; entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_monitor_cooldown_s")]
    pub default_monitor_cooldown_s: i64,
    /// Wall-clock budget of one workflow solve, split evenly across its solve hours.
    #[serde(default = "default_solve_time_budget_s")]
    pub solve_time_budget_s: u64,
    /// `<provider>:<region>` the solver itself runs in; defaults to each workflow's home region.
    #[serde(default)]
    pub system_region: Option<String>,
    #[serde(default)]
    pub statistics_file: Option<String>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            worker_count: DEFAULT_WORKER_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tail_threshold: TAIL_LATENCY_THRESHOLD,
            confidence_relative_width: DEFAULT_CONFIDENCE_RELATIVE_WIDTH,
            seed: None,
            default_monitor_cooldown_s: DEFAULT_MONITOR_COOLDOWN,
            solve_time_budget_s: DEFAULT_SOLVE_TIME_BUDGET_S,
            system_region: None,
            statistics_file: None,
        }
    }
}

impl OptimizerConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let config: OptimizerConfig = parse_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(50.0..=100.0).contains(&self.tail_threshold) {
            return Err(Error::InvalidParameter(format!("tail_threshold must lie in [50, 100], got {}", self.tail_threshold)));
        }
        if self.worker_count == 0 {
            return Err(Error::InvalidParameter("worker_count must be at least 1".to_string()));
        }
        if self.batch_size == 0 || self.max_iterations < self.batch_size {
            return Err(Error::InvalidParameter(format!(
                "batch_size ({}) must be positive and not exceed max_iterations ({})",
                self.batch_size, self.max_iterations
            )));
        }
        if self.confidence_relative_width <= 0.0 {
            return Err(Error::InvalidParameter("confidence_relative_width must be positive".to_string()));
        }
        if self.default_monitor_cooldown_s <= 0 {
            return Err(Error::InvalidParameter("default_monitor_cooldown_s must be positive".to_string()));
        }
        self.system_region()?;
        Ok(())
    }

    pub fn system_region(&self) -> Result<Option<Region>> {
        self.system_region.as_deref().map(str::parse).transpose()
    }
}
