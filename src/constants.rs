//! Solver constants. The names are part of the external contract and must stay stable.

/// Base interval between two checks of the same workflow, in seconds.
pub const DEFAULT_MONITOR_COOLDOWN: i64 = 24 * 60 * 60;

/// Default percentile used for tail metrics.
pub const TAIL_LATENCY_THRESHOLD: f64 = 95.0;

/// Horizon used for invocation counting when a workflow was never solved.
pub const FORGETTING_TIME_DAYS: i64 = 30;

/// Minimum invocations since the last solve before a first solve is considered.
pub const MINIMAL_SOLVE_THRESHOLD: u64 = 10;

/// Regions within this distance (km) of the home region count as migration targets.
pub const DISTANCE_FOR_POTENTIAL_MIGRATION: f64 = 1_000.0;

/// gCO2eq saved per invocation-second per gCO2eq/kWh of carbon intensity spread.
pub const CARBON_INTENSITY_TO_INVOCATION_SECOND_ESTIMATE: f64 = 0.001;

/// Solver carbon (gCO2eq) per instance and solve, per gCO2eq/kWh of the solver's grid.
pub const COARSE_GRAINED_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE: f64 = 0.000_05;
pub const STOCHASTIC_HEURISTIC_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE: f64 = 0.000_5;

/// Carbon (gCO2eq) charged per migrated instance.
pub const MIGRATION_COST_ESTIMATE: f64 = 0.01;

/// Global-average grid carbon intensity (gCO2eq/kWh) used when a region has no data.
pub const SOLVER_INPUT_GRID_CARBON_DEFAULT: f64 = 475.0;

/// Candidate numbers of hourly solves per day.
pub const SOLVE_HOUR_OPTIONS: [u32; 8] = [1, 2, 3, 4, 6, 8, 12, 24];

/// Network energy intensity in kWh per GB and km.
pub const TRANSMISSION_ENERGY_KWH_PER_GB_KM: f64 = 0.000_01;

/// vCPU share granted per MB of configured memory (AWS Lambda allocation).
pub const MEMORY_MB_PER_VCPU: f64 = 1769.0;

/// Memory assumed for an instance that does not configure one.
pub const DEFAULT_MEMORY_MB: f64 = 1024.0;

// Monte Carlo defaults
pub const DEFAULT_WORKER_COUNT: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_MAX_ITERATIONS: usize = 2000;
pub const DEFAULT_CONFIDENCE_RELATIVE_WIDTH: f64 = 0.05;

/// Total wall-clock budget of one workflow solve, split across the solve hours.
pub const DEFAULT_SOLVE_TIME_BUDGET_S: u64 = 300;

// Stochastic heuristic tuning
pub const STOCHASTIC_LEARNING_RATE_FACTOR: f64 = 0.2;
pub const STOCHASTIC_BIAS_PROBABILITY: f64 = 0.2;
pub const STOCHASTIC_INITIAL_TEMPERATURE: f64 = 1.0;
pub const STOCHASTIC_COOLING_RATE: f64 = 0.99;

/// Timestamp format of every stored time value.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%f%z";

/// Day key format of `daily_invocation_counts`.
pub const TIME_FORMAT_DAYS: &str = "%Y-%m-%d";
