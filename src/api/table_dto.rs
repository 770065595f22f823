use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::api::workflow_config_dto::{ProviderRegionDto, WorkflowConfigDto};

// Records written by the data collectors. Read-only for the solver.

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CarbonRegionDto {
    /// "overall" plus the hour keys "0".."23", in gCO2eq/kWh.
    pub averages: HashMap<String, f64>,
    #[serde(default)]
    pub units: String,
    /// Distance in km to other regions, keyed "<provider>:<region>".
    #[serde(default)]
    pub transmission_distances: HashMap<String, f64>,
    #[serde(default)]
    pub transmission_distances_unit: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ExecutionCostDto {
    /// Flat price per invocation.
    #[serde(default)]
    pub invocation_cost: f64,
    /// Price per GB-second.
    pub compute_cost: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TransmissionCostDto {
    /// Egress price per GB to any other region.
    pub global_data_transfer: f64,
    #[serde(default)]
    pub provider_data_transfer: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default)]
pub struct LocationDto {
    pub latitude: f64,
    pub longitude: f64,
}

fn default_pue() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct DatacenterRegionDto {
    pub execution_cost: ExecutionCostDto,
    pub transmission_cost: TransmissionCostDto,
    #[serde(default = "default_pue")]
    pub pue: f64,
    #[serde(default)]
    pub cfe: f64,
    /// kW per GB of memory.
    #[serde(default)]
    pub average_memory_power: f64,
    /// kW per vCPU.
    #[serde(default)]
    pub average_cpu_power: f64,
    #[serde(default)]
    pub location: Option<LocationDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TransmissionLatencyDto {
    /// Latency samples in seconds for a minimal payload.
    pub latency_distribution: Vec<f64>,
    /// Latency samples keyed by payload size in GB.
    #[serde(default)]
    pub size_latency_distributions: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub unit: String,
}

fn default_relative_performance() -> f64 {
    1.0
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PerformanceRegionDto {
    /// Runtime factor relative to the reference region (1.0 = same speed).
    #[serde(default = "default_relative_performance")]
    pub relative_performance: f64,
    /// Keyed by destination region.
    #[serde(default)]
    pub transmission_latency: HashMap<String, TransmissionLatencyDto>,
}

/// Historical observations of one workflow, written by the workflow collector.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct WorkflowSummaryDto {
    /// Keyed by day (`%Y-%m-%d`).
    #[serde(default)]
    pub daily_invocation_counts: BTreeMap<String, u64>,
    /// instance -> region -> runtimes in seconds.
    #[serde(default)]
    pub runtime_samples: HashMap<String, HashMap<String, Vec<f64>>>,
    /// from instance -> to instance -> payload sizes in GB.
    #[serde(default)]
    pub data_transfer_sizes: HashMap<String, HashMap<String, Vec<f64>>>,
    /// Payload sizes in GB of the request reaching the entry point.
    #[serde(default)]
    pub start_hop_data_transfer_sizes: Vec<f64>,
    /// from instance -> to instance -> probability that the edge fires.
    #[serde(default)]
    pub invocation_probabilities: HashMap<String, HashMap<String, f64>>,
}

// Records owned by the deployment manager.

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WorkflowInfoDto {
    #[serde(default)]
    pub last_solved: Option<String>,
    pub tokens_left: f64,
    pub next_check: String,
    /// Invocations since `last_solved` already paid into `tokens_left`.
    #[serde(default)]
    pub credited_invocations: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct PlacementMetricsDto {
    pub average_cost: f64,
    pub average_runtime: f64,
    pub average_carbon: f64,
    pub tail_cost: f64,
    pub tail_runtime: f64,
    pub tail_carbon: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HourlyPlacementDto {
    pub instances: BTreeMap<String, ProviderRegionDto>,
    #[serde(default)]
    pub metrics: Option<PlacementMetricsDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StagingAreaRecordDto {
    pub expiry_time: String,
    pub time_keys_to_staging_area_data: BTreeMap<String, HourlyPlacementDto>,
}

/// Record of the deploy collaborator. Only the workflow configuration is read here.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ResourceRecordDto {
    pub workflow_config: WorkflowConfigDto,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PlacementDecisionDto {
    pub time_keys_to_staging_area_data: BTreeMap<String, HourlyPlacementDto>,
    pub migrated_at: String,
}

pub type AvailableRegionDto = ProviderRegionDto;
