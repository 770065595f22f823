use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderRegionDto {
    pub provider: String,
    pub region: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProviderSettingsDto {
    /// Function memory in MB.
    #[serde(default)]
    pub memory: Option<f64>,
    /// Function timeout in seconds.
    #[serde(default)]
    pub timeout: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProviderDto {
    #[serde(default)]
    pub config: ProviderSettingsDto,
}

/// Region policy. Absent lists do not restrict; absent providers enable every provider.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RegionsAndProvidersDto {
    #[serde(default)]
    pub allowed_regions: Option<Vec<ProviderRegionDto>>,
    #[serde(default)]
    pub disallowed_regions: Option<Vec<ProviderRegionDto>>,
    #[serde(default)]
    pub providers: Option<HashMap<String, ProviderDto>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintTypeDto {
    Absolute,
    Relative,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConstraintDto {
    pub value: f64,
    #[serde(rename = "type")]
    pub typ: ConstraintTypeDto,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ResourceConstraintsDto {
    #[serde(default)]
    pub cost: Option<ConstraintDto>,
    #[serde(default)]
    pub runtime: Option<ConstraintDto>,
    #[serde(default)]
    pub carbon: Option<ConstraintDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ConstraintsDto {
    #[serde(default)]
    pub hard_resource_constraints: ResourceConstraintsDto,
    #[serde(default)]
    pub soft_resource_constraints: ResourceConstraintsDto,
    /// Any ordering of "cost", "runtime" and "carbon". Missing metrics are appended.
    #[serde(default)]
    pub priority_order: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InstanceDto {
    pub instance_name: String,
    #[serde(default)]
    pub succeeding_instances: Vec<String>,
    #[serde(default)]
    pub preceding_instances: Vec<String>,
    #[serde(default)]
    pub regions_and_providers: RegionsAndProvidersDto,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkflowConfigDto {
    pub workflow_name: String,
    pub workflow_version: String,
    pub instances: Vec<InstanceDto>,
    pub home_region: ProviderRegionDto,
    #[serde(default)]
    pub regions_and_providers: RegionsAndProvidersDto,
    #[serde(default)]
    pub constraints: ConstraintsDto,
    /// Defaults to the only instance without predecessors.
    #[serde(default)]
    pub entry_point: Option<String>,
}
