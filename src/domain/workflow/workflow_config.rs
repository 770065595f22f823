use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::workflow_config_dto::{ConstraintDto, ConstraintTypeDto, RegionsAndProvidersDto, ResourceConstraintsDto, WorkflowConfigDto};
use crate::constants::DEFAULT_MEMORY_MB;
use crate::domain::utils::id::{InstanceName, WorkflowId};
use crate::domain::workflow::region::Region;
use crate::error::{Error, Result};

/// The three optimised quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cost,
    Runtime,
    Carbon,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Carbon, Metric::Cost, Metric::Runtime];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Cost => "cost",
            Metric::Runtime => "runtime",
            Metric::Carbon => "carbon",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "cost" => Ok(Metric::Cost),
            "runtime" => Ok(Metric::Runtime),
            "carbon" => Ok(Metric::Carbon),
            _ => Err(Error::ConfigInvalid(format!("unknown metric '{}' in priority order", value))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub value: f64,
    pub typ: ConstraintType,
}

impl Constraint {
    pub fn absolute(value: f64) -> Self {
        Constraint { value, typ: ConstraintType::Absolute }
    }

    pub fn relative(value: f64) -> Self {
        Constraint { value, typ: ConstraintType::Relative }
    }

    /// True when `value` exceeds the bound: the literal threshold for absolute
    /// constraints, `threshold × home` for relative ones.
    pub fn is_absolute_or_relative_failed(&self, value: f64, home: f64) -> bool {
        match self.typ {
            ConstraintType::Absolute => value > self.value,
            ConstraintType::Relative => value > self.value * home,
        }
    }
}

impl From<&ConstraintDto> for Constraint {
    fn from(dto: &ConstraintDto) -> Self {
        let typ = match dto.typ {
            ConstraintTypeDto::Absolute => ConstraintType::Absolute,
            ConstraintTypeDto::Relative => ConstraintType::Relative,
        };
        Constraint { value: dto.value, typ }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceConstraints {
    pub cost: Option<Constraint>,
    pub runtime: Option<Constraint>,
    pub carbon: Option<Constraint>,
}

impl ResourceConstraints {
    pub fn get(&self, metric: Metric) -> Option<&Constraint> {
        match metric {
            Metric::Cost => self.cost.as_ref(),
            Metric::Runtime => self.runtime.as_ref(),
            Metric::Carbon => self.carbon.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cost.is_none() && self.runtime.is_none() && self.carbon.is_none()
    }

    fn from_dto(dto: &ResourceConstraintsDto, kind: &str) -> Result<Self> {
        let constraints = ResourceConstraints {
            cost: dto.cost.as_ref().map(Constraint::from),
            runtime: dto.runtime.as_ref().map(Constraint::from),
            carbon: dto.carbon.as_ref().map(Constraint::from),
        };
        for metric in Metric::ALL {
            if let Some(constraint) = constraints.get(metric) {
                if !constraint.value.is_finite() || constraint.value < 0.0 {
                    return Err(Error::ConfigInvalid(format!("{} constraint on {} must be a non-negative number", kind, metric)));
                }
            }
        }
        Ok(constraints)
    }
}

/// Region policy of a workflow or of a single instance.
#[derive(Debug, Clone, Default)]
pub struct RegionPolicy {
    /// `None` allows every region.
    pub allowed_regions: Option<HashSet<Region>>,
    pub disallowed_regions: HashSet<Region>,
    /// `None` enables every provider. Values are memory settings in MB.
    pub providers: Option<HashMap<String, Option<f64>>>,
}

impl RegionPolicy {
    pub fn permits(&self, region: &Region) -> bool {
        if let Some(providers) = &self.providers {
            if !providers.contains_key(&region.provider) {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed_regions {
            if !allowed.contains(region) {
                return false;
            }
        }
        !self.disallowed_regions.contains(region)
    }

    pub fn memory_mb(&self, provider: &str) -> Option<f64> {
        self.providers.as_ref().and_then(|providers| providers.get(provider).copied().flatten())
    }
}

impl From<&RegionsAndProvidersDto> for RegionPolicy {
    fn from(dto: &RegionsAndProvidersDto) -> Self {
        let allowed_regions = dto
            .allowed_regions
            .as_ref()
            .filter(|regions| !regions.is_empty())
            .map(|regions| regions.iter().map(Region::from).collect());
        let disallowed_regions = dto.disallowed_regions.as_ref().map(|regions| regions.iter().map(Region::from).collect()).unwrap_or_default();
        let providers = dto
            .providers
            .as_ref()
            .map(|providers| providers.iter().map(|(name, provider)| (name.clone(), provider.config.memory)).collect());

        RegionPolicy { allowed_regions, disallowed_regions, providers }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub name: InstanceName,
    pub succeeding_instances: Vec<String>,
    pub preceding_instances: Vec<String>,
    pub policy: RegionPolicy,
}

/// Validated workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub workflow_id: WorkflowId,
    pub workflow_name: String,
    pub workflow_version: String,
    pub instances: Vec<InstanceConfig>,
    pub home_region: Region,
    pub policy: RegionPolicy,
    pub hard_resource_constraints: ResourceConstraints,
    pub soft_resource_constraints: ResourceConstraints,
    /// Always holds all three metrics, most important first.
    pub priority_order: Vec<Metric>,
    pub entry_point: String,
}

impl WorkflowConfig {
    pub fn from_dto(dto: &WorkflowConfigDto) -> Result<Self> {
        if dto.instances.is_empty() {
            return Err(Error::ConfigInvalid(format!("workflow '{}' has no instances", dto.workflow_name)));
        }

        let mut names = HashSet::new();
        for instance in &dto.instances {
            if !names.insert(instance.instance_name.as_str()) {
                return Err(Error::ConfigInvalid(format!("duplicate instance name '{}'", instance.instance_name)));
            }
        }

        for instance in &dto.instances {
            for neighbour in instance.succeeding_instances.iter().chain(instance.preceding_instances.iter()) {
                if !names.contains(neighbour.as_str()) {
                    return Err(Error::ConfigInvalid(format!("instance '{}' references unknown instance '{}'", instance.instance_name, neighbour)));
                }
            }
        }

        let priority_order = Self::build_priority_order(&dto.constraints.priority_order)?;
        let entry_point = Self::find_entry_point(dto)?;

        let instances = dto
            .instances
            .iter()
            .map(|instance| InstanceConfig {
                name: InstanceName::new(instance.instance_name.clone()),
                succeeding_instances: instance.succeeding_instances.clone(),
                preceding_instances: instance.preceding_instances.clone(),
                policy: RegionPolicy::from(&instance.regions_and_providers),
            })
            .collect();

        let config = WorkflowConfig {
            workflow_id: WorkflowId::from_name_and_version(&dto.workflow_name, &dto.workflow_version),
            workflow_name: dto.workflow_name.clone(),
            workflow_version: dto.workflow_version.clone(),
            instances,
            home_region: Region::from(&dto.home_region),
            policy: RegionPolicy::from(&dto.regions_and_providers),
            hard_resource_constraints: ResourceConstraints::from_dto(&dto.constraints.hard_resource_constraints, "hard")?,
            soft_resource_constraints: ResourceConstraints::from_dto(&dto.constraints.soft_resource_constraints, "soft")?,
            priority_order,
            entry_point,
        };

        if !config.policy.permits(&config.home_region) {
            return Err(Error::ConfigInvalid(format!("home region {} is not permitted by the workflow policy", config.home_region)));
        }

        Ok(config)
    }

    fn build_priority_order(raw: &[String]) -> Result<Vec<Metric>> {
        let mut order: Vec<Metric> = Vec::with_capacity(3);
        for name in raw {
            let metric: Metric = name.parse()?;
            if order.contains(&metric) {
                return Err(Error::ConfigInvalid(format!("metric '{}' listed twice in priority order", name)));
            }
            order.push(metric);
        }
        for metric in Metric::ALL {
            if !order.contains(&metric) {
                order.push(metric);
            }
        }
        Ok(order)
    }

    fn find_entry_point(dto: &WorkflowConfigDto) -> Result<String> {
        if let Some(entry_point) = &dto.entry_point {
            if dto.instances.iter().any(|instance| &instance.instance_name == entry_point) {
                return Ok(entry_point.clone());
            }
            return Err(Error::ConfigInvalid(format!("entry point '{}' is not an instance", entry_point)));
        }

        let targets: HashSet<&str> = dto.instances.iter().flat_map(|instance| instance.succeeding_instances.iter().map(String::as_str)).collect();
        let roots: Vec<&str> = dto
            .instances
            .iter()
            .filter(|instance| instance.preceding_instances.is_empty() && !targets.contains(instance.instance_name.as_str()))
            .map(|instance| instance.instance_name.as_str())
            .collect();

        match roots.as_slice() {
            [root] => Ok(root.to_string()),
            [] => Err(Error::ConfigInvalid("workflow has no entry point".to_string())),
            _ => Err(Error::ConfigInvalid(format!("workflow has several entry points: {}", roots.join(", ")))),
        }
    }

    /// Regions of `available` that both the workflow and the instance policy permit.
    pub fn permitted_regions(&self, instance: usize, available: &[Region]) -> Vec<Region> {
        let instance_policy = &self.instances[instance].policy;
        available.iter().filter(|region| self.policy.permits(region) && instance_policy.permits(region)).cloned().collect()
    }

    /// Memory of `instance` when deployed with `provider`: instance setting, then
    /// workflow setting, then the default.
    pub fn memory_mb(&self, instance: usize, provider: &str) -> f64 {
        self.instances[instance].policy.memory_mb(provider).or_else(|| self.policy.memory_mb(provider)).unwrap_or(DEFAULT_MEMORY_MB)
    }

    /// All `(from, to)` instance-name edges, merging successor and predecessor lists.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for instance in &self.instances {
            for successor in &instance.succeeding_instances {
                edges.push((instance.name.id.clone(), successor.clone()));
            }
            for predecessor in &instance.preceding_instances {
                edges.push((predecessor.clone(), instance.name.id.clone()));
            }
        }
        edges
    }
}
