use std::collections::HashMap;

use crate::api::table_dto::{CarbonRegionDto, DatacenterRegionDto, LocationDto, PerformanceRegionDto, TransmissionLatencyDto, WorkflowSummaryDto};
use crate::domain::data_access::data_access_facade::DataAccessFacade;
use crate::domain::workflow::workflow_model::WorkflowModel;
use crate::error::{Error, Result};

/// Turns `MissingData` into `None` and keeps every other error.
fn optional<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_missing_data() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Keeps the finite, non-negative observations; anything else would turn into
/// negative cost, carbon or latency samples.
pub(crate) fn non_negative(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|s| s.is_finite() && *s >= 0.0).collect()
}

/// Everything one solve reads from the tables, addressed by instance and region index.
///
/// Loaded once per workflow and shared immutably (behind an `Arc`) by all
/// simulation workers, so no table access happens inside a trial.
#[derive(Debug, Clone, Default)]
pub struct SolverData {
    region_keys: Vec<String>,
    carbon: Vec<Option<CarbonRegionDto>>,
    datacenter: Vec<Option<DatacenterRegionDto>>,
    performance: Vec<Option<PerformanceRegionDto>>,
    /// `[instance][region]`
    runtime_samples: Vec<Vec<Vec<f64>>>,
    data_transfer_sizes: HashMap<(usize, usize), Vec<f64>>,
    start_hop_sizes: Vec<f64>,
    invocation_probabilities: HashMap<(usize, usize), f64>,
}

impl SolverData {
    pub fn load(facade: &DataAccessFacade, model: &WorkflowModel, summary: &WorkflowSummaryDto) -> Result<Self> {
        let region_count = model.region_count();
        let mut data = SolverData {
            region_keys: (0..region_count).map(|r| model.region(r).key()).collect(),
            carbon: Vec::with_capacity(region_count),
            datacenter: Vec::with_capacity(region_count),
            performance: Vec::with_capacity(region_count),
            runtime_samples: vec![vec![Vec::new(); region_count]; model.instance_count()],
            data_transfer_sizes: HashMap::new(),
            start_hop_sizes: non_negative(&summary.start_hop_data_transfer_sizes),
            invocation_probabilities: HashMap::new(),
        };

        for region_index in 0..region_count {
            let region = model.region(region_index);
            data.carbon.push(optional(facade.carbon(region))?);
            data.datacenter.push(optional(facade.datacenter(region))?);
            data.performance.push(optional(facade.performance(region))?);
        }

        for (instance_name, by_region) in &summary.runtime_samples {
            let Ok(instance) = model.instances.value_to_index(instance_name) else {
                log::warn!("Ignoring runtime samples of unknown instance '{}'", instance_name);
                continue;
            };
            for (region_key, samples) in by_region {
                if let Ok(region) = model.regions.value_to_index(region_key) {
                    data.runtime_samples[instance][region] = non_negative(samples);
                }
            }
        }

        for (from, targets) in &summary.data_transfer_sizes {
            for (to, sizes) in targets {
                if let (Ok(from), Ok(to)) = (model.instances.value_to_index(from), model.instances.value_to_index(to)) {
                    data.data_transfer_sizes.insert((from, to), non_negative(sizes));
                }
            }
        }

        for (from, targets) in &summary.invocation_probabilities {
            for (to, probability) in targets {
                if let (Ok(from), Ok(to)) = (model.instances.value_to_index(from), model.instances.value_to_index(to)) {
                    if !(0.0..=1.0).contains(probability) {
                        return Err(Error::InvalidParameter(format!("invocation probability {} -> {} is {}", from, to, probability)));
                    }
                    data.invocation_probabilities.insert((from, to), *probability);
                }
            }
        }

        Ok(data)
    }

    /// Hourly intensity when `hour` is set and recorded, else the overall average.
    pub fn carbon_intensity(&self, region: usize, hour: Option<u32>) -> Option<f64> {
        let averages = &self.carbon.get(region)?.as_ref()?.averages;
        hour.and_then(|h| averages.get(&h.to_string()).copied()).or_else(|| averages.get("overall").copied())
    }

    pub fn transmission_distance(&self, from: usize, to: usize) -> Option<f64> {
        let lookup = |a: usize, b: usize| self.carbon.get(a)?.as_ref()?.transmission_distances.get(&self.region_keys[b]).copied();
        lookup(from, to).or_else(|| lookup(to, from))
    }

    pub fn location(&self, region: usize) -> Option<LocationDto> {
        self.datacenter.get(region)?.as_ref()?.location
    }

    pub fn datacenter(&self, region: usize) -> Option<&DatacenterRegionDto> {
        self.datacenter.get(region)?.as_ref()
    }

    pub fn relative_performance(&self, region: usize) -> f64 {
        self.performance.get(region).and_then(Option::as_ref).map(|p| p.relative_performance).filter(|p| *p > 0.0).unwrap_or(1.0)
    }

    pub fn transmission_latency(&self, from: usize, to: usize) -> Option<&TransmissionLatencyDto> {
        self.performance.get(from)?.as_ref()?.transmission_latency.get(&self.region_keys[to])
    }

    /// Recorded runtimes, empty when the pair never ran.
    pub fn runtime_samples(&self, instance: usize, region: usize) -> &[f64] {
        &self.runtime_samples[instance][region]
    }

    pub fn data_transfer_sizes(&self, from: usize, to: usize) -> &[f64] {
        self.data_transfer_sizes.get(&(from, to)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn start_hop_sizes(&self) -> &[f64] {
        &self.start_hop_sizes
    }

    /// Defaults to 1 for edges without observations.
    pub fn invocation_probability(&self, from: usize, to: usize) -> f64 {
        self.invocation_probabilities.get(&(from, to)).copied().unwrap_or(1.0)
    }
}
