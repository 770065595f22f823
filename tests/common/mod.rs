#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use carbon_placement::api::table_dto::{
    CarbonRegionDto, DatacenterRegionDto, ExecutionCostDto, LocationDto, PerformanceRegionDto, ResourceRecordDto, TransmissionCostDto,
    TransmissionLatencyDto, WorkflowSummaryDto,
};
use carbon_placement::api::workflow_config_dto::{ConstraintsDto, InstanceDto, ProviderRegionDto, RegionsAndProvidersDto, WorkflowConfigDto};
use carbon_placement::config::OptimizerConfig;
use carbon_placement::domain::data_access::data_access_facade::DataAccessFacade;
use carbon_placement::domain::data_access::solver_data::SolverData;
use carbon_placement::domain::store::remote_table::{InMemoryTableStore, RemoteTableClient};
use carbon_placement::domain::store::tables::{
    AVAILABLE_REGIONS_TABLE, CARBON_REGION_TABLE, DATACENTER_REGION_TABLE, DEPLOYMENT_MANAGER_RESOURCE_TABLE, PERFORMANCE_REGION_TABLE,
    WORKFLOW_INSTANCE_TABLE,
};
use carbon_placement::domain::utils::id::WorkflowId;
use carbon_placement::domain::workflow::workflow_model::WorkflowModel;

pub const PROVIDER: &str = "aws";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

pub fn region_dto(region: &str) -> ProviderRegionDto {
    ProviderRegionDto { provider: PROVIDER.to_string(), region: region.to_string() }
}

pub fn region_key(region: &str) -> String {
    format!("{}:{}", PROVIDER, region)
}

/// Deterministic and single threaded.
pub fn test_config() -> OptimizerConfig {
    OptimizerConfig { worker_count: 1, batch_size: 50, max_iterations: 200, seed: Some(42), ..OptimizerConfig::default() }
}

/// Table contents of one region.
#[derive(Debug, Clone)]
pub struct RegionSetup {
    pub name: String,
    pub carbon_intensity: f64,
    /// Price per GB-second.
    pub compute_cost: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl RegionSetup {
    pub fn new(name: &str, carbon_intensity: f64) -> Self {
        RegionSetup { name: name.to_string(), carbon_intensity, compute_cost: 0.000_016_7, latitude: 50.0, longitude: 8.0 }
    }

    pub fn compute_cost(mut self, compute_cost: f64) -> Self {
        self.compute_cost = compute_cost;
        self
    }

    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }
}

/// Builds a workflow config from `(instance, successors)` pairs; the first instance is the entry point.
pub fn workflow_dto(name: &str, home: &str, instances: &[(&str, &[&str])]) -> WorkflowConfigDto {
    WorkflowConfigDto {
        workflow_name: name.to_string(),
        workflow_version: "0.0.1".to_string(),
        instances: instances
            .iter()
            .map(|(instance, successors)| InstanceDto {
                instance_name: instance.to_string(),
                succeeding_instances: successors.iter().map(|s| s.to_string()).collect(),
                preceding_instances: Vec::new(),
                regions_and_providers: RegionsAndProvidersDto::default(),
            })
            .collect(),
        home_region: region_dto(home),
        regions_and_providers: RegionsAndProvidersDto::default(),
        constraints: ConstraintsDto::default(),
        entry_point: None,
    }
}

/// Every instance has the same runtime samples in every listed region.
pub fn summary_with_runtimes(runtimes: &[(&str, f64)], regions: &[&str], invocations: &[(&str, u64)]) -> WorkflowSummaryDto {
    let mut summary = WorkflowSummaryDto::default();
    for (instance, runtime) in runtimes {
        let by_region: HashMap<String, Vec<f64>> = regions.iter().map(|r| (region_key(r), vec![*runtime])).collect();
        summary.runtime_samples.insert(instance.to_string(), by_region);
    }
    for (day, count) in invocations {
        summary.daily_invocation_counts.insert(day.to_string(), *count);
    }
    summary
}

pub struct Fixture {
    pub store: InMemoryTableStore,
    pub facade: DataAccessFacade,
}

impl Fixture {
    pub fn new() -> Self {
        let store = InMemoryTableStore::new();
        let facade = DataAccessFacade::new(Arc::new(store.clone()));
        Fixture { store, facade }
    }

    fn put<T: serde::Serialize>(&self, table: &str, key: &str, value: &T) {
        self.store.set_value(table, key, &serde_json::to_string(value).unwrap()).unwrap();
    }

    pub fn add_region(&self, setup: RegionSetup) -> &Self {
        let key = region_key(&setup.name);
        self.put(AVAILABLE_REGIONS_TABLE, &key, &region_dto(&setup.name));

        let mut averages: HashMap<String, f64> = (0..24).map(|h| (h.to_string(), setup.carbon_intensity)).collect();
        averages.insert("overall".to_string(), setup.carbon_intensity);
        self.put(CARBON_REGION_TABLE, &key, &CarbonRegionDto { averages, units: "gCO2eq/kWh".to_string(), ..CarbonRegionDto::default() });

        let datacenter = DatacenterRegionDto {
            execution_cost: ExecutionCostDto { invocation_cost: 0.000_000_2, compute_cost: setup.compute_cost, unit: "USD".to_string() },
            transmission_cost: TransmissionCostDto { global_data_transfer: 0.09, provider_data_transfer: 0.02, unit: "USD/GB".to_string() },
            pue: 1.15,
            cfe: 0.0,
            average_memory_power: 0.000_392_2,
            average_cpu_power: 0.002_1,
            location: Some(LocationDto { latitude: setup.latitude, longitude: setup.longitude }),
        };
        self.put(DATACENTER_REGION_TABLE, &key, &datacenter);
        self.put(PERFORMANCE_REGION_TABLE, &key, &PerformanceRegionDto { relative_performance: 1.0, transmission_latency: HashMap::new() });
        self
    }

    /// Deterministic latency `seconds` from `from` to `to`.
    pub fn set_latency(&self, from: &str, to: &str, seconds: f64) -> &Self {
        let key = region_key(from);
        let mut performance: PerformanceRegionDto = serde_json::from_str(&self.store.get_value(PERFORMANCE_REGION_TABLE, &key).unwrap().unwrap()).unwrap();
        performance.transmission_latency.insert(
            region_key(to),
            TransmissionLatencyDto { latency_distribution: vec![seconds], size_latency_distributions: Default::default(), unit: "s".to_string() },
        );
        self.put(PERFORMANCE_REGION_TABLE, &key, &performance);
        self
    }

    pub fn add_workflow(&self, config: WorkflowConfigDto, summary: &WorkflowSummaryDto) -> WorkflowId {
        let workflow_id = WorkflowId::from_name_and_version(&config.workflow_name, &config.workflow_version);
        self.put(DEPLOYMENT_MANAGER_RESOURCE_TABLE, workflow_id.as_str(), &ResourceRecordDto { workflow_config: config, extra: serde_json::Map::new() });
        self.put(WORKFLOW_INSTANCE_TABLE, workflow_id.as_str(), summary);
        workflow_id
    }

    pub fn model(&self, workflow_id: &WorkflowId) -> Arc<WorkflowModel> {
        let config = self.facade.workflow_config(workflow_id).unwrap();
        let regions = self.facade.available_regions().unwrap();
        Arc::new(WorkflowModel::build(config, &regions).unwrap())
    }

    pub fn solver_data(&self, workflow_id: &WorkflowId, model: &WorkflowModel) -> Arc<SolverData> {
        let summary = self.facade.workflow_summary(workflow_id).unwrap();
        Arc::new(SolverData::load(&self.facade, model, &summary).unwrap())
    }
}
