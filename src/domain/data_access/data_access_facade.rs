use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::api::table_dto::{
    CarbonRegionDto, DatacenterRegionDto, PerformanceRegionDto, PlacementDecisionDto, ResourceRecordDto, StagingAreaRecordDto, WorkflowInfoDto,
    WorkflowSummaryDto,
};
use crate::domain::store::remote_table::RemoteTableClient;
use crate::domain::store::tables::*;
use crate::domain::utils::id::WorkflowId;
use crate::domain::utils::time::{format_time, parse_time};
use crate::domain::workflow::region::Region;
use crate::domain::workflow::workflow_config::WorkflowConfig;
use crate::error::{Error, Result};

/// Per-workflow bookkeeping of the deployment manager.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowInfo {
    pub last_solved: Option<DateTime<Utc>>,
    pub tokens_left: f64,
    pub next_check: DateTime<Utc>,
    /// Invocations since `last_solved` already converted into tokens.
    pub credited_invocations: u64,
}

impl WorkflowInfo {
    pub fn from_dto(dto: &WorkflowInfoDto) -> Result<Self> {
        Ok(WorkflowInfo {
            last_solved: dto.last_solved.as_deref().map(parse_time).transpose()?,
            tokens_left: dto.tokens_left,
            next_check: parse_time(&dto.next_check)?,
            credited_invocations: dto.credited_invocations,
        })
    }

    pub fn to_dto(&self) -> WorkflowInfoDto {
        WorkflowInfoDto {
            last_solved: self.last_solved.map(format_time),
            tokens_left: self.tokens_left,
            next_check: format_time(self.next_check),
            credited_invocations: self.credited_invocations,
        }
    }
}

/// Typed access to every table the solver reads or writes.
///
/// Lookups of region and workflow records return `MissingData` when the key is
/// absent, so callers can pick a default; I/O failures surface as `TableUnavailable`.
#[derive(Debug, Clone)]
pub struct DataAccessFacade {
    client: Arc<dyn RemoteTableClient>,
}

impl DataAccessFacade {
    pub fn new(client: Arc<dyn RemoteTableClient>) -> Self {
        DataAccessFacade { client }
    }

    pub fn client(&self) -> &Arc<dyn RemoteTableClient> {
        &self.client
    }

    fn get_record<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<Option<T>> {
        match self.client.get_value(table, key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn require_record<T: DeserializeOwned>(&self, table: &str, key: &str) -> Result<T> {
        self.get_record(table, key)?.ok_or_else(|| Error::missing(table, key))
    }

    fn put_record<T: Serialize>(&self, table: &str, key: &str, record: &T) -> Result<()> {
        self.client.set_value(table, key, &serde_json::to_string(record)?)
    }

    /// Regions published by the data collector, sorted by key.
    pub fn available_regions(&self) -> Result<Vec<Region>> {
        let mut regions = self.client.get_keys(AVAILABLE_REGIONS_TABLE)?.iter().map(|key| key.parse()).collect::<Result<Vec<Region>>>()?;
        regions.sort();
        Ok(regions)
    }

    pub fn workflow_ids(&self) -> Result<Vec<WorkflowId>> {
        Ok(self.client.get_keys(DEPLOYMENT_MANAGER_RESOURCE_TABLE)?.into_iter().map(WorkflowId::new).collect())
    }

    pub fn workflow_config(&self, workflow_id: &WorkflowId) -> Result<WorkflowConfig> {
        let record: ResourceRecordDto = self.require_record(DEPLOYMENT_MANAGER_RESOURCE_TABLE, workflow_id.as_str())?;
        WorkflowConfig::from_dto(&record.workflow_config)
    }

    pub fn workflow_summary(&self, workflow_id: &WorkflowId) -> Result<WorkflowSummaryDto> {
        self.require_record(WORKFLOW_INSTANCE_TABLE, workflow_id.as_str())
    }

    pub fn carbon(&self, region: &Region) -> Result<CarbonRegionDto> {
        self.require_record(CARBON_REGION_TABLE, &region.key())
    }

    pub fn datacenter(&self, region: &Region) -> Result<DatacenterRegionDto> {
        self.require_record(DATACENTER_REGION_TABLE, &region.key())
    }

    pub fn performance(&self, region: &Region) -> Result<PerformanceRegionDto> {
        self.require_record(PERFORMANCE_REGION_TABLE, &region.key())
    }

    /// Overall average carbon intensity of `region`, `None` when the region has no carbon record.
    pub fn overall_carbon_intensity(&self, region: &Region) -> Result<Option<f64>> {
        match self.carbon(region) {
            Ok(record) => Ok(record.averages.get("overall").copied()),
            Err(e) if e.is_missing_data() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn workflow_info(&self, workflow_id: &WorkflowId) -> Result<Option<WorkflowInfo>> {
        let dto: Option<WorkflowInfoDto> = self.get_record(DEPLOYMENT_MANAGER_WORKFLOW_INFO_TABLE, workflow_id.as_str())?;
        dto.as_ref().map(WorkflowInfo::from_dto).transpose()
    }

    pub fn set_workflow_info(&self, workflow_id: &WorkflowId, info: &WorkflowInfo) -> Result<()> {
        self.put_record(DEPLOYMENT_MANAGER_WORKFLOW_INFO_TABLE, workflow_id.as_str(), &info.to_dto())
    }

    pub fn staging_workflow_ids(&self) -> Result<Vec<WorkflowId>> {
        Ok(self.client.get_keys(WORKFLOW_PLACEMENT_SOLVER_STAGING_AREA_TABLE)?.into_iter().map(WorkflowId::new).collect())
    }

    pub fn staging_record(&self, workflow_id: &WorkflowId) -> Result<Option<StagingAreaRecordDto>> {
        self.get_record(WORKFLOW_PLACEMENT_SOLVER_STAGING_AREA_TABLE, workflow_id.as_str())
    }

    pub fn set_staging_record(&self, workflow_id: &WorkflowId, record: &StagingAreaRecordDto) -> Result<()> {
        self.put_record(WORKFLOW_PLACEMENT_SOLVER_STAGING_AREA_TABLE, workflow_id.as_str(), record)
    }

    pub fn remove_staging_record(&self, workflow_id: &WorkflowId) -> Result<()> {
        self.client.remove_key(WORKFLOW_PLACEMENT_SOLVER_STAGING_AREA_TABLE, workflow_id.as_str())
    }

    pub fn placement_decision(&self, workflow_id: &WorkflowId) -> Result<Option<PlacementDecisionDto>> {
        self.get_record(WORKFLOW_PLACEMENT_DECISION_TABLE, workflow_id.as_str())
    }

    pub fn set_placement_decision(&self, workflow_id: &WorkflowId, decision: &PlacementDecisionDto) -> Result<()> {
        self.put_record(WORKFLOW_PLACEMENT_DECISION_TABLE, workflow_id.as_str(), decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::store::remote_table::InMemoryTableStore;
    use chrono::TimeZone;

    #[test]
    fn test_missing_records_are_reported_as_missing_data() {
        let facade = DataAccessFacade::new(Arc::new(InMemoryTableStore::new()));
        let region = Region::new("aws", "us-east-1");

        assert!(facade.carbon(&region).unwrap_err().is_missing_data());
        assert!(facade.workflow_summary(&WorkflowId::new("wf-1")).unwrap_err().is_missing_data());
        assert_eq!(facade.overall_carbon_intensity(&region).unwrap(), None);
        assert_eq!(facade.workflow_info(&WorkflowId::new("wf-1")).unwrap(), None);
    }

    #[test]
    fn test_malformed_records_are_not_missing_data() {
        let store = InMemoryTableStore::new();
        store.set_value(CARBON_REGION_TABLE, "aws:us-east-1", "{\"averages\": 3}").unwrap();
        let facade = DataAccessFacade::new(Arc::new(store));

        let error = facade.overall_carbon_intensity(&Region::new("aws", "us-east-1")).unwrap_err();
        assert!(matches!(error, Error::DeserializationError(_)));
    }

    #[test]
    fn test_workflow_info_round_trip() {
        let facade = DataAccessFacade::new(Arc::new(InMemoryTableStore::new()));
        let id = WorkflowId::new("wf-1");
        let info = WorkflowInfo {
            last_solved: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            tokens_left: 12.5,
            next_check: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            credited_invocations: 7,
        };

        facade.set_workflow_info(&id, &info).unwrap();
        assert_eq!(facade.workflow_info(&id).unwrap(), Some(info));
    }

    #[test]
    fn test_available_regions_are_parsed_from_keys() {
        let store = InMemoryTableStore::new();
        store.set_value(AVAILABLE_REGIONS_TABLE, "gcp:europe-west1", "{\"provider\":\"gcp\",\"region\":\"europe-west1\"}").unwrap();
        store.set_value(AVAILABLE_REGIONS_TABLE, "aws:us-east-1", "{\"provider\":\"aws\",\"region\":\"us-east-1\"}").unwrap();
        let facade = DataAccessFacade::new(Arc::new(store));

        assert_eq!(facade.available_regions().unwrap(), vec![Region::new("aws", "us-east-1"), Region::new("gcp", "europe-west1")]);
    }
}
