use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::api::table_dto::{HourlyPlacementDto, StagingAreaRecordDto};
use crate::constants::SOLVE_HOUR_OPTIONS;
use crate::domain::data_access::data_access_facade::DataAccessFacade;
use crate::domain::deployment_algorithms::ranker::EvaluatedDeployment;
use crate::domain::utils::id::WorkflowId;
use crate::domain::utils::time::format_time;
use crate::domain::workflow::workflow_model::WorkflowModel;
use crate::error::{Error, Result};

/// Solve hours for `number_of_solves` solves spread evenly over the day.
pub fn hour_keys(number_of_solves: u32) -> Result<Vec<u32>> {
    if !SOLVE_HOUR_OPTIONS.contains(&number_of_solves) {
        return Err(Error::InvalidParameter(format!("{} solves per day do not divide 24 hours", number_of_solves)));
    }
    let step = 24 / number_of_solves;
    Ok((0..number_of_solves).map(|i| i * step).collect())
}

/// Placement of one solve hour: instance name to region, plus the winner's metrics.
pub fn format_deployment(model: &WorkflowModel, evaluated: &EvaluatedDeployment) -> HourlyPlacementDto {
    let instances = evaluated
        .deployment
        .iter()
        .enumerate()
        .map(|(instance, &region)| (model.instance_name(instance).to_string(), model.region(region).to_dto()))
        .collect();
    HourlyPlacementDto { instances, metrics: Some(evaluated.metrics.to_dto()) }
}

/// Collects the hourly placements of one workflow and publishes them as a
/// single staging record.
#[derive(Debug, Default)]
pub struct StagingAreaBuilder {
    hours: BTreeMap<String, HourlyPlacementDto>,
}

impl StagingAreaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hour(&mut self, hour: u32, placement: HourlyPlacementDto) {
        self.hours.insert(hour.to_string(), placement);
    }

    pub fn len(&self) -> usize {
        self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hours.is_empty()
    }

    pub fn build(self, expiry_time: DateTime<Utc>) -> StagingAreaRecordDto {
        StagingAreaRecordDto { expiry_time: format_time(expiry_time), time_keys_to_staging_area_data: self.hours }
    }

    /// One table write, so readers never observe a partial record.
    pub fn publish(self, facade: &DataAccessFacade, workflow_id: &WorkflowId, expiry_time: DateTime<Utc>) -> Result<StagingAreaRecordDto> {
        if self.is_empty() {
            return Err(Error::InvalidParameter(format!("refusing to publish an empty staging record for {}", workflow_id)));
        }
        let record = self.build(expiry_time);
        facade.set_staging_record(workflow_id, &record)?;
        Ok(record)
    }
}
