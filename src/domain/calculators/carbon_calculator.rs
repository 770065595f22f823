use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::{MEMORY_MB_PER_VCPU, SOLVER_INPUT_GRID_CARBON_DEFAULT, TRANSMISSION_ENERGY_KWH_PER_GB_KM};
use crate::domain::data_access::solver_data::SolverData;
use crate::domain::workflow::workflow_model::WorkflowModel;

const EARTH_RADIUS_KM: f64 = 6371.0;

fn great_circle_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());
    let h = ((lat2 - lat1) / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Operational carbon in gCO2eq.
///
/// With a carbon setting of `Some(hour)` the hourly intensities are used,
/// otherwise the daily averages.
#[derive(Debug, Clone)]
pub struct CarbonCalculator {
    model: Arc<WorkflowModel>,
    data: Arc<SolverData>,
    hour: Option<u32>,
    intensity_cache: HashMap<usize, f64>,
    /// kW drawn including PUE, per `(instance, region)`. Independent of the hour.
    power_cache: HashMap<(usize, usize), f64>,
    distance_cache: HashMap<(usize, usize), Option<f64>>,
}

impl CarbonCalculator {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>) -> Self {
        CarbonCalculator {
            model,
            data,
            hour: None,
            intensity_cache: HashMap::new(),
            power_cache: HashMap::new(),
            distance_cache: HashMap::new(),
        }
    }

    pub fn carbon_setting(&self) -> Option<u32> {
        self.hour
    }

    /// Switches between hourly and daily-average intensities. Calling it again
    /// with the current setting keeps the caches.
    pub fn alter_carbon_setting(&mut self, hour: Option<u32>) {
        if self.hour == hour {
            return;
        }
        self.hour = hour;
        self.intensity_cache.clear();
    }

    pub fn cached_intensity_count(&self) -> usize {
        self.intensity_cache.len()
    }

    /// gCO2eq/kWh of `region` under the current setting.
    pub fn carbon_intensity(&mut self, region: usize) -> f64 {
        if let Some(intensity) = self.intensity_cache.get(&region) {
            return *intensity;
        }
        let intensity = self.data.carbon_intensity(region, self.hour).unwrap_or(SOLVER_INPUT_GRID_CARBON_DEFAULT);
        self.intensity_cache.insert(region, intensity);
        intensity
    }

    fn power_kw(&mut self, instance: usize, region: usize) -> f64 {
        if let Some(power) = self.power_cache.get(&(instance, region)) {
            return *power;
        }
        let power = match self.data.datacenter(region) {
            Some(datacenter) => {
                let memory_mb = self.model.memory_mb(instance, region);
                let memory_gb = memory_mb / 1024.0;
                let vcpu = memory_mb / MEMORY_MB_PER_VCPU;
                (memory_gb * datacenter.average_memory_power + vcpu * datacenter.average_cpu_power) * datacenter.pue
            }
            None => 0.0,
        };
        self.power_cache.insert((instance, region), power);
        power
    }

    pub fn execution_carbon(&mut self, instance: usize, region: usize, runtime_s: f64) -> f64 {
        let energy_kwh = runtime_s / 3600.0 * self.power_kw(instance, region);
        energy_kwh * self.carbon_intensity(region)
    }

    /// Distance in km from the carbon table, else between datacenter locations.
    /// `None` when neither source knows the pair.
    pub fn known_distance_km(&mut self, from_region: usize, to_region: usize) -> Option<f64> {
        if from_region == to_region {
            return Some(0.0);
        }
        if let Some(distance) = self.distance_cache.get(&(from_region, to_region)) {
            return *distance;
        }
        let distance = self.data.transmission_distance(from_region, to_region).or_else(|| {
            let from = self.data.location(from_region)?;
            let to = self.data.location(to_region)?;
            Some(great_circle_km((from.latitude, from.longitude), (to.latitude, to.longitude)))
        });
        self.distance_cache.insert((from_region, to_region), distance);
        distance
    }

    /// Like `known_distance_km`, with unknown pairs at 0 km.
    pub fn distance_km(&mut self, from_region: usize, to_region: usize) -> f64 {
        self.known_distance_km(from_region, to_region).unwrap_or(0.0)
    }

    pub fn transmission_carbon(&mut self, from_region: usize, to_region: usize, size_gb: f64) -> f64 {
        if size_gb <= 0.0 {
            return 0.0;
        }
        let distance = self.distance_km(from_region, to_region);
        if distance <= 0.0 {
            return 0.0;
        }
        let intensity = (self.carbon_intensity(from_region) + self.carbon_intensity(to_region)) / 2.0;
        size_gb * distance * TRANSMISSION_ENERGY_KWH_PER_GB_KM * intensity
    }
}
