use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;

use crate::domain::calculators::carbon_calculator::CarbonCalculator;
use crate::domain::calculators::cost_calculator::CostCalculator;
use crate::domain::calculators::runtime_calculator::RuntimeCalculator;
use crate::domain::data_access::solver_data::SolverData;
use crate::domain::workflow::workflow_model::WorkflowModel;

/// `(cost, carbon, latency)` of one sampled execution or transmission.
pub type CostCarbonLatency = (f64, f64, f64);

/// Single entry point of the simulator into the calculators.
///
/// Every worker owns its own clone; caches are never shared between threads.
#[derive(Debug, Clone)]
pub struct InputManager {
    model: Arc<WorkflowModel>,
    data: Arc<SolverData>,
    runtime: RuntimeCalculator,
    cost: CostCalculator,
    carbon: CarbonCalculator,
    probability_cache: HashMap<(usize, usize), f64>,
}

impl InputManager {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>) -> Self {
        InputManager {
            runtime: RuntimeCalculator::new(model.clone(), data.clone()),
            cost: CostCalculator::new(model.clone(), data.clone()),
            carbon: CarbonCalculator::new(model.clone(), data.clone()),
            model,
            data,
            probability_cache: HashMap::new(),
        }
    }

    pub fn model(&self) -> &Arc<WorkflowModel> {
        &self.model
    }

    /// Invalidates the intensity-dependent caches when `hour` differs from the current setting.
    pub fn alter_carbon_setting(&mut self, hour: Option<u32>) {
        self.carbon.alter_carbon_setting(hour);
    }

    pub fn carbon_setting(&self) -> Option<u32> {
        self.carbon.carbon_setting()
    }

    pub fn carbon_intensity(&mut self, region: usize) -> f64 {
        self.carbon.carbon_intensity(region)
    }

    pub fn cached_intensity_count(&self) -> usize {
        self.carbon.cached_intensity_count()
    }

    pub fn execution_cost_carbon_latency<R: Rng + ?Sized>(&mut self, instance: usize, region: usize, rng: &mut R) -> CostCarbonLatency {
        let latency = self.runtime.sample_runtime(instance, region, rng);
        let cost = self.cost.execution_cost(instance, region, latency);
        let carbon = self.carbon.execution_carbon(instance, region, latency);
        (cost, carbon, latency)
    }

    /// Samples a payload for `from -> to` and prices its transfer between the two regions.
    /// `from = None` is the virtual start hop, which costs nothing.
    pub fn transmission_cost_carbon_latency<R: Rng + ?Sized>(
        &mut self,
        from: Option<usize>,
        to: usize,
        from_region: usize,
        to_region: usize,
        rng: &mut R,
    ) -> CostCarbonLatency {
        let size = self.runtime.sample_transmission_size(from, to, rng);
        let latency = self.runtime.sample_transmission_latency(from_region, to_region, size, rng);
        let size_gb = size.unwrap_or(0.0);
        let cost = self.cost.transmission_cost(from.map(|_| from_region), to_region, size_gb);
        let carbon = self.carbon.transmission_carbon(from_region, to_region, size_gb);
        (cost, carbon, latency)
    }

    /// Latency of a payload-less message, used for skip signals.
    pub fn transmission_latency<R: Rng + ?Sized>(&mut self, from_region: usize, to_region: usize, rng: &mut R) -> f64 {
        self.runtime.sample_transmission_latency(from_region, to_region, None, rng)
    }

    pub fn invocation_probability(&mut self, from: usize, to: usize) -> f64 {
        if let Some(probability) = self.probability_cache.get(&(from, to)) {
            return *probability;
        }
        let probability = self.data.invocation_probability(from, to).clamp(0.0, 1.0);
        self.probability_cache.insert((from, to), probability);
        probability
    }
}
