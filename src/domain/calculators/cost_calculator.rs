use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::data_access::solver_data::SolverData;
use crate::domain::workflow::workflow_model::WorkflowModel;

/// Prices in the unit of the datacenter table (USD). Regions without pricing are free.
#[derive(Debug, Clone)]
pub struct CostCalculator {
    model: Arc<WorkflowModel>,
    data: Arc<SolverData>,
    /// (flat invocation price, price per second) per `(instance, region)`.
    execution_cache: HashMap<(usize, usize), (f64, f64)>,
}

impl CostCalculator {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>) -> Self {
        CostCalculator { model, data, execution_cache: HashMap::new() }
    }

    fn execution_prices(&mut self, instance: usize, region: usize) -> (f64, f64) {
        if let Some(prices) = self.execution_cache.get(&(instance, region)) {
            return *prices;
        }
        let prices = match self.data.datacenter(region) {
            Some(datacenter) => {
                let memory_gb = self.model.memory_mb(instance, region) / 1024.0;
                (datacenter.execution_cost.invocation_cost, datacenter.execution_cost.compute_cost * memory_gb)
            }
            None => (0.0, 0.0),
        };
        self.execution_cache.insert((instance, region), prices);
        prices
    }

    pub fn execution_cost(&mut self, instance: usize, region: usize, runtime_s: f64) -> f64 {
        let (invocation, per_second) = self.execution_prices(instance, region);
        invocation + per_second * runtime_s
    }

    /// Egress price of `size_gb` leaving `from_region`. Start hops (`None`) and
    /// transfers within one region are free.
    pub fn transmission_cost(&self, from_region: Option<usize>, to_region: usize, size_gb: f64) -> f64 {
        match from_region {
            Some(from) if from != to_region => {
                self.data.datacenter(from).map(|datacenter| datacenter.transmission_cost.global_data_transfer * size_gb).unwrap_or(0.0)
            }
            _ => 0.0,
        }
    }
}
