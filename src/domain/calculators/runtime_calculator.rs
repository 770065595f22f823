use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::IndexedRandom;

use crate::domain::data_access::solver_data::{SolverData, non_negative};
use crate::domain::workflow::workflow_model::WorkflowModel;

/// Latency samples of one region pair, bucketed by payload size.
#[derive(Debug, Clone)]
struct LatencyTable {
    base: Vec<f64>,
    /// Sorted by bucket size (GB).
    buckets: Vec<(f64, Vec<f64>)>,
}

impl LatencyTable {
    /// Smallest bucket holding `size`, else the base distribution.
    fn distribution(&self, size: Option<f64>) -> &[f64] {
        if let Some(size) = size {
            if let Some((_, samples)) = self.buckets.iter().find(|(bucket, samples)| *bucket >= size && !samples.is_empty()) {
                return samples;
            }
        }
        &self.base
    }
}

fn sample<R: Rng + ?Sized>(samples: &[f64], rng: &mut R) -> f64 {
    samples.choose(rng).copied().unwrap_or(0.0)
}

/// Runtime, payload size and transmission latency distributions.
#[derive(Debug, Clone)]
pub struct RuntimeCalculator {
    model: Arc<WorkflowModel>,
    data: Arc<SolverData>,
    runtime_cache: HashMap<(usize, usize), Arc<[f64]>>,
    latency_cache: HashMap<(usize, usize), Arc<LatencyTable>>,
}

impl RuntimeCalculator {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>) -> Self {
        RuntimeCalculator { model, data, runtime_cache: HashMap::new(), latency_cache: HashMap::new() }
    }

    /// Realised runtime samples of `instance` in `region`.
    ///
    /// Without history for the pair, another region's samples are rescaled by the
    /// relative performance of both regions (home region preferred). Without any
    /// history the distribution is `[0.0]`.
    pub fn runtime_distribution(&mut self, instance: usize, region: usize) -> Arc<[f64]> {
        if let Some(cached) = self.runtime_cache.get(&(instance, region)) {
            return cached.clone();
        }

        let own = self.data.runtime_samples(instance, region);
        let distribution: Arc<[f64]> = if !own.is_empty() {
            own.into()
        } else {
            let home = self.model.home_region;
            let source = std::iter::once(home)
                .chain(0..self.model.region_count())
                .find(|&r| !self.data.runtime_samples(instance, r).is_empty());
            match source {
                Some(source) => {
                    let factor = self.data.relative_performance(region) / self.data.relative_performance(source);
                    self.data.runtime_samples(instance, source).iter().map(|s| s * factor).collect()
                }
                None => Arc::from([0.0]),
            }
        };

        self.runtime_cache.insert((instance, region), distribution.clone());
        distribution
    }

    pub fn sample_runtime<R: Rng + ?Sized>(&mut self, instance: usize, region: usize, rng: &mut R) -> f64 {
        let distribution = self.runtime_distribution(instance, region);
        sample(&distribution, rng)
    }

    /// Payload size in GB of the edge `from -> to`; `from = None` is the start hop.
    /// Returns `None` when nothing was ever observed for the edge.
    pub fn sample_transmission_size<R: Rng + ?Sized>(&self, from: Option<usize>, to: usize, rng: &mut R) -> Option<f64> {
        let sizes = match from {
            Some(from) => self.data.data_transfer_sizes(from, to),
            None => self.data.start_hop_sizes(),
        };
        sizes.choose(rng).copied()
    }

    fn latency_table(&mut self, from_region: usize, to_region: usize) -> Arc<LatencyTable> {
        if let Some(table) = self.latency_cache.get(&(from_region, to_region)) {
            return table.clone();
        }

        let table = match self.data.transmission_latency(from_region, to_region) {
            Some(dto) => {
                let mut buckets: Vec<(f64, Vec<f64>)> = dto
                    .size_latency_distributions
                    .iter()
                    .filter_map(|(size, samples)| size.parse::<f64>().ok().filter(|s| s.is_finite() && *s >= 0.0).map(|s| (s, non_negative(samples))))
                    .collect();
                buckets.sort_by(|a, b| a.0.total_cmp(&b.0));
                let base = non_negative(&dto.latency_distribution);
                let base = if base.is_empty() { vec![0.0] } else { base };
                LatencyTable { base, buckets }
            }
            None => LatencyTable { base: vec![0.0], buckets: Vec::new() },
        };

        let table = Arc::new(table);
        self.latency_cache.insert((from_region, to_region), table.clone());
        table
    }

    /// Transmission latency in seconds, conditioned on the payload size when one is given.
    pub fn sample_transmission_latency<R: Rng + ?Sized>(&mut self, from_region: usize, to_region: usize, size: Option<f64>, rng: &mut R) -> f64 {
        let table = self.latency_table(from_region, to_region);
        sample(table.distribution(size), rng)
    }
}
