use std::sync::Arc;

use rand::Rng;

use crate::domain::simulation::deployment_metrics::TrialSample;
use crate::domain::simulation::input_manager::InputManager;
use crate::domain::workflow::workflow_model::WorkflowModel;

/// Outcome of one simulated invocation of the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub sample: TrialSample,
    /// Indexed by instance.
    pub invoked: Vec<bool>,
    /// Finish time of every invoked instance, seconds since the request arrived.
    pub cumulative_runtime: Vec<f64>,
}

/// Walks the DAG once for a deployment, drawing every random quantity from the
/// input manager.
#[derive(Debug, Clone)]
pub struct WorkflowInstanceSimulator {
    model: Arc<WorkflowModel>,
    /// Sync nodes that are notified when an edge into the key instance does not fire.
    skip_targets: Vec<Vec<usize>>,
}

impl WorkflowInstanceSimulator {
    pub fn new(model: Arc<WorkflowModel>) -> Self {
        let skip_targets = model.instances.indices().map(|instance| model.dag.reachable_sync_nodes(instance)).collect();
        WorkflowInstanceSimulator { model, skip_targets }
    }

    pub fn simulate<R: Rng + ?Sized>(&self, deployment: &[usize], input: &mut InputManager, rng: &mut R) -> TrialResult {
        let dag = &self.model.dag;
        let n = self.model.instance_count();
        let entry_point = self.model.entry_point;

        let mut invoked = vec![false; n];
        let mut realised_predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut skip_arrival = vec![0.0_f64; n];
        let mut cumulative_runtime = vec![0.0_f64; n];
        let mut sample = TrialSample::default();

        invoked[entry_point] = true;

        for &instance in dag.topological_order() {
            if !invoked[instance] {
                continue;
            }
            let region = deployment[instance];
            let mut arrival = 0.0_f64;

            if instance == entry_point {
                let (_, carbon, latency) = input.transmission_cost_carbon_latency(None, instance, self.model.home_region, region, rng);
                sample.carbon += carbon;
                arrival = latency;
            }

            for &predecessor in &realised_predecessors[instance] {
                let (cost, carbon, latency) = input.transmission_cost_carbon_latency(Some(predecessor), instance, deployment[predecessor], region, rng);
                sample.cost += cost;
                sample.carbon += carbon;
                arrival = arrival.max(cumulative_runtime[predecessor] + latency);
            }
            arrival = arrival.max(skip_arrival[instance]);

            let (cost, carbon, latency) = input.execution_cost_carbon_latency(instance, region, rng);
            sample.cost += cost;
            sample.carbon += carbon;
            cumulative_runtime[instance] = arrival + latency;

            for &successor in dag.successors(instance) {
                let probability = input.invocation_probability(instance, successor);
                if probability >= 1.0 || rng.random_bool(probability) {
                    invoked[successor] = true;
                    realised_predecessors[successor].push(instance);
                } else {
                    for &sync_node in &self.skip_targets[successor] {
                        let signal = cumulative_runtime[instance] + input.transmission_latency(region, deployment[sync_node], rng);
                        skip_arrival[sync_node] = skip_arrival[sync_node].max(signal);
                    }
                }
            }
        }

        sample.runtime = (0..n).filter(|&i| invoked[i]).map(|i| cumulative_runtime[i]).fold(0.0, f64::max);

        TrialResult { sample, invoked, cumulative_runtime }
    }
}
