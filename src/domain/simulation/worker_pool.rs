use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::domain::data_access::solver_data::SolverData;
use crate::domain::simulation::deployment_metrics::TrialSample;
use crate::domain::simulation::input_manager::InputManager;
use crate::domain::simulation::workflow_instance::WorkflowInstanceSimulator;
use crate::domain::workflow::workflow_model::{Deployment, WorkflowModel};
use crate::error::{Error, Result};

/// Messages understood by a simulation worker thread.
pub enum WorkerMessage {
    RunTrials { deployment: Arc<Deployment>, trials: usize, reply_to: mpsc::Sender<Vec<TrialSample>> },
    /// Answered once the new setting is in place.
    AlterCarbonSetting { hour: Option<u32>, reply_to: mpsc::Sender<()> },
    Shutdown,
}

/// Private simulator state of one worker.
struct SimulationWorker {
    input: InputManager,
    simulator: WorkflowInstanceSimulator,
    rng: StdRng,
}

impl SimulationWorker {
    fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>, seed: u64) -> Self {
        SimulationWorker {
            input: InputManager::new(model.clone(), data),
            simulator: WorkflowInstanceSimulator::new(model),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn run_trials(&mut self, deployment: &[usize], trials: usize) -> Vec<TrialSample> {
        (0..trials).map(|_| self.simulator.simulate(deployment, &mut self.input, &mut self.rng).sample).collect()
    }

    fn run_loop(mut self, rx: mpsc::Receiver<WorkerMessage>) {
        while let Ok(msg) = rx.recv() {
            match msg {
                WorkerMessage::RunTrials { deployment, trials, reply_to } => {
                    let _ = reply_to.send(self.run_trials(&deployment, trials));
                }
                WorkerMessage::AlterCarbonSetting { hour, reply_to } => {
                    self.input.alter_carbon_setting(hour);
                    let _ = reply_to.send(());
                }
                WorkerMessage::Shutdown => break,
            }
        }
    }
}

struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,
    join: Option<JoinHandle<()>>,
}

/// Fans Monte Carlo trials out to worker threads, or runs them inline for a single worker.
///
/// Worker `i` is seeded with `seed + i` and trials are split deterministically,
/// so a fixed seed reproduces the same samples.
pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
    inline: Option<SimulationWorker>,
}

impl WorkerPool {
    pub fn new(model: Arc<WorkflowModel>, data: Arc<SolverData>, worker_count: usize, seed: u64) -> Result<Self> {
        if worker_count <= 1 {
            return Ok(WorkerPool { workers: Vec::new(), inline: Some(SimulationWorker::new(model, data, seed)) });
        }

        let mut workers = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let (tx, rx) = mpsc::channel::<WorkerMessage>();
            let worker = SimulationWorker::new(model.clone(), data.clone(), seed.wrapping_add(index as u64));
            let join = thread::Builder::new().name(format!("simulation-worker-{}", index)).spawn(move || worker.run_loop(rx))?;
            workers.push(WorkerHandle { tx, join: Some(join) });
        }
        log::debug!("Started {} simulation workers for workflow {}", worker_count, model.config.workflow_id);

        Ok(WorkerPool { workers, inline: None })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len().max(1)
    }

    fn hung_up(index: usize) -> Error {
        Error::WorkerUnavailable(format!("simulation-worker-{}", index))
    }

    /// Runs `trials` trials of `deployment` and returns the samples in worker order.
    pub fn run_trials(&mut self, deployment: &[usize], trials: usize) -> Result<Vec<TrialSample>> {
        if let Some(worker) = self.inline.as_mut() {
            return Ok(worker.run_trials(deployment, trials));
        }

        let deployment = Arc::new(deployment.to_vec());
        let count = self.workers.len();
        let mut replies = Vec::with_capacity(count);
        for (index, worker) in self.workers.iter().enumerate() {
            let share = trials / count + usize::from(index < trials % count);
            if share == 0 {
                continue;
            }
            let (reply_to, reply) = mpsc::channel();
            worker
                .tx
                .send(WorkerMessage::RunTrials { deployment: deployment.clone(), trials: share, reply_to })
                .map_err(|_| Self::hung_up(index))?;
            replies.push((index, reply));
        }

        let mut samples = Vec::with_capacity(trials);
        for (index, reply) in replies {
            samples.extend(reply.recv().map_err(|_| Self::hung_up(index))?);
        }
        Ok(samples)
    }

    /// Changes the carbon setting of every worker and waits until all of them acknowledged.
    pub fn alter_carbon_setting(&mut self, hour: Option<u32>) -> Result<()> {
        if let Some(worker) = self.inline.as_mut() {
            worker.input.alter_carbon_setting(hour);
            return Ok(());
        }

        let mut acks = Vec::with_capacity(self.workers.len());
        for (index, worker) in self.workers.iter().enumerate() {
            let (reply_to, ack) = mpsc::channel();
            worker.tx.send(WorkerMessage::AlterCarbonSetting { hour, reply_to }).map_err(|_| Self::hung_up(index))?;
            acks.push((index, ack));
        }
        for (index, ack) in acks {
            ack.recv().map_err(|_| Self::hung_up(index))?;
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.tx.send(WorkerMessage::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(join) = worker.join.take() {
                let _ = join.join();
            }
        }
    }
}
