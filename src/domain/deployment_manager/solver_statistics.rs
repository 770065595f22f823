use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

/// `tracing` target of the per-solve analytics events.
pub const ANALYTICS_TARGET: &str = "placement_analytics";

/// Columns of the solver statistics file, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatParameter {
    /// Timestamp of the solve (`TIME_FORMAT`).
    Time,
    RunId,
    WorkflowId,
    /// Solve hour, `0..24`.
    Hour,
    Algorithm,
    NumberOfSolves,
    /// Deployments simulated for this hour, home excluded.
    EvaluatedDeployments,
    TimedOut,
    BestAverageCost,
    BestAverageRuntime,
    BestAverageCarbon,
    HomeAverageCarbon,
    /// Wall-clock time of the hourly solve in ms.
    ProcessingTime,
}

impl StatParameter {
    pub const ALL: [StatParameter; 13] = [
        StatParameter::Time,
        StatParameter::RunId,
        StatParameter::WorkflowId,
        StatParameter::Hour,
        StatParameter::Algorithm,
        StatParameter::NumberOfSolves,
        StatParameter::EvaluatedDeployments,
        StatParameter::TimedOut,
        StatParameter::BestAverageCost,
        StatParameter::BestAverageRuntime,
        StatParameter::BestAverageCarbon,
        StatParameter::HomeAverageCarbon,
        StatParameter::ProcessingTime,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            StatParameter::Time => "Time",
            StatParameter::RunId => "RunId",
            StatParameter::WorkflowId => "WorkflowId",
            StatParameter::Hour => "Hour",
            StatParameter::Algorithm => "Algorithm",
            StatParameter::NumberOfSolves => "NumberOfSolves",
            StatParameter::EvaluatedDeployments => "EvaluatedDeployments",
            StatParameter::TimedOut => "TimedOut",
            StatParameter::BestAverageCost => "BestAverageCost",
            StatParameter::BestAverageRuntime => "BestAverageRuntime",
            StatParameter::BestAverageCarbon => "BestAverageCarbon",
            StatParameter::HomeAverageCarbon => "HomeAverageCarbon",
            StatParameter::ProcessingTime => "ProcessingTime",
        }
    }
}

/// Values are kept native and only formatted by the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum StatValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for StatValue {
    fn from(v: i64) -> Self {
        StatValue::Integer(v)
    }
}

impl From<u32> for StatValue {
    fn from(v: u32) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<usize> for StatValue {
    fn from(v: usize) -> Self {
        StatValue::Integer(v as i64)
    }
}

impl From<f64> for StatValue {
    fn from(v: f64) -> Self {
        StatValue::Float(v)
    }
}

impl From<String> for StatValue {
    fn from(v: String) -> Self {
        StatValue::Text(v)
    }
}

impl From<&str> for StatValue {
    fn from(v: &str) -> Self {
        StatValue::Text(v.to_string())
    }
}

impl From<bool> for StatValue {
    fn from(v: bool) -> Self {
        StatValue::Bool(v)
    }
}

impl StatValue {
    fn render(&self) -> String {
        match self {
            StatValue::Text(t) => t.clone(),
            StatValue::Integer(i) => i.to_string(),
            StatValue::Float(f) => f.to_string(),
            StatValue::Bool(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatisticEvent {
    data: HashMap<StatParameter, StatValue>,
}

impl StatisticEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: Into<StatValue>>(&mut self, param: StatParameter, value: V) -> &mut Self {
        self.data.insert(param, value.into());
        self
    }

    pub fn get(&self, param: StatParameter) -> Option<&StatValue> {
        self.data.get(&param)
    }

    fn row(&self) -> Vec<String> {
        StatParameter::ALL.iter().map(|param| self.data.get(param).map(StatValue::render).unwrap_or_else(|| "NA".to_string())).collect()
    }
}

enum StatsMessage {
    Log(StatisticEvent),
    Flush,
    Shutdown,
}

/// Appends one CSV row per finished hourly solve from a background writer thread.
///
/// Dropping the collector flushes and joins the writer.
pub struct SolverStatistics {
    sender: mpsc::Sender<StatsMessage>,
    writer: Option<JoinHandle<()>>,
}

impl SolverStatistics {
    /// Writes to `filename`, or to stdout when `None`.
    pub fn init(filename: Option<String>) -> crate::error::Result<Self> {
        let output: Box<dyn Write + Send> = match &filename {
            Some(path) => Box::new(File::create(path)?),
            None => Box::new(io::stdout()),
        };
        let (tx, rx) = mpsc::channel();
        let writer = thread::Builder::new().name("solver-statistics".to_string()).spawn(move || Self::worker_loop(rx, output))?;

        Ok(SolverStatistics { sender: tx, writer: Some(writer) })
    }

    fn worker_loop(rx: mpsc::Receiver<StatsMessage>, output: Box<dyn Write + Send>) {
        let mut csv_wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(output);

        let headers: Vec<&str> = StatParameter::ALL.iter().map(StatParameter::header).collect();
        if let Err(e) = csv_wtr.write_record(&headers) {
            log::error!("Stats Error: Failed to write headers: {}", e);
        }

        for msg in rx {
            match msg {
                StatsMessage::Log(event) => {
                    if let Err(e) = csv_wtr.write_record(event.row()) {
                        log::error!("Stats Error: Failed to write record: {}", e);
                    }
                }
                StatsMessage::Flush => {
                    let _ = csv_wtr.flush();
                }
                StatsMessage::Shutdown => break,
            }
        }
        let _ = csv_wtr.flush();
    }

    /// Non-blocking; events are dropped if the writer thread is gone.
    pub fn add_event(&self, event: StatisticEvent) {
        let _ = self.sender.send(StatsMessage::Log(event));
    }

    pub fn flush(&self) {
        let _ = self.sender.send(StatsMessage::Flush);
    }
}

impl Drop for SolverStatistics {
    fn drop(&mut self) {
        let _ = self.sender.send(StatsMessage::Shutdown);
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
    }
}
