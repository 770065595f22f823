use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("File not found or could not be read: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    DeserializationError(#[from] serde_json::Error),

    #[error("Invalid workflow configuration: {0}")]
    ConfigInvalid(String),

    #[error("No entry for key '{key}' in table '{table}'")]
    MissingData { table: String, key: String },

    #[error("Workflow graph contains a cycle through instance '{0}'")]
    CycleDetected(String),

    #[error("Table access failed: {0}")]
    TableUnavailable(String),

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Failed to parse timestamp: {0}")]
    TimeFormat(#[from] chrono::ParseError),

    #[error("Simulation worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("Redeploy request failed: {0}")]
    RemoteRedeploy(String),
}

impl Error {
    pub fn missing(table: &str, key: impl Into<String>) -> Self {
        Error::MissingData { table: table.to_string(), key: key.into() }
    }

    /// Missing data is recovered locally with defaults; everything else aborts the current workflow.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Error::MissingData { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::RemoteRedeploy(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
