use serde::{Deserialize, Serialize};

/// Request entry event. `action` selects the operation.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EventDto {
    pub action: String,
    /// Restricts `manage_deployments` to a single workflow.
    #[serde(default)]
    pub workflow_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ResponseDto {
    pub status: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ResponseDto {
    pub fn ok(message: impl Into<String>) -> Self {
        ResponseDto { status: 200, message: message.into(), details: None }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ResponseDto { status: 400, message: message.into(), details: None }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        ResponseDto { status: 500, message: message.into(), details: None }
    }
}
