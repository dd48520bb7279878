//! Request and response envelopes for the on-demand entry points.

use serde::{Deserialize, Serialize};

/// Lifecycle action request.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub desired_capacity: Option<u32>,
}

/// Response envelope shared by both entry points.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: 400,
            body: serde_json::Value::String(message.into()),
        }
    }

    pub fn server_error(message: impl Into<String>) -> Self {
        Self {
            status_code: 500,
            body: serde_json::Value::String(message.into()),
        }
    }
}
