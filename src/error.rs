use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Failures of the history proxy, each mapped to the status the browser sees.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("WU_API_KEY is not set in the environment")]
    MissingApiKey,

    #[error("Required parameters: stationId and date (YYYYMMDD)")]
    MissingParams,

    #[error("Failed to query Weather.com")]
    Upstream(#[source] reqwest::Error),

    #[error("Weather.com returned a body that is not JSON")]
    InvalidUpstreamBody(String),

    #[error("Could not build CSV export")]
    Export(#[from] csv::Error),
}

/// Best message for a failed response: its `error` field when the body is a
/// JSON object carrying one, else the start of the body.
pub fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let error = parsed
        .as_ref()
        .and_then(|v| v.get("error"))
        .filter(|e| !is_blank(e));
    if let Some(error) = error {
        match error.as_str() {
            Some(text) => return text.to_string(),
            None => return error.to_string(),
        }
    }
    let text = parsed.map_or_else(|| body.to_string(), |v| v.to_string());
    text.chars().take(200).collect()
}

/// Null, `false`, zero and the empty string carry no message.
fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingApiKey | ProxyError::Upstream(_) | ProxyError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ProxyError::MissingParams => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUpstreamBody(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ProxyError::Upstream(e) => Some(e.to_string()),
            ProxyError::InvalidUpstreamBody(e) => Some(e.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "history request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
            details: self.details(),
        };
        (status, Json(body)).into_response()
    }
}

/// Failures of the terminal client talking to the proxy.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request to {0} failed")]
    Request(String, #[source] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("Response is not valid JSON")]
    Json(#[from] serde_json::Error),

    #[error("Could not write CSV export")]
    Csv(#[from] csv::Error),

    #[error("Could not create the export file")]
    Io(#[from] std::io::Error),
}
