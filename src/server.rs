use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{error_message, ErrorBody, ProxyError};
use crate::export;
use crate::observation::normalize;
use crate::table::Table;
use crate::upstream::{HistoryClient, UpstreamResponse};

#[derive(Clone)]
pub struct AppState {
    config: Arc<ServerConfig>,
    http: reqwest::Client,
}

#[derive(Deserialize, Debug)]
pub struct HistoryQuery {
    #[serde(rename = "stationId")]
    station_id: Option<String>,
    date: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TableResponse {
    #[serde(flatten)]
    table: Table,
    min_label: String,
    max_label: String,
    csv: String,
    filename: String,
}

fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: ServerConfig, http: reqwest::Client) -> Self {
        AppState {
            config: Arc::new(config),
            http,
        }
    }

    /// Checks configuration, then the query, and sends the upstream request.
    async fn fetch(&self, query: &HistoryQuery) -> Result<UpstreamResponse, ProxyError> {
        let api_key = self.config.api_key().ok_or(ProxyError::MissingApiKey)?;
        let (Some(station_id), Some(date)) = (required(&query.station_id), required(&query.date))
        else {
            return Err(ProxyError::MissingParams);
        };
        HistoryClient::new(self.http.clone(), &self.config.upstream_url, api_key)
            .history(station_id, date)
            .await
    }
}

fn mirrored_status(upstream: &UpstreamResponse) -> StatusCode {
    StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY)
}

async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Passes the upstream status and body through. A body that isn't JSON is
/// forwarded as text, still labelled as JSON.
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ProxyError> {
    let upstream = state.fetch(&query).await?;
    let status = mirrored_status(&upstream);
    let response = match serde_json::from_str::<Value>(&upstream.body) {
        Ok(body) => (status, Json(body)).into_response(),
        Err(_) => (status, [(CONTENT_TYPE, "application/json")], upstream.body).into_response(),
    };
    Ok(response)
}

/// Normalizes and renders the history so the browser only has to display it.
async fn table(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ProxyError> {
    let upstream = state.fetch(&query).await?;
    let status = mirrored_status(&upstream);
    if !status.is_success() {
        let body = ErrorBody {
            error: error_message(&upstream.body),
            details: None,
        };
        return Ok((status, Json(body)).into_response());
    }
    let payload: Value = serde_json::from_str(&upstream.body)
        .map_err(|e| ProxyError::InvalidUpstreamBody(e.to_string()))?;
    let table = Table::render(&normalize(&payload));
    let response = TableResponse {
        min_label: table.summary.min_label(),
        max_label: table.summary.max_label(),
        csv: export::to_csv(&table)?,
        filename: export::default_filename(),
        table,
    };
    Ok(Json(response).into_response())
}

pub fn app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.static_dir);
    Router::new()
        .route("/health", get(health))
        .route("/api/wu/history", get(history))
        .route("/api/wu/table", get(table))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        static_dir = %config.static_dir.display(),
        upstream = %config.upstream_url,
        api_key_configured = config.api_key().is_some(),
        "starting history proxy"
    );
    if config.api_key().is_none() {
        tracing::warn!("WU_API_KEY is not set, history requests will fail");
    }
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(AppState::new(config))).await
}
