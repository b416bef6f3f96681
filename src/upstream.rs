use reqwest::header::ACCEPT;
use reqwest::Url;

use crate::error::ProxyError;

/// Raw answer of the history api: status and untouched body text.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: String,
}

/// Calls the Weather.com PWS history endpoint with the api key injected.
#[derive(Debug, Clone)]
pub struct HistoryClient {
    client: reqwest::Client,
    base: Url,
    api_key: String,
}

impl HistoryClient {
    pub fn new(client: reqwest::Client, base: &Url, api_key: &str) -> Self {
        HistoryClient {
            client,
            base: base.clone(),
            api_key: api_key.to_string(),
        }
    }

    /// Builds the upstream url for one station and day (`YYYYMMDD`).
    pub fn url(&self, station_id: &str, date: &str) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("stationId", station_id)
            .append_pair("date", date)
            .append_pair("format", "json")
            .append_pair("units", "m")
            .append_pair("apiKey", &self.api_key);
        url
    }

    pub async fn history(
        &self,
        station_id: &str,
        date: &str,
    ) -> Result<UpstreamResponse, ProxyError> {
        tracing::debug!(station_id, date, "fetching history from upstream");
        let response = self
            .client
            .get(self.url(station_id, date))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(ProxyError::Upstream)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(ProxyError::Upstream)?;
        tracing::info!(station_id, date, status, "upstream answered");
        Ok(UpstreamResponse { status, body })
    }
}
