use chrono::{Local, NaiveDate};
use serde_json::Value;

use crate::config::FetchArgs;
use crate::error::{error_message, ClientError};
use crate::export;
use crate::observation::{normalize, Observation};
use crate::table::Table;

/// Date in the compact form the history api expects, e.g. `20240501`.
pub fn compact_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Asks the proxy for one day of history of a station and normalizes it.
pub async fn fetch_history(
    client: &reqwest::Client,
    server: &str,
    station_id: &str,
    date: NaiveDate,
) -> Result<Vec<Observation>, ClientError> {
    let url = format!("{}/api/wu/history", server.trim_end_matches('/'));
    let date = compact_date(date);
    let response = client
        .get(&url)
        .query(&[("stationId", station_id), ("date", date.as_str())])
        .send()
        .await
        .map_err(|e| ClientError::Request(url.clone(), e))?;
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| ClientError::Request(url.clone(), e))?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            message: error_message(&text),
        });
    }
    let payload = serde_json::from_str::<Value>(&text)?;
    Ok(normalize(&payload))
}

pub async fn run(args: FetchArgs) -> Result<(), ClientError> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    eprintln!("Loading {} for {date}…", args.station);
    let client = reqwest::Client::new();
    let observations = fetch_history(&client, &args.server, &args.station, date).await?;
    let table = Table::render(&observations);
    print!("{}", table.to_text());
    println!();
    println!("Observations: {}", table.summary.count);
    println!("Min temp:     {}", table.summary.min_label());
    println!("Max temp:     {}", table.summary.max_label());
    if args.csv {
        let path = export::write_csv(&table, &args.out_dir)?;
        eprintln!("Wrote {}", path.display());
    }
    eprintln!("OK");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    async fn mock_proxy() -> String {
        async fn handler(Query(q): Query<HashMap<String, String>>) -> Response {
            match q.get("stationId").map(String::as_str) {
                Some("BROKEN") => (StatusCode::OK, "not json").into_response(),
                Some(id) if q.get("date").map(String::as_str) == Some("20240501") => Json(json!([
                    { "stationID": id, "epoch": 1714521600, "metric": { "tempAvg": 12.5 } },
                    { "stationID": id, "obsTimeLocal": "2024-05-01 00:05:00" },
                ]))
                .into_response(),
                _ => (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Required parameters: stationId and date (YYYYMMDD)" })),
                )
                    .into_response(),
            }
        }
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = Router::new().route("/api/wu/history", get(handler));
        tokio::spawn(async move { axum::serve(listener, router).await });
        format!("http://{addr}/")
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn may_first() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    #[test]
    fn date_is_compacted() {
        assert_eq!(compact_date(may_first()), "20240501");
    }

    #[tokio::test]
    async fn fetches_and_normalizes() {
        let server = mock_proxy().await;
        let obs = fetch_history(&client(), &server, "IMADRI123", may_first())
            .await
            .unwrap();
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].time_local, "2024-05-01T00:00:00.000Z");
        assert_eq!(obs[0].temp, Some(12.5));
        assert_eq!(obs[1].temp, None);
    }

    #[tokio::test]
    async fn proxy_error_message_is_surfaced() {
        let server = mock_proxy().await;
        let day = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        let err = fetch_history(&client(), &server, "IMADRI123", day)
            .await
            .unwrap_err();
        match err {
            ClientError::Status { status, message } => {
                assert_eq!(status, 400);
                assert!(message.starts_with("Required parameters"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_json_fails_without_rows() {
        let server = mock_proxy().await;
        let err = fetch_history(&client(), &server, "BROKEN", may_first())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
