//! InfluxDB 0.8 HTTP store
//!
//! Talks to the `/db/{database}/series` endpoint of the 0.8 HTTP API with
//! millisecond time precision. Responses are arrays of
//! `{"name", "columns", "points"}` objects, one per series.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, trace};

use crate::config::StoreConfig;
use crate::datastore::{PointWrite, QueryResponse, Row, SeriesStore};
use crate::error::{TitsError, TitsResult};
use crate::query::{delete_statement, SeriesQuery, VALUE_FIELD};
use crate::series::SeriesName;

/// Column holding the point time in every 0.8 response
const TIME_COLUMN: &str = "time";

/// Body fragment InfluxDB 0.8 answers with when a queried series does not exist
const MISSING_SERIES_MARKER: &str = "Couldn't find series";

/// One series as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireSeries {
    pub name: String,
    pub columns: Vec<String>,
    pub points: Vec<Vec<Value>>,
}

/// [`SeriesStore`] backed by an InfluxDB 0.8 server
#[derive(Debug, Clone)]
pub struct InfluxStore {
    config: StoreConfig,
    http_client: Client,
}

impl InfluxStore {
    /// Create a store client. No request is made until the first operation.
    pub fn new(config: StoreConfig) -> TitsResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TitsError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        info!(
            "InfluxDB store configured for database '{}' at {}",
            config.database,
            config.base_url()
        );

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn series_url(&self) -> String {
        format!("{}/db/{}/series", self.config.base_url(), self.config.database)
    }

    fn database_url(&self) -> String {
        format!("{}/db/{}", self.config.base_url(), self.config.database)
    }

    fn credentials(&self) -> [(&'static str, &str); 3] {
        [
            ("u", self.config.username.as_str()),
            ("p", self.config.password.as_str()),
            ("time_precision", self.config.time_precision.as_str()),
        ]
    }

    /// Run one statement and return the raw series it produced
    async fn execute(&self, statement: &str) -> TitsResult<Vec<WireSeries>> {
        debug!("InfluxDB query: {}", statement);

        let response = self
            .http_client
            .get(self.series_url())
            .query(&self.credentials())
            .query(&[("q", statement)])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        trace!("InfluxDB answered {} with {} bytes", status, body.len());

        if status == StatusCode::BAD_REQUEST && body.contains(MISSING_SERIES_MARKER) {
            return Ok(Vec::new());
        }

        if !status.is_success() {
            return Err(TitsError::store_unavailable(format!(
                "Query failed with status {}: {}",
                status, body
            )));
        }

        parse_body(&body)
    }
}

/// Decode a query response body. An empty body means no series matched.
pub fn parse_body(body: &str) -> TitsResult<Vec<WireSeries>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

fn transport_error(error: reqwest::Error) -> TitsError {
    TitsError::store_unavailable(format!("InfluxDB request failed: {}", error))
}

async fn ensure_success(response: Response, action: &str) -> TitsResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(TitsError::store_unavailable(format!(
        "{} failed with status {}: {}",
        action, status, body
    )))
}

/// Convert wire series into rows, reading the time column and `column`.
///
/// Points whose value is null are skipped; anything else non-numeric is a
/// parse error.
pub fn decode_series(series: Vec<WireSeries>, column: &str) -> TitsResult<QueryResponse> {
    let mut response = QueryResponse::new();

    for wire in series {
        let time_index = column_index(&wire, TIME_COLUMN)?;
        let value_index = column_index(&wire, column)?;

        let mut rows = Vec::with_capacity(wire.points.len());
        for point in &wire.points {
            let value = match point.get(value_index) {
                Some(Value::Null) | None => continue,
                Some(value) => value.as_f64().ok_or_else(|| {
                    TitsError::parse(format!(
                        "Non-numeric {} in series {}: {}",
                        column, wire.name, value
                    ))
                })?,
            };

            let time_ms = point
                .get(time_index)
                .and_then(|time| time.as_i64().or_else(|| time.as_f64().map(|t| t as i64)))
                .ok_or_else(|| {
                    TitsError::parse(format!("Missing time in series {}", wire.name))
                })?;

            rows.push(Row::new(time_ms, value));
        }

        response.insert(SeriesName::from_store(wire.name), rows);
    }

    Ok(response)
}

fn column_index(series: &WireSeries, column: &str) -> TitsResult<usize> {
    series
        .columns
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| {
            TitsError::parse(format!(
                "Series {} has no {} column (columns: {:?})",
                series.name, column, series.columns
            ))
        })
}

/// Body of a single-point write
pub fn write_body(series: &SeriesName, point: PointWrite) -> Vec<WireSeries> {
    vec![WireSeries {
        name: series.as_str().to_string(),
        columns: vec![TIME_COLUMN.to_string(), VALUE_FIELD.to_string()],
        points: vec![vec![Value::from(point.time_ms), Value::from(point.value)]],
    }]
}

#[async_trait]
impl SeriesStore for InfluxStore {
    async fn query(&self, query: &SeriesQuery) -> TitsResult<QueryResponse> {
        let series = self.execute(&query.to_string()).await?;
        decode_series(series, query.selector.column())
    }

    async fn write_point(&self, series: &SeriesName, point: PointWrite) -> TitsResult<()> {
        debug!("InfluxDB write to {}: {:?}", series, point);

        let response = self
            .http_client
            .post(self.series_url())
            .query(&self.credentials())
            .json(&write_body(series, point))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Write").await
    }

    async fn delete_series(&self, series: &SeriesName) -> TitsResult<()> {
        self.execute(&delete_statement(series)).await?;
        Ok(())
    }

    async fn drop_database(&self) -> TitsResult<()> {
        let response = self
            .http_client
            .delete(self.database_url())
            .query(&self.credentials())
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response, "Drop database").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(json: Value) -> Vec<WireSeries> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_urls() {
        let store = InfluxStore::new(
            StoreConfig::default()
                .with_database("tits_test")
                .with_address("influx.local", 8087),
        )
        .unwrap();

        assert_eq!(store.series_url(), "http://influx.local:8087/db/tits_test/series");
        assert_eq!(store.database_url(), "http://influx.local:8087/db/tits_test");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(InfluxStore::new(StoreConfig::default().with_database("")).is_err());
    }

    #[test]
    fn test_decode_raw_rows() {
        let series = wire(json!([{
            "name": "r1",
            "columns": ["time", "sequence_number", "value"],
            "points": [[1036029600000i64, 2, 163.96], [1036026000000i64, 1, 71.4]]
        }]));

        let response = decode_series(series, "value").unwrap();
        let name = SeriesName::from_store("r1");
        assert_eq!(
            response.rows(&name),
            &[Row::new(1_036_029_600_000, 163.96), Row::new(1_036_026_000_000, 71.4)]
        );
    }

    #[test]
    fn test_decode_aggregate_and_nulls() {
        let series = wire(json!([{
            "name": "r1",
            "columns": ["time", "mean"],
            "points": [[7200000, null], [3600000, 2.5]]
        }]));

        let response = decode_series(series, "mean").unwrap();
        assert_eq!(
            response.rows(&SeriesName::from_store("r1")),
            &[Row::new(3_600_000, 2.5)]
        );
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body("  ").unwrap().is_empty());
        let body = r#"[{"name":"r1","columns":["time","value"],"points":[]}]"#;
        assert_eq!(parse_body(body).unwrap().len(), 1);

        let error = parse_body("<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(error, TitsError::Json(_)));
        assert_eq!(error.category(), "json");
        assert!(matches!(parse_body(r#"{"name":"r1"}"#), Err(TitsError::Json(_))));
    }

    #[test]
    fn test_decode_rejects_missing_column() {
        let series = wire(json!([{
            "name": "r1",
            "columns": ["time", "max"],
            "points": [[0, 1.0]]
        }]));

        assert!(matches!(
            decode_series(series, "min"),
            Err(TitsError::Parse(_))
        ));
    }

    #[test]
    fn test_write_body_shape() {
        let body = write_body(
            &SeriesName::from_store("r7"),
            PointWrite {
                time_ms: 1_000,
                value: 2.5,
            },
        );

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!([{"name": "r7", "columns": ["time", "value"], "points": [[1000, 2.5]]}])
        );
    }
}
