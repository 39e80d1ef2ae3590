//! Store abstraction layer for TITS
//!
//! The external time-series store owns persistence and indexing. This layer
//! only needs four operations from it: run one query, write one point, delete
//! one series and drop the whole database.

pub mod influx;
pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::TitsResult;
use crate::query::SeriesQuery;
use crate::series::SeriesName;

/// Minimal interface every store backend implements.
///
/// Each call is one self-contained round-trip. Implementations must be safe to
/// call concurrently and must not retry on their own.
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Run a query and return the matching rows grouped by series.
    ///
    /// Series without matching rows may be absent from the response.
    async fn query(&self, query: &SeriesQuery) -> TitsResult<QueryResponse>;

    /// Write a single point to a series, creating the series if needed.
    async fn write_point(&self, series: &SeriesName, point: PointWrite) -> TitsResult<()>;

    /// Irrecoverably delete every point of a series.
    async fn delete_series(&self, series: &SeriesName) -> TitsResult<()>;

    /// Irrecoverably delete the whole database.
    async fn drop_database(&self) -> TitsResult<()>;
}

/// Type alias for a shared store trait object
pub type BoxedSeriesStore = Arc<dyn SeriesStore>;

/// A point as sent to the write protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointWrite {
    /// Milliseconds since the Unix epoch
    pub time_ms: i64,
    pub value: f64,
}

/// One row of a query response
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Row {
    /// Milliseconds since the Unix epoch
    pub time_ms: i64,
    /// Value of the selected column (`value`, `mean`, `max` or `min`)
    pub value: f64,
}

impl Row {
    pub fn new(time_ms: i64, value: f64) -> Self {
        Self { time_ms, value }
    }
}

/// Query response: series name to rows, in the order the store returned them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResponse {
    series: BTreeMap<SeriesName, Vec<Row>>,
}

impl QueryResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rows for a series, appending to any rows already present
    pub fn insert(&mut self, series: SeriesName, rows: Vec<Row>) {
        self.series.entry(series).or_default().extend(rows);
    }

    /// Rows for a series; empty when the series is absent
    pub fn rows(&self, series: &SeriesName) -> &[Row] {
        self.series.get(series).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First row for a series, if any
    pub fn first(&self, series: &SeriesName) -> Option<&Row> {
        self.rows(series).first()
    }

    /// True if no series carries any row
    pub fn is_empty(&self) -> bool {
        self.series.values().all(Vec::is_empty)
    }

    /// Number of series in the response
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Total number of rows across all series
    pub fn row_count(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeriesName, &[Row])> {
        self.series.iter().map(|(name, rows)| (name, rows.as_slice()))
    }
}

impl FromIterator<(SeriesName, Vec<Row>)> for QueryResponse {
    fn from_iter<I: IntoIterator<Item = (SeriesName, Vec<Row>)>>(iter: I) -> Self {
        let mut response = QueryResponse::new();
        for (series, rows) in iter {
            response.insert(series, rows);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_series_has_no_rows() {
        let response = QueryResponse::new();
        let series = SeriesName::from_store("r1");

        assert!(response.is_empty());
        assert!(response.rows(&series).is_empty());
        assert!(response.first(&series).is_none());
    }

    #[test]
    fn test_rows_keep_store_order() {
        let series = SeriesName::from_store("r1");
        let response: QueryResponse = [(
            series.clone(),
            vec![Row::new(3000, 3.0), Row::new(1000, 1.0)],
        )]
        .into_iter()
        .collect();

        assert_eq!(response.row_count(), 2);
        assert_eq!(response.first(&series), Some(&Row::new(3000, 3.0)));
    }

    #[test]
    fn test_series_with_empty_rows_counts_as_empty() {
        let mut response = QueryResponse::new();
        response.insert(SeriesName::from_store("r1"), Vec::new());

        assert!(response.is_empty());
        assert_eq!(response.series_count(), 1);
    }
}
