//! In-memory store for tests and local experiments
//!
//! Evaluates [`SeriesQuery`] values with the same observable behavior as
//! InfluxDB 0.8: raw rows come back newest first, `limit` applies per series,
//! time bounds are exclusive and whole seconds, `group by time` buckets are
//! aligned to the epoch and empty buckets are left out.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace};

use crate::datastore::{PointWrite, QueryResponse, Row, SeriesStore};
use crate::error::{TitsError, TitsResult};
use crate::query::{Selector, SeriesQuery, Source};
use crate::series::SeriesName;

/// Stored points of one series, in write order
type Points = Vec<PointWrite>;

/// In-memory [`SeriesStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<SeriesName, Points>>,
    operations: RwLock<Vec<String>>,
    unavailable: AtomicBool,
    round_trips: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail as if the store were unreachable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of points stored for a series
    pub fn point_count(&self, series: &SeriesName) -> usize {
        self.series.read().get(series).map(Vec::len).unwrap_or(0)
    }

    /// Names of all series currently holding points
    pub fn series_names(&self) -> Vec<SeriesName> {
        let mut names: Vec<_> = self.series.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Every statement received so far, rendered as store query text
    pub fn operations(&self) -> Vec<String> {
        self.operations.read().clone()
    }

    /// Number of round-trips served, failed ones included
    pub fn round_trips(&self) -> u64 {
        self.round_trips.load(Ordering::Relaxed)
    }

    fn begin(&self, operation: String) -> TitsResult<()> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        trace!("Memory store: {}", operation);
        self.operations.write().push(operation);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TitsError::store_unavailable("Simulated store outage"));
        }
        Ok(())
    }

    fn evaluate(query: &SeriesQuery, points: &[PointWrite]) -> Vec<Row> {
        let (lower_ms, upper_ms) = match &query.range {
            Some(range) => (
                Some(range.start.timestamp().saturating_mul(1000)),
                Some(range.end.timestamp().saturating_mul(1000)),
            ),
            None => (None, None),
        };

        // Newest first; equal times keep the most recent write first.
        let mut matching: Vec<PointWrite> = points
            .iter()
            .rev()
            .filter(|p| lower_ms.map_or(true, |lower| p.time_ms > lower))
            .filter(|p| upper_ms.map_or(true, |upper| p.time_ms < upper))
            .copied()
            .collect();
        matching.sort_by(|a, b| b.time_ms.cmp(&a.time_ms));

        let mut rows: Vec<Row> = match (query.selector, query.group_by) {
            (Selector::Raw, _) => matching
                .iter()
                .map(|p| Row::new(p.time_ms, p.value))
                .collect(),
            (selector, None) => aggregate(selector, &matching, None)
                .into_iter()
                .collect(),
            (selector, Some(granularity)) => {
                let width = granularity.as_millis();
                let mut buckets: Vec<(i64, Vec<PointWrite>)> = Vec::new();
                for point in matching {
                    let bucket = point.time_ms.div_euclid(width) * width;
                    match buckets.last_mut() {
                        Some((start, members)) if *start == bucket => members.push(point),
                        _ => buckets.push((bucket, vec![point])),
                    }
                }
                buckets
                    .iter()
                    .filter_map(|(start, members)| aggregate(selector, members, Some(*start)))
                    .collect()
            }
        };

        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        rows
    }
}

/// Aggregate a non-empty, newest-first group of points.
///
/// `bucket` is the start of the `group by time` bucket, if any. Without one,
/// max/min report the time of the extremal point and mean reports 0.
fn aggregate(selector: Selector, points: &[PointWrite], bucket: Option<i64>) -> Option<Row> {
    let first = points.first()?;

    let row = match selector {
        Selector::Raw => Row::new(first.time_ms, first.value),
        Selector::Mean => {
            let mean = points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64;
            Row::new(bucket.unwrap_or(0), mean)
        }
        Selector::Max => {
            let max = points
                .iter()
                .fold(first, |best, p| if p.value > best.value { p } else { best });
            Row::new(bucket.unwrap_or(max.time_ms), max.value)
        }
        Selector::Min => {
            let min = points
                .iter()
                .fold(first, |best, p| if p.value < best.value { p } else { best });
            Row::new(bucket.unwrap_or(min.time_ms), min.value)
        }
    };
    Some(row)
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn query(&self, query: &SeriesQuery) -> TitsResult<QueryResponse> {
        self.begin(query.to_string())?;

        let series = self.series.read();
        let mut response = QueryResponse::new();

        match &query.source {
            Source::Series(name) => {
                if let Some(points) = series.get(name) {
                    let rows = Self::evaluate(query, points);
                    if !rows.is_empty() {
                        response.insert(name.clone(), rows);
                    }
                }
            }
            Source::AllSeries => {
                for (name, points) in series.iter() {
                    let rows = Self::evaluate(query, points);
                    if !rows.is_empty() {
                        response.insert(name.clone(), rows);
                    }
                }
            }
        }

        debug!(
            "Memory store answered with {} rows from {} series",
            response.row_count(),
            response.series_count()
        );
        Ok(response)
    }

    async fn write_point(&self, series: &SeriesName, point: PointWrite) -> TitsResult<()> {
        self.begin(format!(
            "write {} time={} value={}",
            series, point.time_ms, point.value
        ))?;

        self.series
            .write()
            .entry(series.clone())
            .or_default()
            .push(point);
        Ok(())
    }

    async fn delete_series(&self, series: &SeriesName) -> TitsResult<()> {
        self.begin(crate::query::delete_statement(series))?;
        self.series.write().remove(series);
        Ok(())
    }

    async fn drop_database(&self) -> TitsResult<()> {
        self.begin("drop database".to_string())?;
        self.series.write().clear();
        Ok(())
    }
}
