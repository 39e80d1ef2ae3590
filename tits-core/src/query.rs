//! Query types for the store protocol
//!
//! Every repository operation maps to exactly one [`SeriesQuery`]. Its
//! `Display` output is the textual query sent to InfluxDB; the in-memory store
//! evaluates the typed form directly.

use chrono::Duration;
use std::fmt;

use crate::error::TitsResult;
use crate::series::SeriesName;
use crate::time::{Granularity, TimeRange, Timestamp};

/// Field every point is written under
pub const VALUE_FIELD: &str = "value";

/// Default half-width of the nearest-measurement window
pub const DEFAULT_TOLERANCE_SECS: i64 = 10 * 60;

/// What a query selects from each matching series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Raw points
    Raw,
    /// Arithmetic mean of the values
    Mean,
    /// Largest value
    Max,
    /// Smallest value
    Min,
}

impl Selector {
    /// Aggregate function name, `None` for raw selection
    pub fn function(&self) -> Option<&'static str> {
        match self {
            Selector::Raw => None,
            Selector::Mean => Some("mean"),
            Selector::Max => Some("max"),
            Selector::Min => Some("min"),
        }
    }

    /// Column that carries the selected value in a response row
    pub fn column(&self) -> &'static str {
        self.function().unwrap_or(VALUE_FIELD)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.function() {
            Some(function) => write!(f, "{}({})", function, VALUE_FIELD),
            None => write!(f, "{}", VALUE_FIELD),
        }
    }
}

/// Series a query reads from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    Series(SeriesName),
    /// Every series in the database (`/.*/`)
    AllSeries,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Series(name) => write!(f, "{}", name.to_query_identifier()),
            Source::AllSeries => write!(f, "/.*/"),
        }
    }
}

/// A single store query
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesQuery {
    pub selector: Selector,
    pub source: Source,
    /// Exclusive on both ends
    pub range: Option<TimeRange>,
    pub group_by: Option<Granularity>,
    /// Per-series row limit
    pub limit: Option<usize>,
}

impl SeriesQuery {
    /// Raw points of one series
    pub fn raw(series: SeriesName) -> Self {
        Self {
            selector: Selector::Raw,
            source: Source::Series(series),
            range: None,
            group_by: None,
            limit: None,
        }
    }

    /// One aggregate over one series
    pub fn aggregate(selector: Selector, series: SeriesName) -> Self {
        Self {
            selector,
            ..Self::raw(series)
        }
    }

    /// Most recent point of every series
    pub fn latest_of_all() -> Self {
        Self {
            selector: Selector::Raw,
            source: Source::AllSeries,
            range: None,
            group_by: None,
            limit: Some(1),
        }
    }

    pub fn between(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn group_by_time(mut self, granularity: Granularity) -> Self {
        self.group_by = Some(granularity);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select {} from {}", self.selector, self.source)?;

        if let Some(range) = &self.range {
            write!(
                f,
                " where time > {}s and time < {}s",
                range.start.timestamp(),
                range.end.timestamp()
            )?;
        }

        if let Some(granularity) = &self.group_by {
            write!(f, " group by time({})", granularity)?;
        }

        if let Some(limit) = self.limit {
            write!(f, " limit {}", limit)?;
        }

        write!(f, ";")
    }
}

/// Statement removing every point of a series
pub fn delete_statement(series: &SeriesName) -> String {
    format!("delete from {};", series.to_query_identifier())
}

/// Options for the nearest-measurement lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NearestOptions {
    /// Half-width of the window searched around the target time
    pub tolerance: Duration,
}

impl NearestOptions {
    pub fn with_tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for NearestOptions {
    fn default() -> Self {
        Self {
            tolerance: Duration::seconds(DEFAULT_TOLERANCE_SECS),
        }
    }
}

/// Options for bucketed range aggregation.
///
/// `start` defaults to the epoch and `end` to the time of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeOptions {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub granularity: Granularity,
}

impl RangeOptions {
    /// Everything from `start` up to now, hourly
    pub fn since(start: Timestamp) -> Self {
        Self::default().start(start)
    }

    pub fn start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    /// Resolve the defaults against the current time
    pub fn time_range(&self) -> TitsResult<TimeRange> {
        resolve_range(self.start, self.end)
    }
}

/// Options for whole-range max/min/mean evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtremumOptions {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
}

impl ExtremumOptions {
    pub fn start(mut self, start: Timestamp) -> Self {
        self.start = Some(start);
        self
    }

    pub fn end(mut self, end: Timestamp) -> Self {
        self.end = Some(end);
        self
    }

    /// Resolve the defaults against the current time
    pub fn time_range(&self) -> TitsResult<TimeRange> {
        resolve_range(self.start, self.end)
    }
}

impl From<TimeRange> for ExtremumOptions {
    fn from(range: TimeRange) -> Self {
        Self {
            start: Some(range.start),
            end: Some(range.end),
        }
    }
}

fn resolve_range(start: Option<Timestamp>, end: Option<Timestamp>) -> TitsResult<TimeRange> {
    let start = start.unwrap_or_else(Timestamp::epoch);
    let end = end.unwrap_or_else(Timestamp::now);
    TimeRange::new(start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::ResourceId;

    fn range(start: i64, end: i64) -> TimeRange {
        TimeRange::new(
            Timestamp::from_secs(start).unwrap(),
            Timestamp::from_secs(end).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_raw_window_query() {
        let query = SeriesQuery::raw(ResourceId::from(5i64).series_name()).between(range(400, 1600));
        assert_eq!(
            query.to_string(),
            "select value from r5 where time > 400s and time < 1600s;"
        );
    }

    #[test]
    fn test_bucketed_mean_query() {
        let query = SeriesQuery::aggregate(Selector::Mean, ResourceId::from(5i64).series_name())
            .between(range(0, 7200))
            .group_by_time(Granularity::from_secs(900).unwrap());
        assert_eq!(
            query.to_string(),
            "select mean(value) from r5 where time > 0s and time < 7200s group by time(900s);"
        );
    }

    #[test]
    fn test_latest_queries() {
        assert_eq!(
            SeriesQuery::latest_of_all().to_string(),
            "select value from /.*/ limit 1;"
        );
        assert_eq!(
            SeriesQuery::raw(ResourceId::from(9i64).series_name())
                .limit(1)
                .to_string(),
            "select value from r9 limit 1;"
        );
    }

    #[test]
    fn test_selector_columns() {
        assert_eq!(Selector::Raw.column(), "value");
        assert_eq!(Selector::Max.column(), "max");
        assert_eq!(Selector::Min.to_string(), "min(value)");
    }

    #[test]
    fn test_delete_statement() {
        assert_eq!(
            delete_statement(&ResourceId::from(3i64).series_name()),
            "delete from r3;"
        );
    }

    #[test]
    fn test_range_defaults() {
        let before = Timestamp::now();
        let resolved = RangeOptions::default().time_range().unwrap();

        assert_eq!(resolved.start, Timestamp::epoch());
        assert!(resolved.end >= before);
        assert_eq!(RangeOptions::default().granularity, Granularity::HOUR);
        assert_eq!(NearestOptions::default().tolerance, Duration::minutes(10));
    }

    #[test]
    fn test_inverted_range_is_an_error() {
        let options = ExtremumOptions::default()
            .start(Timestamp::from_secs(100).unwrap())
            .end(Timestamp::from_secs(50).unwrap());
        assert!(options.time_range().is_err());
    }
}
