//! Time handling utilities for TITS
//!
//! All times are kept in UTC. The store's time arithmetic is zone-naive, so
//! caller-supplied times in any zone are converted on the way in.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TitsError, TitsResult};

/// Timestamp representing a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Get the current timestamp
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// The epoch origin, default start of every range query
    pub fn epoch() -> Self {
        Self(Utc.timestamp_nanos(0))
    }

    /// Create from milliseconds since Unix epoch
    pub fn from_millis(millis: i64) -> TitsResult<Self> {
        match Utc.timestamp_millis_opt(millis) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(TitsError::TimeRange(format!("Invalid timestamp: {}", millis))),
        }
    }

    /// Create from seconds since Unix epoch
    pub fn from_secs(secs: i64) -> TitsResult<Self> {
        match Utc.timestamp_opt(secs, 0) {
            chrono::LocalResult::Single(dt) => Ok(Self(dt)),
            _ => Err(TitsError::TimeRange(format!("Invalid timestamp: {}", secs))),
        }
    }

    /// Create from a store timestamp (milliseconds), dropping the sub-second part.
    pub fn from_store_millis(millis: i64) -> TitsResult<Self> {
        Self::from_secs(millis.div_euclid(1000))
    }

    /// Get milliseconds since Unix epoch
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Get seconds since Unix epoch
    pub fn timestamp(&self) -> i64 {
        self.0.timestamp()
    }

    /// Get the underlying DateTime<Utc>
    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as ISO 8601 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Parse from ISO 8601 string, converting any offset to UTC
    pub fn from_rfc3339(s: &str) -> TitsResult<Self> {
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| TitsError::TimeRange(format!("Invalid RFC3339 timestamp: {}", e)))?
            .with_timezone(&Utc);
        Ok(Self(dt))
    }

    /// Add a duration
    pub fn add(&self, duration: Duration) -> TitsResult<Self> {
        self.0
            .checked_add_signed(duration)
            .map(Self)
            .ok_or_else(|| TitsError::TimeRange("Timestamp overflow".to_string()))
    }

    /// Subtract a duration
    pub fn sub(&self, duration: Duration) -> TitsResult<Self> {
        self.0
            .checked_sub_signed(duration)
            .map(Self)
            .ok_or_else(|| TitsError::TimeRange("Timestamp underflow".to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Timestamp {
    fn from(dt: DateTime<Tz>) -> Self {
        Self(dt.with_timezone(&Utc))
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Time range for queries.
///
/// Both bounds are exclusive when encoded into a store query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TimeRange {
    /// Create a new time range. A start after the end is rejected.
    pub fn new(start: Timestamp, end: Timestamp) -> TitsResult<Self> {
        if start > end {
            return Err(TitsError::TimeRange(format!(
                "Start time {} is after end time {}",
                start, end
            )));
        }

        Ok(Self { start, end })
    }

    /// The symmetric window `(center - margin, center + margin)`
    pub fn around(center: Timestamp, margin: Duration) -> TitsResult<Self> {
        if margin < Duration::zero() {
            return Err(TitsError::TimeRange("Tolerance must not be negative".to_string()));
        }
        Self::new(center.sub(margin)?, center.add(margin)?)
    }

    /// Get the duration of this time range in milliseconds
    pub fn duration_millis(&self) -> i64 {
        self.end.timestamp_millis() - self.start.timestamp_millis()
    }

    /// Check if a timestamp falls strictly inside this range
    pub fn contains_exclusive(&self, timestamp: Timestamp) -> bool {
        timestamp > self.start && timestamp < self.end
    }

    /// Check if a millisecond epoch time falls strictly inside this range
    pub fn contains_millis(&self, millis: i64) -> bool {
        millis > self.start.timestamp_millis() && millis < self.end.timestamp_millis()
    }

    /// Smallest range with whole-second bounds that contains this one.
    ///
    /// Store queries carry second bounds; rows from the widened range are
    /// filtered back with [`TimeRange::contains_millis`].
    pub fn covering_seconds(&self) -> TitsResult<Self> {
        let end_millis = self.end.timestamp_millis();
        let mut end_secs = end_millis.div_euclid(1000);
        if end_millis.rem_euclid(1000) != 0 {
            end_secs += 1;
        }

        Self::new(
            Timestamp::from_secs(self.start.timestamp_millis().div_euclid(1000))?,
            Timestamp::from_secs(end_secs)?,
        )
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} - {})", self.start, self.end)
    }
}

/// Largest bucket width whose millisecond form fits an `i64`
const MAX_GRANULARITY_SECS: u64 = (i64::MAX / 1000) as u64;

/// Width of the fixed buckets used by range aggregation, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct Granularity(u64);

impl Granularity {
    /// One hour, the default bucket width
    pub const HOUR: Granularity = Granularity(3600);

    /// Create a granularity; zero and widths beyond the millisecond range are rejected
    pub fn from_secs(secs: u64) -> TitsResult<Self> {
        if secs == 0 {
            return Err(TitsError::validation("Granularity must be greater than 0"));
        }

        if secs > MAX_GRANULARITY_SECS {
            return Err(TitsError::validation(format!(
                "Granularity too large: {}s > {}s",
                secs, MAX_GRANULARITY_SECS
            )));
        }

        Ok(Self(secs))
    }

    pub fn from_minutes(minutes: u64) -> TitsResult<Self> {
        Self::from_scaled(minutes, 60)
    }

    pub fn from_hours(hours: u64) -> TitsResult<Self> {
        Self::from_scaled(hours, 3600)
    }

    pub fn from_days(days: u64) -> TitsResult<Self> {
        Self::from_scaled(days, 86_400)
    }

    fn from_scaled(count: u64, unit_secs: u64) -> TitsResult<Self> {
        let secs = count.checked_mul(unit_secs).ok_or_else(|| {
            TitsError::validation(format!("Granularity overflows: {} x {}s", count, unit_secs))
        })?;
        Self::from_secs(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        // from_secs bounds the width so this cannot overflow
        self.0 as i64 * 1000
    }
}

impl TryFrom<u64> for Granularity {
    type Error = TitsError;

    fn try_from(secs: u64) -> TitsResult<Self> {
        Self::from_secs(secs)
    }
}

impl From<Granularity> for u64 {
    fn from(granularity: Granularity) -> Self {
        granularity.0
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Self::HOUR
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
