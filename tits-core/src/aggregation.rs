//! Bucketed mean series over a time range

use tracing::debug;

use crate::context::StoreContext;
use crate::error::TitsResult;
use crate::measurement::Measurement;
use crate::query::{RangeOptions, Selector, SeriesQuery};
use crate::series::ResourceId;
use crate::time::{Granularity, Timestamp};

/// Mean value per `granularity` bucket between the range bounds.
///
/// Bucket boundaries are whatever the store aligns them to (the epoch for
/// InfluxDB) and buckets without points are absent. The result is ordered by
/// bucket start, oldest first. Returns `Ok(None)` when no bucket has data.
pub async fn aggregate_range(
    context: &StoreContext,
    resource_id: &ResourceId,
    options: RangeOptions,
) -> TitsResult<Option<Vec<Measurement>>> {
    let range = options.time_range()?;
    let series = resource_id.series_name();
    let query = SeriesQuery::aggregate(Selector::Mean, series.clone())
        .between(range)
        .group_by_time(options.granularity);

    let response = context.query(&query).await?;
    let rows = response.rows(&series);
    if rows.is_empty() {
        return Ok(None);
    }

    let mut measurements = rows
        .iter()
        .map(|row| {
            Ok(Measurement::new(
                resource_id.clone(),
                row.value,
                Timestamp::from_store_millis(row.time_ms)?,
            ))
        })
        .collect::<TitsResult<Vec<_>>>()?;
    measurements.sort_by_key(|m| m.time());

    debug!(
        "{} buckets of {} for resource {} in {}",
        measurements.len(),
        options.granularity,
        resource_id,
        range
    );
    Ok(Some(measurements))
}

/// Bucketed means from `start` until now, one hour per bucket unless overridden
pub async fn measurements_since(
    context: &StoreContext,
    resource_id: &ResourceId,
    start: Timestamp,
    granularity: Option<Granularity>,
) -> TitsResult<Option<Vec<Measurement>>> {
    let mut options = RangeOptions::since(start);
    if let Some(granularity) = granularity {
        options = options.granularity(granularity);
    }
    aggregate_range(context, resource_id, options).await
}
