//! Nearest-measurement lookup

use tracing::debug;

use crate::context::StoreContext;
use crate::datastore::Row;
use crate::error::TitsResult;
use crate::measurement::Measurement;
use crate::query::{NearestOptions, SeriesQuery};
use crate::series::ResourceId;
use crate::time::{TimeRange, Timestamp};

/// Find the measurement closest to `target` within the tolerance window.
///
/// The window is exact to the millisecond: the store is asked for the
/// enclosing whole-second range and rows outside the window are dropped.
/// Points exactly on the window edges are excluded. Returns `Ok(None)` when
/// the window holds no point.
pub async fn find_nearest(
    context: &StoreContext,
    resource_id: &ResourceId,
    target: Timestamp,
    options: NearestOptions,
) -> TitsResult<Option<Measurement>> {
    let window = TimeRange::around(target, options.tolerance)?;
    let series = resource_id.series_name();
    let query = SeriesQuery::raw(series.clone()).between(window.covering_seconds()?);

    let response = context.query(&query).await?;
    let rows: Vec<Row> = response
        .rows(&series)
        .iter()
        .filter(|row| window.contains_millis(row.time_ms))
        .copied()
        .collect();
    debug!(
        "{} candidate points around {} for resource {}",
        rows.len(),
        target,
        resource_id
    );

    match closest_row(&rows, target.timestamp_millis()) {
        Some(row) => Ok(Some(Measurement::new(
            resource_id.clone(),
            row.value,
            Timestamp::from_store_millis(row.time_ms)?,
        ))),
        None => Ok(None),
    }
}

/// Pick the row closest to `target_ms`.
///
/// Among equally close rows the earlier timestamp wins; rows at the same time
/// keep store order.
pub fn closest_row(rows: &[Row], target_ms: i64) -> Option<&Row> {
    rows.iter().min_by(|a, b| {
        let distance_a = (a.time_ms - target_ms).unsigned_abs();
        let distance_b = (b.time_ms - target_ms).unsigned_abs();
        distance_a
            .cmp(&distance_b)
            .then_with(|| a.time_ms.cmp(&b.time_ms))
    })
}
