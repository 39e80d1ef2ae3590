//! Maximum, minimum and average over a time range

use crate::context::StoreContext;
use crate::error::TitsResult;
use crate::measurement::Measurement;
use crate::query::{ExtremumOptions, Selector, SeriesQuery};
use crate::series::ResourceId;
use crate::time::Timestamp;

/// Measurement with the largest value in range, timed at that point
pub async fn max_in_range(
    context: &StoreContext,
    resource_id: &ResourceId,
    options: ExtremumOptions,
) -> TitsResult<Option<Measurement>> {
    evaluate(context, resource_id, Selector::Max, options).await
}

/// Measurement with the smallest value in range, timed at that point
pub async fn min_in_range(
    context: &StoreContext,
    resource_id: &ResourceId,
    options: ExtremumOptions,
) -> TitsResult<Option<Measurement>> {
    evaluate(context, resource_id, Selector::Min, options).await
}

/// Arithmetic mean of the values in range. The result carries no time.
pub async fn avg_in_range(
    context: &StoreContext,
    resource_id: &ResourceId,
    options: ExtremumOptions,
) -> TitsResult<Option<Measurement>> {
    evaluate(context, resource_id, Selector::Mean, options).await
}

async fn evaluate(
    context: &StoreContext,
    resource_id: &ResourceId,
    selector: Selector,
    options: ExtremumOptions,
) -> TitsResult<Option<Measurement>> {
    let series = resource_id.series_name();
    let query = SeriesQuery::aggregate(selector, series.clone()).between(options.time_range()?);

    let response = context.query(&query).await?;
    let Some(row) = response.first(&series) else {
        return Ok(None);
    };

    let measurement = match selector {
        Selector::Mean => Measurement::untimed(resource_id.clone(), row.value),
        _ => Measurement::new(
            resource_id.clone(),
            row.value,
            Timestamp::from_store_millis(row.time_ms)?,
        ),
    };
    Ok(Some(measurement))
}
