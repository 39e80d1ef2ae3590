//! Most recent measurement of many resources in one round-trip

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::context::StoreContext;
use crate::datastore::{QueryResponse, Row};
use crate::error::TitsResult;
use crate::measurement::Measurement;
use crate::query::SeriesQuery;
use crate::series::ResourceId;
use crate::time::Timestamp;

/// Which resources a snapshot covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResourceSelection {
    /// Every series in the store
    #[default]
    All,
    /// Only these resources. Duplicates are ignored.
    Only(Vec<ResourceId>),
}

impl From<ResourceId> for ResourceSelection {
    fn from(id: ResourceId) -> Self {
        ResourceSelection::Only(vec![id])
    }
}

impl From<Vec<ResourceId>> for ResourceSelection {
    fn from(ids: Vec<ResourceId>) -> Self {
        ResourceSelection::Only(ids)
    }
}

impl From<&[ResourceId]> for ResourceSelection {
    fn from(ids: &[ResourceId]) -> Self {
        ResourceSelection::Only(ids.to_vec())
    }
}

impl From<Option<Vec<ResourceId>>> for ResourceSelection {
    fn from(ids: Option<Vec<ResourceId>>) -> Self {
        ids.map_or(ResourceSelection::All, ResourceSelection::Only)
    }
}

/// Latest measurement per resource.
///
/// With [`ResourceSelection::All`] every series whose name maps back to a
/// resource id is reported. With an explicit list, resources without a series
/// are left out silently, so the result may be shorter than the list.
pub async fn multi_current_measurements(
    context: &StoreContext,
    selection: impl Into<ResourceSelection>,
) -> TitsResult<Vec<Measurement>> {
    let response = context.query(&SeriesQuery::latest_of_all()).await?;
    debug!("Latest points of {} series", response.series_count());

    match selection.into() {
        ResourceSelection::All => all_resources(&response),
        ResourceSelection::Only(ids) => selected_resources(&response, ids),
    }
}

fn all_resources(response: &QueryResponse) -> TitsResult<Vec<Measurement>> {
    let mut measurements = Vec::with_capacity(response.series_count());

    for (series, rows) in response.iter() {
        let Some(resource_id) = series.resource_id() else {
            warn!("Skipping series {} with no resource id", series);
            continue;
        };

        if let Some(row) = rows.first() {
            measurements.push(to_measurement(resource_id, row)?);
        }
    }

    Ok(measurements)
}

fn selected_resources(response: &QueryResponse, ids: Vec<ResourceId>) -> TitsResult<Vec<Measurement>> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut measurements = Vec::with_capacity(ids.len());

    for id in ids {
        if !seen.insert(id.clone()) {
            continue;
        }

        if let Some(row) = response.first(&id.series_name()) {
            measurements.push(to_measurement(id, row)?);
        }
    }

    Ok(measurements)
}

fn to_measurement(resource_id: ResourceId, row: &Row) -> TitsResult<Measurement> {
    Ok(Measurement::new(
        resource_id,
        row.value,
        Timestamp::from_store_millis(row.time_ms)?,
    ))
}
