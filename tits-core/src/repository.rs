//! Per-resource measurement facade

use std::sync::Arc;
use tracing::debug;

use crate::aggregation;
use crate::context::StoreContext;
use crate::datastore::PointWrite;
use crate::error::TitsResult;
use crate::extremum;
use crate::measurement::{Measurement, MeasurementDto};
use crate::query::{ExtremumOptions, NearestOptions, RangeOptions, SeriesQuery};
use crate::resolver;
use crate::series::ResourceId;
use crate::time::{Granularity, Timestamp};

/// Reads and writes the measurements of one resource.
///
/// Holds nothing but the resource id and a handle to the shared context, so
/// it is cheap to create per call.
#[derive(Debug, Clone)]
pub struct MeasurementRepository {
    context: Arc<StoreContext>,
    resource_id: ResourceId,
}

impl MeasurementRepository {
    pub fn new(context: Arc<StoreContext>, resource_id: impl Into<ResourceId>) -> Self {
        Self {
            context,
            resource_id: resource_id.into(),
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    /// Write a value taken now
    pub async fn add_measurement(&self, value: f64) -> TitsResult<()> {
        self.add_measurement_at(value, Timestamp::now()).await
    }

    /// Write a value taken at `time`, then notify the write observer.
    ///
    /// The point is stored before the observer runs. If the observer fails,
    /// the error is returned but the point remains stored.
    pub async fn add_measurement_at(&self, value: f64, time: Timestamp) -> TitsResult<()> {
        let series = self.resource_id.series_name();
        let point = PointWrite {
            time_ms: time.timestamp_millis(),
            value,
        };

        self.context.write_point(&series, point).await?;
        debug!("Wrote {} to {} at {}", value, series, time);

        self.context.notify(&MeasurementDto {
            resource_id: self.resource_id.clone(),
            value,
            time,
        })
    }

    /// Most recent measurement
    pub async fn current_measurement(&self) -> TitsResult<Option<Measurement>> {
        let series = self.resource_id.series_name();
        let response = self
            .context
            .query(&SeriesQuery::raw(series.clone()).limit(1))
            .await?;

        match response.first(&series) {
            Some(row) => Ok(Some(Measurement::new(
                self.resource_id.clone(),
                row.value,
                Timestamp::from_store_millis(row.time_ms)?,
            ))),
            None => Ok(None),
        }
    }

    /// Measurement closest to `time` within the default ten minute tolerance
    pub async fn measurement(&self, time: Timestamp) -> TitsResult<Option<Measurement>> {
        self.measurement_with(time, NearestOptions::default()).await
    }

    /// Measurement closest to `time` within a custom tolerance
    pub async fn measurement_with(
        &self,
        time: Timestamp,
        options: NearestOptions,
    ) -> TitsResult<Option<Measurement>> {
        resolver::find_nearest(&self.context, &self.resource_id, time, options).await
    }

    /// Bucketed means over a range
    pub async fn measurements(&self, options: RangeOptions) -> TitsResult<Option<Vec<Measurement>>> {
        aggregation::aggregate_range(&self.context, &self.resource_id, options).await
    }

    /// Bucketed means from `start` until now
    pub async fn measurements_since(
        &self,
        start: Timestamp,
        granularity: Option<Granularity>,
    ) -> TitsResult<Option<Vec<Measurement>>> {
        aggregation::measurements_since(&self.context, &self.resource_id, start, granularity).await
    }

    pub async fn max_measurement(&self, options: ExtremumOptions) -> TitsResult<Option<Measurement>> {
        extremum::max_in_range(&self.context, &self.resource_id, options).await
    }

    pub async fn min_measurement(&self, options: ExtremumOptions) -> TitsResult<Option<Measurement>> {
        extremum::min_in_range(&self.context, &self.resource_id, options).await
    }

    pub async fn avg_measurement(&self, options: ExtremumOptions) -> TitsResult<Option<Measurement>> {
        extremum::avg_in_range(&self.context, &self.resource_id, options).await
    }

    /// Delete every measurement of this resource. There is no undo.
    pub async fn delete_series(&self) -> TitsResult<()> {
        self.context.delete_series(&self.resource_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::memory::MemoryStore;
    use crate::error::TitsError;

    fn repository() -> (Arc<MemoryStore>, MeasurementRepository) {
        let store = Arc::new(MemoryStore::new());
        let context = Arc::new(StoreContext::new(store.clone()));
        (store, MeasurementRepository::new(context, 5i64))
    }

    #[tokio::test]
    async fn test_add_writes_full_millisecond_time() {
        let (store, repository) = repository();
        let time = Timestamp::from_millis(1_036_029_600_250).unwrap();
        repository.add_measurement_at(1.5, time).await.unwrap();

        assert_eq!(
            store.operations(),
            vec!["write r5 time=1036029600250 value=1.5".to_string()]
        );

        let current = repository.current_measurement().await.unwrap().unwrap();
        assert_eq!(current.time().map(|t| t.timestamp()), Some(1_036_029_600));
    }

    #[tokio::test]
    async fn test_failed_write_skips_observer() {
        let (store, repository) = repository();
        repository
            .context
            .register_observer(|_: &MeasurementDto| -> TitsResult<()> {
                panic!("observer must not run")
            });
        store.set_unavailable(true);

        let result = repository.add_measurement(1.0).await;
        assert!(matches!(result, Err(TitsError::StoreUnavailable(_))));
    }

    #[tokio::test]
    async fn test_each_read_is_one_query() {
        let (store, repository) = repository();
        repository.current_measurement().await.unwrap();
        repository.measurement(Timestamp::now()).await.unwrap();
        repository.measurements(RangeOptions::default()).await.unwrap();
        repository
            .max_measurement(ExtremumOptions::default())
            .await
            .unwrap();

        assert_eq!(store.round_trips(), 4);
    }
}
