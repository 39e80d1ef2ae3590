//! Write notification sink

use crate::error::TitsResult;
use crate::measurement::MeasurementDto;

/// Receives every measurement right after it has been written to the store.
///
/// Called synchronously on the writer's task. An error is reported to the
/// writer as [`TitsError::Notification`](crate::error::TitsError::Notification);
/// the written point stays in the store.
pub trait WriteObserver: Send + Sync {
    fn on_write(&self, measurement: &MeasurementDto) -> TitsResult<()>;
}

impl<F> WriteObserver for F
where
    F: Fn(&MeasurementDto) -> TitsResult<()> + Send + Sync,
{
    fn on_write(&self, measurement: &MeasurementDto) -> TitsResult<()> {
        self(measurement)
    }
}
