//! Measurement types returned by every query operation

use serde::{Deserialize, Serialize};

use crate::series::ResourceId;
use crate::time::Timestamp;

/// A scalar value of a resource at a point in time.
///
/// `time` has second granularity once it has been through the store. It is
/// `None` only for averages, which have no single associated timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    resource_id: ResourceId,
    value: f64,
    time: Option<Timestamp>,
}

impl Measurement {
    /// Create a measurement taken at a known time
    pub fn new(resource_id: ResourceId, value: f64, time: Timestamp) -> Self {
        Self {
            resource_id,
            value,
            time: Some(time),
        }
    }

    /// Create a measurement that has no associated time (averages)
    pub fn untimed(resource_id: ResourceId, value: f64) -> Self {
        Self {
            resource_id,
            value,
            time: None,
        }
    }

    pub fn resource_id(&self) -> &ResourceId {
        &self.resource_id
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn time(&self) -> Option<Timestamp> {
        self.time
    }
}

/// Plain carrier handed to the write observer after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementDto {
    pub resource_id: ResourceId,
    pub value: f64,
    pub time: Timestamp,
}

impl From<MeasurementDto> for Measurement {
    fn from(dto: MeasurementDto) -> Self {
        Measurement::new(dto.resource_id, dto.value, dto.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untimed_measurement() {
        let avg = Measurement::untimed(ResourceId::from(3i64), 12.5);
        assert_eq!(avg.value(), 12.5);
        assert!(avg.time().is_none());
    }

    #[test]
    fn test_dto_serializes_flat() {
        let dto = MeasurementDto {
            resource_id: ResourceId::from(7i64),
            value: 1.5,
            time: Timestamp::from_secs(60).unwrap(),
        };

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["resource_id"], "7");
        assert_eq!(json["value"], 1.5);

        let measurement = Measurement::from(dto);
        assert_eq!(measurement.time().map(|t| t.timestamp()), Some(60));
    }
}
