//! Round-trip tests against InfluxDB

use crate::common::E2ETestConfig;
use chrono::{Duration, TimeZone, Utc};
use tits_core::{multi_current_measurements, ExtremumOptions, RangeOptions, Timestamp};

const VALUE: f64 = 163.96;
const VALUE2: f64 = 71.4;

fn time() -> Timestamp {
    Timestamp::from(Utc.with_ymd_and_hms(2002, 10, 31, 2, 0, 0).unwrap())
}

fn time2() -> Timestamp {
    Timestamp::from(Utc.with_ymd_and_hms(2002, 10, 31, 1, 0, 0).unwrap())
}

#[tokio::test]
#[ignore] // Run with --ignored flag, requires InfluxDB 0.8
async fn test_unwritten_resource_has_nothing() {
    let config = E2ETestConfig::new();
    let r = config.repository("empty");

    assert!(r.current_measurement().await.unwrap().is_none());
    assert!(r.measurement(Timestamp::now()).await.unwrap().is_none());
    assert!(r.measurements(RangeOptions::default()).await.unwrap().is_none());
    assert!(r.max_measurement(ExtremumOptions::default()).await.unwrap().is_none());
    assert!(r.avg_measurement(ExtremumOptions::default()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Run with --ignored flag, requires InfluxDB 0.8
async fn test_write_then_read_back() {
    let config = E2ETestConfig::new();
    let r = config.repository("flow");

    r.add_measurement_at(VALUE, time()).await.unwrap();
    r.add_measurement_at(VALUE2, time2()).await.unwrap();

    let current = r.current_measurement().await.unwrap().unwrap();
    assert_eq!(current.value(), VALUE);
    assert_eq!(current.time(), Some(time()));

    let close = r
        .measurement(time().sub(Duration::minutes(9)).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(close.time(), Some(time()));
    assert!(r
        .measurement(time().sub(Duration::minutes(11)).unwrap())
        .await
        .unwrap()
        .is_none());

    let since = r
        .measurements_since(time().sub(Duration::minutes(10)).unwrap(), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(since.len(), 1);
    assert_eq!(since[0].value(), VALUE);

    let max = r.max_measurement(ExtremumOptions::default()).await.unwrap().unwrap();
    assert_eq!(max.value(), VALUE);

    r.delete_series().await.unwrap();
    assert!(r.current_measurement().await.unwrap().is_none());
}

#[tokio::test]
#[ignore] // Run with --ignored flag, requires InfluxDB 0.8
async fn test_snapshot_skips_missing_ids() {
    let config = E2ETestConfig::new();
    let first = config.repository("snap1");
    let second = config.repository("snap2");
    first.add_measurement(1.0).await.unwrap();
    second.add_measurement(2.0).await.unwrap();

    let ids = vec![
        first.resource_id().clone(),
        second.resource_id().clone(),
        config.test_resource_id("missing"),
    ];
    let found = multi_current_measurements(&config.context, ids).await.unwrap();
    assert_eq!(found.len(), 2);

    first.delete_series().await.unwrap();
    second.delete_series().await.unwrap();
}
