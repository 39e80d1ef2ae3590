//! Health check tests

use crate::common::E2ETestConfig;
use tracing::info;

#[tokio::test]
#[ignore] // Run with --ignored flag, requires InfluxDB 0.8
async fn test_00_influxdb_ping() {
    // 00_ prefix so this runs first
    let config = E2ETestConfig::new();
    let url = format!("{}/ping", config.store.base_url());

    info!("Checking InfluxDB at {}", url);
    let response = config
        .client
        .get(&url)
        .send()
        .await
        .expect("Failed to connect to InfluxDB - is it running?");

    assert!(
        response.status().is_success(),
        "InfluxDB ping failed: {}",
        response.status()
    );
}

#[tokio::test]
#[ignore] // Run with --ignored flag, requires InfluxDB 0.8
async fn test_bad_port_is_store_unavailable() {
    let config = E2ETestConfig::new();
    let context = tits_core::StoreContext::connect(
        config.store.clone().with_address(config.store.host.clone(), 1),
    )
    .expect("Config is valid");

    let error = tits_core::multi_current_measurements(&context, None)
        .await
        .expect_err("Nothing listens on port 1");
    assert!(error.is_retriable(), "Unexpected error: {}", error);
}
