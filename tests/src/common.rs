//! Common utilities for E2E tests

use chrono::Utc;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tits_core::{MeasurementRepository, ResourceId, StoreConfig, StoreContext};

/// Database used when `TITS_INFLUX_DATABASE` is not set
pub const TEST_DATABASE: &str = "tits_test";

/// Test configuration and utilities
pub struct E2ETestConfig {
    pub client: Client,
    pub store: StoreConfig,
    pub context: Arc<StoreContext>,
    pub test_resource_prefix: String,
}

impl E2ETestConfig {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        let mut store = StoreConfig::load().expect("Invalid TITS_INFLUX_* environment");
        if std::env::var("TITS_INFLUX_DATABASE").is_err() {
            store = store.with_database(TEST_DATABASE);
        }

        let context = Arc::new(
            StoreContext::connect(store.clone()).expect("Failed to create store context"),
        );

        // Use timestamp to keep series of different runs apart
        let test_resource_prefix = format!("e2e{}", Utc::now().timestamp_millis());

        Self {
            client,
            store,
            context,
            test_resource_prefix,
        }
    }

    pub fn test_resource_id(&self, suffix: &str) -> ResourceId {
        ResourceId::new(format!("{}_{}", self.test_resource_prefix, suffix))
            .expect("Test resource ids are valid")
    }

    /// Repository for a fresh resource of this run
    pub fn repository(&self, suffix: &str) -> MeasurementRepository {
        MeasurementRepository::new(self.context.clone(), self.test_resource_id(suffix))
    }
}

impl Default for E2ETestConfig {
    fn default() -> Self {
        Self::new()
    }
}
