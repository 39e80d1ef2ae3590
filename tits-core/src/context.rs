//! Store connection context
//!
//! [`StoreContext`] is the one piece of shared state of the series layer. It
//! owns the store client, the registered write observer and the round-trip
//! statistics, and is handed to every repository and query component.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::datastore::influx::InfluxStore;
use crate::datastore::{BoxedSeriesStore, PointWrite, QueryResponse, SeriesStore};
use crate::error::{TitsError, TitsResult};
use crate::measurement::MeasurementDto;
use crate::notify::WriteObserver;
use crate::query::SeriesQuery;
use crate::series::{ResourceId, SeriesName};

/// Round-trip counters of a context
#[derive(Debug, Default)]
pub struct StoreStats {
    queries: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    failures: AtomicU64,
    notifications: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatsSnapshot {
    pub queries: u64,
    pub writes: u64,
    pub deletes: u64,
    pub failures: u64,
    pub notifications: u64,
}

impl StoreStats {
    fn record<T>(&self, counter: &AtomicU64, result: &TitsResult<T>) {
        counter.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}

/// Shared connection context for the series layer
pub struct StoreContext {
    store: BoxedSeriesStore,
    observer: RwLock<Option<Arc<dyn WriteObserver>>>,
    stats: StoreStats,
    closed: AtomicBool,
}

impl StoreContext {
    /// Wrap an already constructed store
    pub fn new(store: BoxedSeriesStore) -> Self {
        info!("Store context initialized");
        Self {
            store,
            observer: RwLock::new(None),
            stats: StoreStats::default(),
            closed: AtomicBool::new(false),
        }
    }

    /// Validate `config` and connect to the InfluxDB store it names
    pub fn connect(config: StoreConfig) -> TitsResult<Self> {
        let store = InfluxStore::new(config)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Connect with configuration taken from the environment
    pub fn from_env() -> TitsResult<Self> {
        Self::connect(StoreConfig::load()?)
    }

    /// Register the write observer, replacing any earlier one
    pub fn register_observer<O>(&self, observer: O)
    where
        O: WriteObserver + 'static,
    {
        let previous = self.observer.write().replace(Arc::new(observer));
        if previous.is_some() {
            debug!("Replaced previously registered write observer");
        }
    }

    /// Remove the write observer, if any
    pub fn clear_observer(&self) {
        self.observer.write().take();
    }

    pub fn has_observer(&self) -> bool {
        self.observer.read().is_some()
    }

    /// Tear the context down. Every later operation fails.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.clear_observer();
            let stats = self.stats();
            info!(
                "Store context shut down after {} queries, {} writes, {} failures",
                stats.queries, stats.writes, stats.failures
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn store(&self) -> &dyn SeriesStore {
        self.store.as_ref()
    }

    fn ensure_open(&self) -> TitsResult<()> {
        if self.is_closed() {
            return Err(TitsError::store_unavailable("Store context has been shut down"));
        }
        Ok(())
    }

    /// Run one query against the store
    pub async fn query(&self, query: &SeriesQuery) -> TitsResult<QueryResponse> {
        self.ensure_open()?;
        debug!("Store query: {}", query);

        let result = self.store.query(query).await;
        self.stats.record(&self.stats.queries, &result);
        result
    }

    /// Write one point to the store
    pub async fn write_point(&self, series: &SeriesName, point: PointWrite) -> TitsResult<()> {
        self.ensure_open()?;

        let result = self.store.write_point(series, point).await;
        self.stats.record(&self.stats.writes, &result);
        result
    }

    /// Hand a freshly written measurement to the observer, if one is registered
    pub fn notify(&self, measurement: &MeasurementDto) -> TitsResult<()> {
        let observer = self.observer.read().clone();
        let Some(observer) = observer else {
            return Ok(());
        };

        self.stats.notifications.fetch_add(1, Ordering::Relaxed);
        observer.on_write(measurement).map_err(|e| {
            error!(
                "Write observer failed for resource {}: {}",
                measurement.resource_id, e
            );
            match e {
                TitsError::Notification(_) => e,
                other => TitsError::notification(other.to_string()),
            }
        })
    }

    /// Delete every point of a resource's series
    pub async fn delete_series(&self, resource_id: &ResourceId) -> TitsResult<()> {
        self.ensure_open()?;
        let series = resource_id.series_name();
        info!("Deleting series {}", series);

        let result = self.store.delete_series(&series).await;
        self.stats.record(&self.stats.deletes, &result);
        result
    }

    /// Delete the whole database
    pub async fn drop_database(&self) -> TitsResult<()> {
        self.ensure_open()?;
        info!("Dropping the whole database");

        let result = self.store.drop_database().await;
        self.stats.record(&self.stats.deletes, &result);
        result
    }
}

impl std::fmt::Debug for StoreContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreContext")
            .field("has_observer", &self.has_observer())
            .field("closed", &self.is_closed())
            .field("stats", &self.stats())
            .finish()
    }
}
