//! # TITS Core Library
//!
//! Measurement storage and retrieval on top of a time-series store, keyed by
//! resource identity.
//!
//! ## Features
//!
//! - **Repository**: per-resource writes and reads (current, nearest, ranges)
//! - **Aggregation**: bucketed means, maximum, minimum and average over a range
//! - **Snapshots**: latest value of many resources in one round-trip
//! - **Stores**: InfluxDB 0.8 over HTTP and an in-memory store for tests
//! - **Notification**: an observer called after every successful write
//!
//! ## Architecture
//!
//! Every operation is a single request/response round-trip through the
//! [`StoreContext`], which owns the store client and the write observer.
//! "No matching rows" is reported as `Ok(None)`, never as an error.

pub mod aggregation;
pub mod config;
pub mod context;
pub mod datastore;
pub mod error;
pub mod extremum;
pub mod measurement;
pub mod notify;
pub mod query;
pub mod repository;
pub mod resolver;
pub mod series;
pub mod snapshot;
pub mod time;

// Re-export commonly used types
pub use config::StoreConfig;
pub use context::{StoreContext, StoreStatsSnapshot};
pub use datastore::{influx::InfluxStore, memory::MemoryStore, SeriesStore};
pub use error::{TitsError, TitsResult};
pub use measurement::{Measurement, MeasurementDto};
pub use notify::WriteObserver;
pub use query::{ExtremumOptions, NearestOptions, RangeOptions};
pub use repository::MeasurementRepository;
pub use series::{ResourceId, SeriesName};
pub use snapshot::{multi_current_measurements, ResourceSelection};
pub use time::{Granularity, TimeRange, Timestamp};

/// Version information for TITS
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum length for resource ids
pub const MAX_RESOURCE_ID_LENGTH: usize = 128;
