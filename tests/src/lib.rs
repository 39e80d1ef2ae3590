//! End-to-End Integration Tests for TITS
//!
//! These tests drive the series layer against a live InfluxDB 0.8 server:
//! - InfluxDB reachability (health module)
//! - write, nearest, range, extremum and snapshot round-trips (influx_flow module)
//!
//! They require InfluxDB 0.8 on `TITS_INFLUX_HOST:TITS_INFLUX_PORT`
//! (default localhost:8086) with the test database already created.

pub mod common;
pub mod health;
pub mod influx_flow;
