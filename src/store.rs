//! Telemetry store subsystem
//!
//! This module provides the abstraction and implementations for reading
//! telemetry rows (metrics, alerts) and persisting detection configuration.
//!
//! Components:
//! - `store_trait`: the TelemetryStore trait defining a uniform API.
//! - `types`: shared data types used by store backends.
//! - `database_store`: SQLite implementation using sqlx.
//! - `memory_store`: in-memory implementation backing the test suites.

pub mod database_store;
pub mod memory_store;
pub mod store_trait;
pub mod types;

pub use store_trait::TelemetryStore;
