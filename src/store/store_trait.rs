//! TelemetryStore Trait
//!
//! This module defines the `TelemetryStore` trait, the interface the
//! dashboard core uses to reach the persistent store.
//!
//! Implementors of this trait are responsible for:
//! - Serving the newest metrics row and the most recent alerts
//! - Loading the owner's detection configuration
//! - Creating and updating configuration records
//!
//! Metrics and alerts are read-only through this interface: the rows are
//! produced by the external capture pipeline. All methods return a
//! `Result` to handle potential store errors.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::store::types::{Alert, ConfigRecord, MetricsSnapshot};

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Retrieves the newest metrics row (timestamp descending, limit 1).
    async fn latest_metrics(&self) -> Result<Option<MetricsSnapshot>, StoreError>;

    /// Retrieves the most recent alerts, newest first.
    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError>;

    /// Loads the configuration record owned by `owner`, if one exists.
    async fn load_config(&self, owner: Uuid) -> Result<Option<ConfigRecord>, StoreError>;

    /// Inserts a new configuration record tagged with `owner`.
    ///
    /// Returns the stored record with its generated id.
    async fn insert_config(
        &self,
        record: &ConfigRecord,
        owner: Uuid,
    ) -> Result<ConfigRecord, StoreError>;

    /// Updates the configuration record with the given id in place.
    async fn update_config(&self, id: Uuid, record: &ConfigRecord) -> Result<(), StoreError>;
}
