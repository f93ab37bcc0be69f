//! In-memory telemetry store.
//!
//! Backs the test suites: counts fetches and can inject failures, which
//! the polling and editor tests rely on.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error_handling::types::StoreError;
use crate::store::store_trait::TelemetryStore;
use crate::store::types::{Alert, ConfigRecord, MetricsSnapshot};

#[derive(Default)]
pub struct MemoryStore {
    metrics: Mutex<Vec<MetricsSnapshot>>,
    alerts: Mutex<Vec<Alert>>,
    configs: Mutex<Vec<(Uuid, ConfigRecord)>>,

    pub metrics_fetches: AtomicUsize,
    pub alert_fetches: AtomicUsize,
    pub config_fetches: AtomicUsize,
    pub config_inserts: AtomicUsize,
    pub config_updates: AtomicUsize,

    pub fail_metrics: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_metrics(&self, snapshot: MetricsSnapshot) {
        self.metrics.lock().unwrap().push(snapshot);
    }

    pub fn push_alert(&self, alert: Alert) {
        self.alerts.lock().unwrap().push(alert);
    }

    /// Total fetches across the three read operations.
    pub fn total_fetches(&self) -> usize {
        self.metrics_fetches.load(Ordering::SeqCst)
            + self.alert_fetches.load(Ordering::SeqCst)
            + self.config_fetches.load(Ordering::SeqCst)
    }

    pub fn stored_config(&self, owner: Uuid) -> Option<ConfigRecord> {
        self.configs
            .lock()
            .unwrap()
            .iter()
            .find(|(o, _)| *o == owner)
            .map(|(_, r)| r.clone())
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn latest_metrics(&self) -> Result<Option<MetricsSnapshot>, StoreError> {
        self.metrics_fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_metrics.load(Ordering::SeqCst) {
            return Err(StoreError::ReadFailed(String::from("injected failure")));
        }
        let metrics = self.metrics.lock().unwrap();
        Ok(metrics
            .iter()
            .max_by_key(|m| m.timestamp)
            .cloned())
    }

    async fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        self.alert_fetches.fetch_add(1, Ordering::SeqCst);
        let mut alerts = self.alerts.lock().unwrap().clone();
        alerts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        alerts.truncate(limit);
        Ok(alerts)
    }

    async fn load_config(&self, owner: Uuid) -> Result<Option<ConfigRecord>, StoreError> {
        self.config_fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.stored_config(owner))
    }

    async fn insert_config(
        &self,
        record: &ConfigRecord,
        owner: Uuid,
    ) -> Result<ConfigRecord, StoreError> {
        self.config_inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(String::from("injected failure")));
        }
        let stored = ConfigRecord {
            id: Some(Uuid::new_v4()),
            ..record.clone()
        };
        self.configs.lock().unwrap().push((owner, stored.clone()));
        Ok(stored)
    }

    async fn update_config(&self, id: Uuid, record: &ConfigRecord) -> Result<(), StoreError> {
        self.config_updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(String::from("injected failure")));
        }
        let mut configs = self.configs.lock().unwrap();
        match configs.iter_mut().find(|(_, r)| r.id == Some(id)) {
            Some((_, stored)) => {
                *stored = ConfigRecord {
                    id: Some(id),
                    ..record.clone()
                };
                Ok(())
            }
            None => Err(StoreError::WriteFailed(format!(
                "no configuration record with id {}",
                id
            ))),
        }
    }
}
