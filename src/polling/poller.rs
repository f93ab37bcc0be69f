use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::polling::types::Snapshot;
use crate::store::store_trait::TelemetryStore;

/// Pulls a fresh snapshot from the store on a fixed schedule.
///
/// Runs only while an operator is signed in: the controller starts it on
/// authentication and stops it on sign-out. Each tick issues the three
/// sub-fetches concurrently and applies whatever succeeded; a failed
/// sub-fetch leaves that slice of the snapshot stale rather than clearing
/// it. `stop` is idempotent and prevents any further fetch; results of a
/// fetch already in flight at stop time are discarded.
pub struct SnapshotPoller {
    store: Arc<dyn TelemetryStore>,
    interval: Duration,
    alert_window: usize,
    snapshot_tx: watch::Sender<Snapshot>,
    refresh: Arc<Notify>,
    shutdown_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

impl SnapshotPoller {
    pub fn new(store: Arc<dyn TelemetryStore>, interval: Duration, alert_window: usize) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        Self {
            store,
            interval,
            alert_window,
            snapshot_tx,
            refresh: Arc::new(Notify::new()),
            shutdown_tx: None,
            task: None,
        }
    }

    /// Subscribe to published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Handle for requesting an out-of-schedule fetch, e.g. after a
    /// config save. Valid across stop/start cycles.
    pub fn refresh_handle(&self) -> Arc<Notify> {
        self.refresh.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Start polling for `owner`: one immediate fetch, then one per
    /// interval. No-op if already running.
    pub fn start(&mut self, owner: Uuid) {
        if self.task.is_some() {
            return;
        }
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);

        let store = self.store.clone();
        let interval = self.interval;
        let alert_window = self.alert_window;
        let snapshot_tx = self.snapshot_tx.clone();
        let refresh = self.refresh.clone();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => break,
                    _ = refresh.notified() => debug!("manual refresh requested"),
                    _ = ticker.tick() => {}
                }

                let (metrics, alerts, config) = tokio::join!(
                    store.latest_metrics(),
                    store.recent_alerts(alert_window),
                    store.load_config(owner),
                );

                // stop() may have raced the fetch; late results are dropped.
                if *shutdown_rx.borrow() {
                    break;
                }

                snapshot_tx.send_modify(|snap| {
                    match metrics {
                        Ok(Some(m)) => snap.metrics = Some(m),
                        Ok(None) => {}
                        Err(e) => warn!("metrics fetch failed: {}", e),
                    }
                    match alerts {
                        Ok(list) => snap.alerts = list,
                        Err(e) => warn!("alerts fetch failed: {}", e),
                    }
                    match config {
                        Ok(Some(c)) => snap.config = Some(c),
                        Ok(None) => {}
                        Err(e) => warn!("config fetch failed: {}", e),
                    }
                    snap.loading = false;
                    snap.refreshed_at = Some(Utc::now());
                });
            }
        }));
    }

    /// Stop polling. Idempotent; no further fetch is issued afterwards.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        self.task.take();
    }

    /// Reset the published snapshot to its initial empty state. Used on
    /// sign-out so the next operator never sees the previous data.
    pub fn clear(&self) {
        let _ = self.snapshot_tx.send(Snapshot::default());
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
