use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::sync::{watch, Mutex};

use crate::auth::provider::AuthProvider;
use crate::auth::session_gate::SessionGate;
use crate::auth::types::GateState;
use crate::config_editor::editor::ConfigEditor;
use crate::polling::poller::SnapshotPoller;
use crate::polling::types::Snapshot;
use crate::store::store_trait::TelemetryStore;

/// Wires the session gate, the poller and the config editor together.
///
/// The gate is the single source of truth: polling runs exactly while a
/// session exists. On sign-out the published snapshot and the editor are
/// cleared so the next operator starts from a blank dashboard. Each
/// fetched config record is forwarded into the editor for draft
/// reconciliation.
pub struct DashboardController {
    gate: Arc<SessionGate>,
    poller: SnapshotPoller,
    editor: Arc<Mutex<ConfigEditor>>,
    shutdown_tx: watch::Sender<bool>,
}

impl DashboardController {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        store: Arc<dyn TelemetryStore>,
        poll_interval: Duration,
        alert_window: usize,
    ) -> Self {
        let gate = Arc::new(SessionGate::new(provider));
        let poller = SnapshotPoller::new(store.clone(), poll_interval, alert_window);
        let editor = Arc::new(Mutex::new(ConfigEditor::new(
            store,
            poller.refresh_handle(),
        )));
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            gate,
            poller,
            editor,
            shutdown_tx,
        }
    }

    pub fn gate(&self) -> Arc<SessionGate> {
        self.gate.clone()
    }

    pub fn editor(&self) -> Arc<Mutex<ConfigEditor>> {
        self.editor.clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<Snapshot> {
        self.poller.subscribe()
    }

    /// Handle that ends `run` when sent `true`.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// The event loop. Returns after a shutdown signal, with the poller
    /// stopped and the gate's provider subscription released.
    pub async fn run(&mut self) {
        self.gate.start();
        let mut gate_rx = self.gate.subscribe();
        let mut snapshot_rx = self.poller.subscribe();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        // The gate may have resolved before this subscription existed.
        let initial = gate_rx.borrow_and_update().clone();
        self.apply_gate_state(initial).await;

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                changed = gate_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = gate_rx.borrow_and_update().clone();
                    self.apply_gate_state(state).await;
                }
                changed = snapshot_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let config = snapshot_rx.borrow_and_update().config.clone();
                    self.editor.lock().await.apply_loaded(config);
                }
            }
        }

        info!("controller shutting down");
        self.poller.stop();
        self.gate.stop().await;
    }

    async fn apply_gate_state(&mut self, state: GateState) {
        match state.session {
            Some(session) => {
                if !self.poller.is_running() {
                    info!("starting snapshot polling for {}", session.user.email);
                    self.poller.start(session.user.id);
                }
            }
            None => {
                if self.poller.is_running() {
                    info!("stopping snapshot polling");
                    self.poller.stop();
                    self.poller.clear();
                    self.editor.lock().await.clear();
                }
            }
        }
    }
}
