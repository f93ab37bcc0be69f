use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::provider::AuthProvider;
use crate::auth::types::{GateState, UserIdentity};
use crate::error_handling::types::AuthError;

/// Tracks the provider's session state for the rest of the dashboard.
///
/// Until `start` has fetched the initial session, the published state is
/// unresolved and the view shows its loading screen. Afterwards the gate
/// mirrors every provider event: sign-in, sign-out, external expiry.
///
/// `stop` tears the mirror task down and with it the provider
/// subscription, exactly once, so repeated start/stop cycles cannot leak
/// listeners.
pub struct SessionGate {
    provider: Arc<dyn AuthProvider>,
    state_tx: watch::Sender<GateState>,
    task: Mutex<Option<JoinHandle<()>>>,
    shutdown_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl SessionGate {
    pub fn new(provider: Arc<dyn AuthProvider>) -> Self {
        let (state_tx, _) = watch::channel(GateState::default());
        Self {
            provider,
            state_tx,
            task: Mutex::new(None),
            shutdown_tx: Mutex::new(None),
        }
    }

    /// Fetch the initial session and start mirroring provider events.
    ///
    /// Calling `start` on a running gate is a no-op.
    pub fn start(&self) {
        let mut task_slot = self.task.lock().unwrap();
        if task_slot.is_some() {
            return;
        }
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        *self.shutdown_tx.lock().unwrap() = Some(shutdown_tx);

        let provider = self.provider.clone();
        let state_tx = self.state_tx.clone();
        *task_slot = Some(tokio::spawn(async move {
            // Subscribe before the initial fetch so nothing lands between.
            let mut events = provider.subscribe();
            let initial = match provider.current_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!("initial session fetch failed: {}", e);
                    None
                }
            };
            let _ = state_tx.send(GateState {
                resolved: true,
                session: initial,
            });

            loop {
                tokio::select! {
                    changed = events.changed() => {
                        if changed.is_err() {
                            // provider gone, nothing left to mirror
                            break;
                        }
                        let session = events.borrow_and_update().clone();
                        match &session {
                            Some(s) => info!("authenticated as {}", s.user.email),
                            None => info!("unauthenticated"),
                        }
                        let _ = state_tx.send(GateState { resolved: true, session });
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            // `events` drops here: the provider subscription is released.
        }));
    }

    /// Stop mirroring and release the provider subscription. Idempotent.
    pub async fn stop(&self) {
        let shutdown = self.shutdown_tx.lock().unwrap().take();
        if let Some(tx) = shutdown {
            let _ = tx.send(true);
        }
        let task = self.task.lock().unwrap().take();
        if let Some(handle) = task {
            let _ = handle.await;
        }
    }

    /// Subscribe to gate state changes.
    pub fn subscribe(&self) -> watch::Receiver<GateState> {
        self.state_tx.subscribe()
    }

    /// The state as currently published. Read it at use time; a session
    /// held across an await may already be stale.
    pub fn state(&self) -> GateState {
        self.state_tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserIdentity> {
        self.state().session.map(|s| s.user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.provider.sign_in(email, password).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.provider.sign_up(email, password).await
    }

    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.provider.sign_out().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::Session;
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Provider stub whose session state the test scripts directly.
    struct ScriptedProvider {
        session_tx: watch::Sender<Option<Session>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            let (session_tx, _) = watch::channel(None);
            Self { session_tx }
        }

        fn set_session(&self, session: Option<Session>) {
            let _ = self.session_tx.send(session);
        }

        fn sample_session() -> Session {
            Session {
                token: String::from("token"),
                user: UserIdentity {
                    id: Uuid::new_v4(),
                    email: String::from("operator@example.com"),
                },
            }
        }
    }

    #[async_trait]
    impl AuthProvider for ScriptedProvider {
        async fn current_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(self.session_tx.borrow().clone())
        }

        fn subscribe(&self) -> watch::Receiver<Option<Session>> {
            self.session_tx.subscribe()
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
            self.set_session(Some(Self::sample_session()));
            Ok(())
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
            self.set_session(Some(Self::sample_session()));
            Ok(())
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            self.set_session(None);
            Ok(())
        }
    }

    async fn wait_for<F: Fn(&GateState) -> bool>(
        rx: &mut watch::Receiver<GateState>,
        pred: F,
    ) -> GateState {
        loop {
            {
                let state = rx.borrow_and_update();
                if pred(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_resolves_to_unauthenticated() {
        let provider = Arc::new(ScriptedProvider::new());
        let gate = SessionGate::new(provider);
        let mut rx = gate.subscribe();

        assert!(!gate.state().resolved);
        gate.start();

        let state = wait_for(&mut rx, |s| s.resolved).await;
        assert!(!state.is_authenticated());
        gate.stop().await;
    }

    #[tokio::test]
    async fn test_mirrors_sign_in_and_external_sign_out() {
        let provider = Arc::new(ScriptedProvider::new());
        let gate = SessionGate::new(provider.clone());
        let mut rx = gate.subscribe();
        gate.start();

        gate.sign_in("operator@example.com", "pw").await.unwrap();
        let state = wait_for(&mut rx, |s| s.is_authenticated()).await;
        assert_eq!(state.user().unwrap().email, "operator@example.com");

        // Expiry arrives from outside, not through the gate.
        provider.set_session(None);
        let state = wait_for(&mut rx, |s| s.resolved && !s.is_authenticated()).await;
        assert!(state.session.is_none());
        gate.stop().await;
    }

    async fn wait_for_receiver_count(provider: &ScriptedProvider, expected: usize) {
        while provider.session_tx.receiver_count() != expected {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_stop_releases_subscription_exactly_once() {
        let provider = Arc::new(ScriptedProvider::new());
        let baseline = provider.session_tx.receiver_count();

        let gate = SessionGate::new(provider.clone());
        for _ in 0..3 {
            gate.start();
            wait_for_receiver_count(&provider, baseline + 1).await;

            gate.stop().await;
            assert_eq!(provider.session_tx.receiver_count(), baseline);
        }

        // Stopping a stopped gate is a no-op.
        gate.stop().await;
    }
}
