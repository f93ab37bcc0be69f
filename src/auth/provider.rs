//! AuthProvider Trait
//!
//! The interface the dashboard needs from its credential backend. Session
//! changes are delivered through a watch subscription rather than from the
//! sign-in/sign-up return values: a successful call updates every
//! subscriber asynchronously, exactly like an externally-expired session
//! does.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::auth::types::Session;
use crate::error_handling::types::AuthError;

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The session as the provider currently knows it, if any.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to session changes. Dropping the receiver releases the
    /// subscription.
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;

    /// Authenticate. On success the new session arrives via `subscribe`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// Create an account and authenticate it.
    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError>;

    /// End the current session; subscribers observe `None`.
    async fn sign_out(&self) -> Result<(), AuthError>;
}
