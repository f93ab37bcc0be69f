use serde::Serialize;
use uuid::Uuid;

/// The signed-in account, as much of it as the dashboard needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
}

/// An authenticated session issued by the provider.
///
/// Owned by the provider; everything else treats it as read-only and
/// re-reads it at use time rather than caching it across await points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserIdentity,
}

/// What the session gate knows right now.
///
/// `resolved` stays false until the initial session fetch completes, so
/// the view can distinguish "still checking" from "signed out".
#[derive(Debug, Clone, Default)]
pub struct GateState {
    pub resolved: bool,
    pub session: Option<Session>,
}

impl GateState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.session.as_ref().map(|s| &s.user)
    }
}
