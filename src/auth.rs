//! Authentication subsystem
//!
//! Components:
//! - `types`: session and identity types shared with the rest of the app.
//! - `provider`: the AuthProvider trait, the seam to the credential backend.
//! - `database_provider`: SQLite-backed provider with Argon2id hashes.
//! - `session_gate`: tracks the provider's session state for the dashboard.

pub mod database_provider;
pub mod provider;
pub mod session_gate;
pub mod types;

pub use provider::AuthProvider;
pub use session_gate::SessionGate;
