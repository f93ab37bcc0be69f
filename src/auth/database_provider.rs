use std::path::Path;
use std::str::FromStr;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::Utc;
use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use tokio::sync::watch;
use uuid::Uuid;

use crate::auth::provider::AuthProvider;
use crate::auth::types::{Session, UserIdentity};
use crate::error_handling::types::AuthError;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
}

/// SQLite-backed credential store for a single-operator deployment.
///
/// Accounts live in a `users` table with Argon2id password hashes; the
/// issued session is an opaque token held in memory and broadcast through
/// a watch channel. A process restart therefore signs the operator out.
pub struct DatabaseAuthProvider {
    pool: Pool<Sqlite>,
    session_tx: watch::Sender<Option<Session>>,
}

impl DatabaseAuthProvider {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuthError> {
        let opts = SqliteConnectOptions::from_str("sqlite://")
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
        Self::from_pool(pool).await
    }

    /// Wrap an already-connected pool, typically shared with the store.
    pub async fn from_pool(pool: Pool<Sqlite>) -> Result<Self, AuthError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .execute(&pool)
        .await
        .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
        let (session_tx, _) = watch::channel(None);
        Ok(Self { pool, session_tx })
    }

    fn establish_session(&self, user: UserIdentity) {
        info!("session established for {}", user.email);
        let session = Session {
            token: Uuid::new_v4().to_string(),
            user,
        };
        let _ = self.session_tx.send(Some(session));
    }

    async fn find_user(&self, email: &str) -> Result<Option<UserRow>, AuthError> {
        sqlx::query_as("SELECT id, email, password_hash FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::HashingFailed(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|e| AuthError::HashingFailed(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::HashingFailed(e.to_string())),
    }
}

#[async_trait]
impl AuthProvider for DatabaseAuthProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session_tx.borrow().clone())
    }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let row = match self.find_user(&email).await? {
            Some(row) => row,
            None => return Err(AuthError::InvalidCredentials),
        };
        if !verify_password(password, &row.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
        self.establish_session(UserIdentity {
            id,
            email: row.email,
        });
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        if self.find_user(&email).await?.is_some() {
            return Err(AuthError::EmailTaken(email));
        }
        let id = Uuid::new_v4();
        let hash = hash_password(password)?;
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id.to_string())
        .bind(&email)
        .bind(&hash)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::ProviderUnavailable(e.to_string()))?;
        self.establish_session(UserIdentity { id, email });
        Ok(())
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        info!("session closed");
        let _ = self.session_tx.send(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_provider() -> DatabaseAuthProvider {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.sqlite3");
        Box::leak(Box::new(dir));
        DatabaseAuthProvider::open(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_establishes_session() {
        let provider = temp_provider().await;
        assert!(provider.current_session().await.unwrap().is_none());

        provider
            .sign_up("Operator@Example.com", "hunter2hunter2")
            .await
            .unwrap();
        let session = provider.current_session().await.unwrap().unwrap();
        assert_eq!(session.user.email, "operator@example.com");
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_credentials() {
        let provider = temp_provider().await;
        provider
            .sign_up("operator@example.com", "correct-password")
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        let wrong = provider
            .sign_in("operator@example.com", "wrong-password")
            .await;
        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(provider.current_session().await.unwrap().is_none());

        let unknown = provider.sign_in("nobody@example.com", "whatever").await;
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email_rejected() {
        let provider = temp_provider().await;
        provider
            .sign_up("operator@example.com", "first-password")
            .await
            .unwrap();
        let dup = provider.sign_up("operator@example.com", "other").await;
        assert!(matches!(dup, Err(AuthError::EmailTaken(_))));
    }

    #[tokio::test]
    async fn test_subscription_sees_sign_in_and_out() {
        let provider = temp_provider().await;
        let mut events = provider.subscribe();

        provider
            .sign_up("operator@example.com", "hunter2hunter2")
            .await
            .unwrap();
        events.changed().await.unwrap();
        assert!(events.borrow_and_update().is_some());

        provider.sign_out().await.unwrap();
        events.changed().await.unwrap();
        assert!(events.borrow_and_update().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_survives_restart_of_session_state() {
        let provider = temp_provider().await;
        provider
            .sign_up("operator@example.com", "hunter2hunter2")
            .await
            .unwrap();
        provider.sign_out().await.unwrap();

        provider
            .sign_in("operator@example.com", "hunter2hunter2")
            .await
            .unwrap();
        let session = provider.current_session().await.unwrap().unwrap();
        assert_eq!(session.user.email, "operator@example.com");
    }
}
