use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadAddress(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadAddress(e) => write!(f, "Bind address error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Errors surfaced by the authentication provider.
///
/// These are user-visible: `Display` output is shown on the sign-in form
/// as-is, so every variant carries a human-readable message. None of them
/// is fatal; the session is simply left unauthenticated.
#[derive(Debug)]
pub enum AuthError {
    InvalidCredentials,
    EmailTaken(String),
    SessionExpired,
    HashingFailed(String),
    ProviderUnavailable(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::EmailTaken(email) => {
                write!(f, "An account already exists for {}", email)
            }
            AuthError::SessionExpired => write!(f, "Session expired, please sign in again"),
            AuthError::HashingFailed(e) => write!(f, "Credential processing failed: {}", e),
            AuthError::ProviderUnavailable(e) => {
                write!(f, "Authentication service unavailable: {}", e)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Errors from the telemetry store.
///
/// A read failure during a poll tick is logged and swallowed (the displayed
/// data stays stale); a write failure during a config save is surfaced to
/// the operator with the carried message.
#[derive(Debug)]
pub enum StoreError {
    ConnectionFailed(String),
    ReadFailed(String),
    WriteFailed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(e) => write!(f, "Store connection failed: {}", e),
            StoreError::ReadFailed(e) => write!(f, "Store read failed: {}", e),
            StoreError::WriteFailed(e) => write!(f, "Store write failed: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Rejected threshold edits. The draft keeps its previous value.
#[derive(Debug, PartialEq)]
pub enum EditError {
    UnknownField(String),
    InvalidNumber { field: &'static str, raw: String },
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::UnknownField(name) => write!(f, "Unknown configuration field: {}", name),
            EditError::InvalidNumber { field, raw } => {
                write!(f, "{} must be a whole number, got \"{}\"", field, raw)
            }
        }
    }
}

impl std::error::Error for EditError {}

#[derive(Debug)]
pub enum WebError {
    StartupFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::StartupFailed(e) => write!(f, "Web server startup failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}
