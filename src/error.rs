//! Error types for stockroom

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file not found. Run 'stockroom init' first.")]
    ConfigNotFound,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an authentication-failure status. The client's
    /// unauthorized hook has already run by the time callers see this.
    #[error("Not authorized. Sign in again.")]
    Unauthorized,

    /// Any other non-success status, passed through for caller-specific
    /// messaging.
    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Login response contained no usable token")]
    InvalidCredentialResponse,

    #[error("Token is not a decodable three-segment token")]
    MalformedToken,

    #[error("Token role is '{actual}' but '{expected}' was expected")]
    RoleMismatch { expected: String, actual: String },

    #[error("Sign-in aborted: signed out while the request was in flight")]
    SignInAborted,

    #[error("No usable credential storage: {0}")]
    StorageUnavailable(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
