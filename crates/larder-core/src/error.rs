//! Error types for larder-core
//!
//! One enum per collaborator: the session layer, the local store, and the
//! remote document store each keep their own taxonomy, composed into
//! [`SyncError`] at the coordinator boundary.

use thiserror::Error;

/// Errors from the authentication/session layer
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No user is logged in; sync never runs anonymously
    #[error("no authenticated session")]
    NotLoggedIn,
}

/// Result type alias for local store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors from the local persistence layer
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for remote store operations
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Errors from the remote document store
///
/// Payloads are plain strings so the type stays cloneable; test doubles
/// inject prepared values to exercise partial-failure paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Record not found (an expected probe miss, not logged as an error)
    #[error("record not found")]
    NotFound,

    /// Create hit an id the collection already has
    #[error("record already exists")]
    Conflict,

    /// The user may not touch this collection
    #[error("not authorized for this collection")]
    Unauthorized,

    /// Transient connectivity failure
    #[error("no connection to remote store")]
    NoConnection,

    /// Remote storage quota exhausted
    #[error("remote quota exceeded")]
    QuotaExceeded,

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration
    #[error("Invalid remote configuration: {0}")]
    InvalidConfiguration(String),

    /// Remote API rejected the request
    #[error("Remote API error: {message} ({status})")]
    Api {
        /// HTTP status code
        status: u16,
        /// Parsed error message
        message: String,
    },

    /// Anything else the transport reported
    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::NoConnection
        } else if error.is_decode() {
            Self::Serialization(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Result type alias for coordinator operations
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by the sync coordinator
#[derive(Error, Debug)]
pub enum SyncError {
    /// No authenticated session
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Local store failure
    #[error("Local store error: {0}")]
    Local(#[from] StoreError),

    /// Remote store failure (pull phase only; background write failures are
    /// logged, never surfaced)
    #[error("Remote store error: {0}")]
    Remote(#[from] RemoteError),
}
