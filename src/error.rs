//! Error types for linkpost
//!
//! All modules use `FeedResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for linkpost operations
pub type FeedResult<T> = Result<T, FeedError>;

/// All errors that can occur in linkpost
#[derive(Error, Debug)]
pub enum FeedError {
    // Client-side errors, raised before any network call
    #[error("{0}")]
    Validation(String),

    #[error("Not authenticated: {0}")]
    Auth(String),

    // Remote API errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response from {path}: {reason}")]
    Decode { path: String, reason: String },

    // Mutation errors
    #[error("Illegal mutation transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    // Session errors
    #[error("Failed to persist session: {0}")]
    SessionPersist(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl FeedError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an API error from a status code and server message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Rebuild an equivalent error for a second observer of the same failure.
    ///
    /// Coalesced fetches hand one failure to several waiters; variants that
    /// wrap non-cloneable sources degrade to `Internal` with the same text.
    pub fn replicate(&self) -> Self {
        match self {
            Self::Validation(m) => Self::Validation(m.clone()),
            Self::Auth(m) => Self::Auth(m.clone()),
            Self::Network(m) => Self::Network(m.clone()),
            Self::Api { status, message } => Self::Api {
                status: *status,
                message: message.clone(),
            },
            Self::Decode { path, reason } => Self::Decode {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::User(m) => Self::User(m.clone()),
            other => Self::Internal(other.to_string()),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Auth(_) | Self::Api { status: 401, .. } => Some("Run: linkpost login"),
            Self::Network(_) => Some("Check your connection or the api.base_url setting, then retry"),
            Self::ConfigInvalid { .. } => Some("Run: linkpost config path, then fix the file"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = FeedError::api(422, "email already exists");
        assert_eq!(err.to_string(), "API error (422): email already exists");
    }

    #[test]
    fn error_hint() {
        let err = FeedError::Auth("no token stored".to_string());
        assert_eq!(err.hint(), Some("Run: linkpost login"));
        assert_eq!(FeedError::api(401, "invalid token").hint(), Some("Run: linkpost login"));
    }

    #[test]
    fn error_retryable() {
        assert!(FeedError::Network("connection refused".into()).is_retryable());
        assert!(FeedError::api(503, "unavailable").is_retryable());
        assert!(!FeedError::api(400, "bad request").is_retryable());
        assert!(!FeedError::validation("empty").is_retryable());
    }

    #[test]
    fn replicate_keeps_category() {
        let err = FeedError::api(500, "boom").replicate();
        assert!(matches!(err, FeedError::Api { status: 500, .. }));

        let io = FeedError::io("reading", std::io::Error::other("disk"));
        assert!(matches!(io.replicate(), FeedError::Internal(_)));
    }
}
