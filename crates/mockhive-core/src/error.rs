//! Error types for MockHive Core

/// Result type alias for MockHive operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for MockHive
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input on a create or update
    #[error("Validation error: {message}")]
    Validation {
        /// What was wrong
        message: String,
    },

    /// A named entity does not exist
    #[error("Not found: {message}")]
    NotFound {
        /// What was missing
        message: String,
    },

    /// Upstream forwarding failed
    #[error("Proxy error: {message}")]
    Proxy {
        /// What failed
        message: String,
    },

    /// Snapshot write or read failed
    #[error("Persistence error: {message}")]
    Persistence {
        /// What failed
        message: String,
    },

    /// Filesystem failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Outbound HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed URL
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Anything else
    #[error("Generic error: {0}")]
    Generic(String),
}

impl From<String> for Error {
    fn from(message: String) -> Self {
        Self::Generic(message)
    }
}

impl Error {
    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not-found error
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a proxy error
    pub fn proxy<S: Into<String>>(message: S) -> Self {
        Self::Proxy {
            message: message.into(),
        }
    }

    /// Create a persistence error
    pub fn persistence<S: Into<String>>(message: S) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }
}
