//! Error types for keycheck.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Remote service errors
    #[error("API error ({status}): {title}")]
    Api {
        status: u16,
        title: String,
        detail: Option<String>,
        code: Option<String>,
    },

    #[error("Validation returned no license to activate against")]
    MissingLicense,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Secret not found: {0}")]
    SecretNotFound(String),

    // Infrastructure errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// HTTP status of a remote API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Machine-readable error code of a remote API error, if the service sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
