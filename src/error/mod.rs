//! Error types for registry access and for the inspect command

pub mod handlers;
pub mod inspect;

pub use inspect::{ErrorKind, InspectError};

use std::fmt;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Network related errors
    Network(String),
    /// Registry responded with an unexpected status
    Registry(String),
    /// Authentication errors
    Auth(String),
    /// Malformed references, manifests or configs
    Parse(String),
    /// Validation errors
    Validation(String),
    /// Manifest, blob or repository not found
    NotFound(String),
    /// File IO errors
    Io(String),
    /// Downloaded content does not match its digest
    DigestMismatch { expected: String, actual: String },
    /// Manifest type or feature the transport does not handle
    Unsupported(String),
    /// The context deadline passed before the operation finished
    DeadlineExceeded(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::Network(msg) => write!(f, "Network error: {}", msg),
            RegistryError::Registry(msg) => write!(f, "Registry error: {}", msg),
            RegistryError::Auth(msg) => write!(f, "Authentication error: {}", msg),
            RegistryError::Parse(msg) => write!(f, "Parse error: {}", msg),
            RegistryError::Validation(msg) => write!(f, "Validation error: {}", msg),
            RegistryError::NotFound(msg) => write!(f, "Not found: {}", msg),
            RegistryError::Io(msg) => write!(f, "IO error: {}", msg),
            RegistryError::DigestMismatch { expected, actual } => write!(
                f,
                "Digest mismatch: expected {}, computed {}",
                expected, actual
            ),
            RegistryError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            RegistryError::DeadlineExceeded(operation) => {
                write!(f, "Deadline exceeded during {}", operation)
            }
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        RegistryError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Network(err.to_string())
    }
}

impl From<url::ParseError> for RegistryError {
    fn from(err: url::ParseError) -> Self {
        RegistryError::Validation(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for RegistryError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        RegistryError::Parse(format!("UTF-8 conversion error: {}", err))
    }
}
