//! Error types for the generator

use thiserror::Error;

/// Main error type for the generator
///
/// Generation itself never fails: a walk that cannot produce an expression
/// returns `None`. These errors cover construction, option resolution and
/// file loading.
#[derive(Error, Debug)]
pub enum Error {
    /// The series catalog cannot back selector generation
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A label matcher could not be built
    #[error("Invalid matcher for label '{name}': {reason}")]
    InvalidMatcher {
        /// Label name the matcher applies to
        name: String,
        /// Why the matcher was rejected
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, Error>;
