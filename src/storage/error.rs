use thiserror::Error;

/// Errors raised by the table catalog collaborator or the persistence sink
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    TableNotFound(String),

    #[error("{0}")]
    AccessDenied(String),

    /// Any other failure reported by the catalog, carried verbatim
    #[error("{0}")]
    Collaborator(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
