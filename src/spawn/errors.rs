use thiserror::Error;

/// Errors that can arise while reading or writing spawn records.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, backup file access, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapper around JSON errors from the backup file.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A stored key or value could not be interpreted.
    #[error("corrupt spawn record: {0}")]
    CorruptRecord(String),
}
