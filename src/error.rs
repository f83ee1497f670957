use std::fmt;

/// Failure reported by a [`StorageBackend`](crate::StorageBackend).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The medium has no room left for the value.
    QuotaExceeded(String),
    /// The medium is absent or refused access.
    Unavailable(String),
    Io(String),
    LockPoisoned(&'static str),
    Serialization(String),
}

impl StorageError {
    /// Whether a retry with a smaller payload could succeed.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StorageError::QuotaExceeded(_))
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::QuotaExceeded(message) => {
                write!(f, "storage quota exceeded: {}", message)
            }
            StorageError::Unavailable(message) => write!(f, "storage unavailable: {}", message),
            StorageError::Io(message) => write!(f, "storage io error: {}", message),
            StorageError::LockPoisoned(operation) => {
                write!(f, "storage lock poisoned during {}", operation)
            }
            StorageError::Serialization(message) => {
                write!(f, "record serialization failed: {}", message)
            }
        }
    }
}

impl std::error::Error for StorageError {}

/// Why a share code could not be turned back into progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Empty,
    /// Neither the compressed nor the plain layer produced a JSON payload.
    Malformed(String),
    UnsupportedVersion(Option<u64>),
    /// The payload parsed but a field has the wrong shape.
    InvalidShape(&'static str),
    /// The packed state bytes are not valid base64.
    PackedData(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "share code is empty"),
            DecodeError::Malformed(message) => write!(f, "malformed share code: {}", message),
            DecodeError::UnsupportedVersion(Some(version)) => {
                write!(f, "unsupported share code version {}", version)
            }
            DecodeError::UnsupportedVersion(None) => write!(f, "share code has no version"),
            DecodeError::InvalidShape(field) => {
                write!(f, "share code field '{}' has an invalid shape", field)
            }
            DecodeError::PackedData(message) => write!(f, "invalid packed data: {}", message),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    Serialization(String),
    Compression(String),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Serialization(message) => {
                write!(f, "payload serialization failed: {}", message)
            }
            EncodeError::Compression(message) => write!(f, "compression failed: {}", message),
        }
    }
}

impl std::error::Error for EncodeError {}
