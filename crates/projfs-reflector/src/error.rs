//! Error types and the callback status taxonomy.

use thiserror::Error;
use uuid::Uuid;

/// Result codes handed back to the engine from a callback.
///
/// This is a closed set: every failure inside the provider is mapped onto
/// one of these before it crosses the callback boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Operation succeeded.
    Ok,
    /// Path is absent in the layer.
    NotFound,
    /// The sink rejected the first entry of an enumeration round.
    InsufficientBuffer,
    /// Unexpected or invariant-violating condition.
    InternalError,
    /// Operation vetoed by policy.
    AccessDenied,
    /// Buffer allocation failed.
    OutOfMemory,
    /// Requested feature is not available.
    NotSupported,
}

impl Status {
    /// Check if this status reports success.
    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

/// Errors that can occur inside the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Path not present in the layer.
    #[error("Path not found in layer: {path}")]
    NotFound {
        /// The relative path that was looked up.
        path: String,
    },

    /// Enumeration session id was never started or already ended.
    #[error("Unknown enumeration session: {0}")]
    UnknownSession(Uuid),

    /// Enumeration session id was started twice.
    #[error("Enumeration session already exists: {0}")]
    DuplicateSession(Uuid),

    /// Layer returned fewer bytes than requested.
    #[error("Short read from {path} at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Relative path of the file being hydrated.
        path: String,
        /// Offset of the read.
        offset: u64,
        /// Bytes requested.
        expected: usize,
        /// Bytes returned.
        actual: usize,
    },

    /// IO error while accessing the layer or the virtualization root.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path where the error occurred.
        path: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Native engine call failed.
    #[error("Engine call {operation} failed: HRESULT 0x{code:08X}")]
    Engine {
        /// Engine primitive that failed.
        operation: &'static str,
        /// Raw result code.
        code: i32,
    },

    /// Buffer allocation failed.
    #[error("Failed to allocate {size} byte buffer")]
    OutOfMemory {
        /// Requested size.
        size: usize,
    },

    /// Feature not available on this platform or backing store.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Command was cancelled by the engine.
    #[error("Command {0} cancelled")]
    Cancelled(i32),

    /// Layer or virtualization root path is unusable.
    #[error("Invalid root path: {0}")]
    InvalidRootPath(String),

    /// Virtualization already started.
    #[error("Virtualization already started")]
    AlreadyStarted,

    /// Virtualization not started.
    #[error("Virtualization not started")]
    NotStarted,

    /// Path conversion error (UTF-16 <-> UTF-8).
    #[error("Path conversion error: {0}")]
    PathConversion(String),

    /// Invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Create an IoError from std::io::Error.
    ///
    /// # Arguments
    /// * `path` - Path where the error occurred
    /// * `source` - The underlying IO error
    pub fn io_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a NotFound error for a relative path.
    ///
    /// # Arguments
    /// * `path` - Relative path that is missing
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Map this error onto the callback status taxonomy.
    pub fn status(&self) -> Status {
        match self {
            ProviderError::NotFound { .. } => Status::NotFound,
            ProviderError::Io { source, .. } => match source.kind() {
                std::io::ErrorKind::NotFound => Status::NotFound,
                std::io::ErrorKind::OutOfMemory => Status::OutOfMemory,
                std::io::ErrorKind::Unsupported => Status::NotSupported,
                _ => Status::InternalError,
            },
            ProviderError::OutOfMemory { .. } => Status::OutOfMemory,
            ProviderError::NotSupported(_) => Status::NotSupported,
            _ => Status::InternalError,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ProviderError::not_found("a.txt").status(), Status::NotFound);
        assert_eq!(
            ProviderError::UnknownSession(Uuid::nil()).status(),
            Status::InternalError
        );
        assert_eq!(
            ProviderError::OutOfMemory { size: 1 }.status(),
            Status::OutOfMemory
        );
        assert_eq!(
            ProviderError::NotSupported("symlinks".to_string()).status(),
            Status::NotSupported
        );
        assert_eq!(ProviderError::Cancelled(7).status(), Status::InternalError);
    }

    #[test]
    fn test_io_error_mapping() {
        let missing = ProviderError::io_error(
            "dir\\file",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(missing.status(), Status::NotFound);

        let denied = ProviderError::io_error(
            "dir\\file",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no"),
        );
        assert_eq!(denied.status(), Status::InternalError);
    }

    #[test]
    fn test_short_read_display() {
        let err = ProviderError::ShortRead {
            path: "a.bin".to_string(),
            offset: 0,
            expected: 10,
            actual: 3,
        };
        assert!(err.to_string().contains("expected 10 bytes, got 3"));
        assert_eq!(err.status(), Status::InternalError);
    }
}
