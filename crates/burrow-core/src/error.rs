//! Error types for engine operations
//!
//! Every failure the engine can surface is an [`EngineError`]. Variants carry
//! enough context (path, offset, sizes) to diagnose a bad WAL file without
//! re-reading it.

use std::path::PathBuf;

use thiserror::Error;

/// Engine error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// I/O operation failed
    #[error("I/O error{}: {message} ({kind})", path_suffix(.path))]
    Io {
        /// The file path where the error occurred
        path: Option<PathBuf>,
        /// The underlying I/O error kind
        kind: std::io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// WAL record is structurally invalid
    #[error("WAL corrupted in {} at offset {offset}: {reason}", .path.display())]
    WalCorrupted {
        path: PathBuf,
        offset: u64,
        reason: String,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch in {} at offset {offset}: expected 0x{expected:08x}, got 0x{actual:08x}", .path.display())]
    ChecksumMismatch {
        path: PathBuf,
        expected: u32,
        actual: u32,
        offset: u64,
    },

    /// Partial record at the end of a file
    #[error("Torn write in {} at offset {offset}: expected {expected_size} bytes, only {available_bytes} available", .path.display())]
    TornWrite {
        path: PathBuf,
        expected_size: u32,
        available_bytes: u64,
        offset: u64,
    },

    /// Key or value exceeds the configured limit
    #[error("Entry {component} too large: {entry_size} bytes exceeds limit of {max_size} bytes")]
    OversizedEntry {
        entry_size: u64,
        max_size: u64,
        /// `"key"` or `"value"`
        component: &'static str,
    },

    /// Magic bytes not found at expected location
    #[error("Magic bytes not found in {} at offset {offset}: found {:02x}{:02x}{:02x}{:02x}",
        .path.display(), .found_bytes[0], .found_bytes[1], .found_bytes[2], .found_bytes[3])]
    NoMagicFound {
        path: PathBuf,
        offset: u64,
        found_bytes: [u8; 4],
    },

    /// The engine has been closed
    #[error("engine is closed")]
    Closed,

    /// Configuration rejected by [`crate::Config::validate`]
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" in {}", p.display()),
        None => String::new(),
    }
}

impl EngineError {
    /// Build an [`EngineError::Io`] carrying the file it happened on.
    pub(crate) fn io_at(path: impl Into<PathBuf>, err: &std::io::Error, what: &str) -> Self {
        EngineError::Io {
            path: Some(path.into()),
            kind: err.kind(),
            message: format!("{}: {}", what, err),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            path: None,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::ChecksumMismatch {
            path: PathBuf::from("/tmp/test.log"),
            expected: 0x12345678,
            actual: 0x87654321,
            offset: 1024,
        };

        let display = err.to_string();
        assert!(display.contains("Checksum mismatch"));
        assert!(display.contains("0x12345678"));
        assert!(display.contains("0x87654321"));
    }

    #[test]
    fn test_io_display_with_and_without_path() {
        let with_path = EngineError::Io {
            path: Some(PathBuf::from("/tmp/wal")),
            kind: std::io::ErrorKind::PermissionDenied,
            message: "open failed".into(),
        };
        assert!(with_path.to_string().contains("in /tmp/wal"));

        let without: EngineError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found").into();
        match &without {
            EngineError::Io { kind, path, .. } => {
                assert_eq!(*kind, std::io::ErrorKind::NotFound);
                assert!(path.is_none());
            }
            other => panic!("Expected Io error, got {other:?}"),
        }
        assert!(!without.to_string().contains(" in "));
    }
}
