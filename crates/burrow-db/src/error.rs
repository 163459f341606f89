//! Error kinds surfaced by the store facade.
//!
//! A missing key is not an error: lookups return `Ok(None)` / `Ok(false)`.

use burrow_core::EngineError;
use thiserror::Error;

/// Errors returned by [`Store`](crate::Store) and the handles it creates.
#[derive(Debug, Error)]
pub enum Error {
    /// Keys must be non-empty.
    #[error("key cannot be empty")]
    InvalidKey,

    /// A write was given no value. An empty value is fine.
    #[error("value cannot be absent")]
    InvalidValue,

    /// An iterator bound was present but empty.
    #[error("iterator bound cannot be empty")]
    InvalidBound,

    /// Lifecycle misuse: a closed store, a spent batch, or an iterator that
    /// is exhausted or released.
    #[error("invalid use: {0}")]
    InvalidUse(&'static str),

    /// Anything the backend reports, passed through unchanged.
    #[error(transparent)]
    Engine(EngineError),

    /// Rejected options, backend names or environment values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing a dump to the caller's sink failed.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
}

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Closed => Error::InvalidUse("store is closed"),
            EngineError::InvalidConfig(msg) => Error::InvalidConfig(msg),
            other => Error::Engine(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_engine_maps_to_invalid_use() {
        let err: Error = EngineError::Closed.into();
        assert!(matches!(err, Error::InvalidUse(_)));
    }

    #[test]
    fn test_engine_failures_pass_through() {
        let err: Error = EngineError::OversizedEntry {
            entry_size: 10,
            max_size: 5,
            component: "key",
        }
        .into();
        assert!(matches!(err, Error::Engine(EngineError::OversizedEntry { .. })));
        assert!(err.to_string().contains("key"));
    }

    #[test]
    fn test_config_error_keeps_message() {
        let err: Error = EngineError::InvalidConfig("bad rotation".into()).into();
        match err {
            Error::InvalidConfig(msg) => assert_eq!(msg, "bad rotation"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
