//! Store options
//!
//! Everything a store needs is fixed when it is opened: which backend, whether
//! plain writes are synced, and the engine's own limits.

use burrow_core::Config as EngineConfig;

use crate::backend::BackendType;
use crate::error::{Error, Result};

/// Environment variable read by [`Options::from_env`] for the force-sync flag.
pub const FORCE_SYNC_ENV: &str = "BURROW_FORCE_SYNC";

/// Environment variable read by [`Options::from_env`] for the backend name.
pub const BACKEND_ENV: &str = "BURROW_BACKEND";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    /// Storage backend to open.
    pub backend: BackendType,
    /// When set, `set`, `delete` and `WriteBatch::write` sync like their
    /// `_sync` counterparts.
    pub force_sync: bool,
    /// Limits and WAL sizing handed to the engine.
    pub engine: EngineConfig,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_force_sync(mut self, force_sync: bool) -> Self {
        self.force_sync = force_sync;
        self
    }

    pub fn with_engine_config(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Defaults overridden by `BURROW_FORCE_SYNC` and `BURROW_BACKEND`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) but reads variables through
    /// `lookup`. Unset variables keep their defaults; set but malformed
    /// ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(raw) = lookup(FORCE_SYNC_ENV) {
            options.force_sync = parse_force_sync(&raw)?;
        }
        if let Some(raw) = lookup(BACKEND_ENV) {
            options.backend = raw.parse()?;
        }
        Ok(options)
    }
}

/// Parse a force-sync flag. Only `"0"` and `"1"` are accepted.
pub fn parse_force_sync(raw: &str) -> Result<bool> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(Error::InvalidConfig(format!(
            "force sync must be 0 or 1, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = Options::default();
        assert_eq!(options.backend, BackendType::Wal);
        assert!(!options.force_sync);
        assert_eq!(options.engine, EngineConfig::server());
    }

    #[test]
    fn test_parse_force_sync() {
        assert!(!parse_force_sync("0").unwrap());
        assert!(parse_force_sync("1").unwrap());
        for bad in ["", "true", "2", " 1", "yes"] {
            assert!(
                matches!(parse_force_sync(bad), Err(Error::InvalidConfig(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_lookup_reads_both_variables() {
        let options =
            Options::from_lookup(lookup_from(&[(FORCE_SYNC_ENV, "1"), (BACKEND_ENV, "memory")]))
                .unwrap();
        assert!(options.force_sync);
        assert_eq!(options.backend, BackendType::Memory);
    }

    #[test]
    fn test_from_lookup_unset_keeps_defaults() {
        let options = Options::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn test_from_lookup_rejects_malformed() {
        let err = Options::from_lookup(lookup_from(&[(FORCE_SYNC_ENV, "on")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        let err = Options::from_lookup(lookup_from(&[(BACKEND_ENV, "rocks")])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_builder() {
        let options = Options::new()
            .with_backend(BackendType::Memory)
            .with_force_sync(true)
            .with_engine_config(EngineConfig::embedded());
        assert_eq!(options.backend, BackendType::Memory);
        assert!(options.force_sync);
        assert_eq!(options.engine, EngineConfig::embedded());
    }
}
