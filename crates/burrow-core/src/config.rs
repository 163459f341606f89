//! Engine configuration
//!
//! Presets for the two common deployment shapes plus field-level overrides.

use crate::error::{EngineError, EngineResult};

/// Hard ceiling for keys: the WAL encodes key length as a `u16`.
pub const KEY_SIZE_LIMIT: usize = u16::MAX as usize;

/// Hard ceiling for values.
pub const VALUE_SIZE_LIMIT: usize = 128 * 1024 * 1024;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// WAL file rotation threshold (bytes)
    pub wal_rotation_size_bytes: u64,
    /// Maximum key size in bytes
    pub max_key_size: usize,
    /// Maximum value size in bytes
    pub max_value_size: usize,
}

impl Config {
    /// Server-class defaults: large WAL files, generous value limit.
    pub fn server() -> Self {
        Self {
            wal_rotation_size_bytes: 100 * 1024 * 1024,
            max_key_size: 4096,
            max_value_size: 32 * 1024 * 1024,
        }
    }

    /// Embedded/edge defaults: smaller WAL files and values.
    pub fn embedded() -> Self {
        Self {
            wal_rotation_size_bytes: 16 * 1024 * 1024,
            max_key_size: 1024,
            max_value_size: 4 * 1024 * 1024,
        }
    }

    /// Override the WAL rotation threshold.
    pub fn with_wal_rotation_size(mut self, bytes: u64) -> Self {
        self.wal_rotation_size_bytes = bytes;
        self
    }

    /// Override the maximum key size.
    pub fn with_max_key_size(mut self, bytes: usize) -> Self {
        self.max_key_size = bytes;
        self
    }

    /// Override the maximum value size.
    pub fn with_max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = bytes;
        self
    }

    /// Reject a key or value larger than the configured limits.
    pub fn check_entry(&self, key: &[u8], value: &[u8]) -> EngineResult<()> {
        if key.len() > self.max_key_size {
            return Err(EngineError::OversizedEntry {
                entry_size: key.len() as u64,
                max_size: self.max_key_size as u64,
                component: "key",
            });
        }
        if value.len() > self.max_value_size {
            return Err(EngineError::OversizedEntry {
                entry_size: value.len() as u64,
                max_size: self.max_value_size as u64,
                component: "value",
            });
        }
        Ok(())
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> EngineResult<()> {
        if self.wal_rotation_size_bytes < 64 * 1024 {
            return Err(EngineError::InvalidConfig(
                "wal_rotation_size_bytes must be >= 64KB".into(),
            ));
        }
        if self.max_key_size == 0 || self.max_key_size > KEY_SIZE_LIMIT {
            return Err(EngineError::InvalidConfig(format!(
                "max_key_size must be in [1, {}]",
                KEY_SIZE_LIMIT
            )));
        }
        if self.max_value_size > VALUE_SIZE_LIMIT {
            return Err(EngineError::InvalidConfig(
                "max_value_size must be <= 128MB".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::server()
    }
}
