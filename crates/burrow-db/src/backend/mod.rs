//! Backend seam
//!
//! The store talks to storage only through [`Backend`] and the
//! [`BackendCursor`]s it hands out. Backends are opaque ordered byte maps:
//! they know nothing about empty-key rules or default durability, which
//! the store enforces before any call reaches them.
//!
//! # Invariants
//!
//! - keys are ordered by unsigned lexicographic byte comparison
//! - `apply` is atomic: after it returns, readers see every op or none
//! - a cursor walks one consistent snapshot within `[lower, upper)`
//! - after `close`, every operation fails with `EngineError::Closed`
//!
//! # Implementors
//!
//! - [`burrow_core::Engine`]: WAL-backed, persistent
//! - [`MemoryBackend`]: volatile, for tests and scratch stores

mod memory;
mod wal;

pub use memory::MemoryBackend;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use burrow_core::{BatchOp, Config as EngineConfig, Durability, Engine, EngineResult};

use crate::error::{Error, Result};

/// Ordered key-value storage behind a [`Store`](crate::Store).
pub trait Backend: Send + Sync {
    fn backend_type(&self) -> BackendType;

    /// Owned copy of the value stored under `key`.
    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>>;

    fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> EngineResult<()>;

    /// Removing an absent key succeeds.
    fn delete(&self, key: &[u8], durability: Durability) -> EngineResult<()>;

    /// Apply `ops` in order as one atomic unit.
    fn apply(&self, ops: &[BatchOp], durability: Durability) -> EngineResult<()>;

    /// Unpositioned cursor over `[lower, upper)`. Either bound may be absent.
    fn cursor(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> EngineResult<Box<dyn BackendCursor>>;

    /// Free-form metrics. May be empty.
    fn stats(&self) -> BTreeMap<String, String>;

    /// Release the backend. Repeat calls succeed.
    fn close(&self) -> EngineResult<()>;
}

/// Bidirectional cursor handed out by [`Backend::cursor`].
///
/// Each move returns whether the cursor is now on a key. Dropping the
/// cursor releases it.
pub trait BackendCursor: Send {
    fn first(&mut self) -> bool;
    fn last(&mut self) -> bool;
    fn next(&mut self) -> bool;
    fn prev(&mut self) -> bool;
    fn key(&self) -> Option<&[u8]>;
    fn value(&self) -> Option<&[u8]>;
}

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

/// Which backend a store is opened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackendType {
    /// `burrow_core::Engine`: RAM table plus write-ahead log.
    #[default]
    Wal,
    /// RAM only; contents vanish on close.
    Memory,
}

impl BackendType {
    pub const ALL: [BackendType; 2] = [BackendType::Wal, BackendType::Memory];

    pub fn name(self) -> &'static str {
        match self {
            BackendType::Wal => "wal",
            BackendType::Memory => "memory",
        }
    }

    /// Whether data written to this backend survives a reopen.
    pub fn is_persistent(self) -> bool {
        matches!(self, BackendType::Wal)
    }

    /// Open a backend of this type at `path`.
    ///
    /// `path` is a directory owned by the backend; it is created if missing.
    /// The memory backend ignores it.
    pub fn open(self, path: &Path, config: &EngineConfig) -> Result<Arc<dyn Backend>> {
        config.validate()?;
        let backend: Arc<dyn Backend> = match self {
            BackendType::Wal => Arc::new(Engine::open(path, config.clone())?),
            BackendType::Memory => Arc::new(MemoryBackend::new(config.clone())),
        };
        Ok(backend)
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        BackendType::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidConfig(format!("unknown backend {s:?}")))
    }
}
