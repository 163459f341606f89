//! The store handle.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use burrow_core::Durability;
use tracing::info;

use crate::backend::{Backend, BackendType};
use crate::batch::WriteBatch;
use crate::config::Options;
use crate::error::{Error, Result};
use crate::iterator::RangeIterator;
use crate::validate;

/// A key-value store on top of one [`Backend`].
///
/// Validates every argument before the backend sees it, picks the write
/// durability, and hands out iterators and batches. Safe to share across
/// threads; the iterators and batches it creates are single-owner.
///
/// # Durability
///
/// `set`, `delete` and [`WriteBatch::write`] sync only when the store was
/// opened with `force_sync`. `set_sync`, `delete_sync` and
/// [`WriteBatch::write_sync`] always sync. The flag is fixed at open.
pub struct Store {
    backend: Arc<dyn Backend>,
    backend_type: BackendType,
    path: PathBuf,
    force_sync: bool,
    closed: AtomicBool,
}

impl Store {
    /// Open the store named `name` under `dir`, at `dir/<name>.db`.
    pub fn open<P: AsRef<Path>>(dir: P, name: &str, options: Options) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidConfig("store name cannot be empty".into()));
        }
        let path = dir.as_ref().join(format!("{name}.db"));
        Self::open_path(path, options)
    }

    /// Open the store at exactly `path`.
    pub fn open_path<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let backend = options.backend.open(&path, &options.engine)?;
        info!(
            path = %path.display(),
            backend = %options.backend,
            force_sync = options.force_sync,
            "store opened"
        );
        Ok(Self::with_backend(backend, path, options.force_sync))
    }

    /// Wrap an already-open backend.
    pub fn with_backend(backend: Arc<dyn Backend>, path: PathBuf, force_sync: bool) -> Self {
        Self {
            backend_type: backend.backend_type(),
            backend,
            path,
            force_sync,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InvalidUse("store is closed"));
        }
        Ok(())
    }

    fn default_durability(&self) -> Durability {
        Durability::from_force_sync(self.force_sync)
    }

    // -----------------------------------------------------------------------
    // Point operations
    // -----------------------------------------------------------------------

    /// Owned copy of the value under `key`, or `None` if absent.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        validate::key(key)?;
        self.ensure_open()?;
        Ok(self.backend.get(key)?)
    }

    pub fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Store `value` under `key`. `None` is rejected; an empty slice is a
    /// valid value.
    pub fn set(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.put(key, value, self.default_durability())
    }

    /// [`set`](Self::set), synced before returning.
    pub fn set_sync(&self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.put(key, value, Durability::Sync)
    }

    fn put(&self, key: &[u8], value: Option<&[u8]>, durability: Durability) -> Result<()> {
        validate::key(key)?;
        let value = validate::value(value)?;
        self.ensure_open()?;
        Ok(self.backend.put(key, value, durability)?)
    }

    /// Remove `key`. Removing an absent key succeeds.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.remove(key, self.default_durability())
    }

    /// [`delete`](Self::delete), synced before returning.
    pub fn delete_sync(&self, key: &[u8]) -> Result<()> {
        self.remove(key, Durability::Sync)
    }

    fn remove(&self, key: &[u8], durability: Durability) -> Result<()> {
        validate::key(key)?;
        self.ensure_open()?;
        Ok(self.backend.delete(key, durability)?)
    }

    // -----------------------------------------------------------------------
    // Iteration and batches
    // -----------------------------------------------------------------------

    /// Ascending iterator over `[start, end)`. An absent bound is open.
    pub fn iterator(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<RangeIterator> {
        self.range(start, end, false)
    }

    /// Descending iterator over `[start, end)`: begins at the largest key
    /// below `end` and stops after the smallest key at or above `start`.
    pub fn reverse_iterator(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<RangeIterator> {
        self.range(start, end, true)
    }

    fn range(&self, start: Option<&[u8]>, end: Option<&[u8]>, reverse: bool) -> Result<RangeIterator> {
        validate::bound(start)?;
        validate::bound(end)?;
        self.ensure_open()?;
        let cursor = self.backend.cursor(start, end)?;
        Ok(RangeIterator::new(cursor, start, end, reverse))
    }

    /// Empty batch that commits to this store.
    pub fn new_batch(&self) -> Result<WriteBatch> {
        self.ensure_open()?;
        Ok(WriteBatch::new(
            Arc::clone(&self.backend),
            self.default_durability(),
        ))
    }

    // -----------------------------------------------------------------------
    // Diagnostics and lifecycle
    // -----------------------------------------------------------------------

    /// Dump every pair to stdout, see [`print_to`](Self::print_to).
    pub fn print(&self) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.print_to(&mut out)
    }

    /// Write every pair in key order as `[KEY]:\t[VALUE]`, both in
    /// upper-case hex, one pair per line.
    pub fn print_to<W: Write>(&self, out: &mut W) -> Result<()> {
        for (key, value) in self.iterator(None, None)? {
            writeln!(out, "[{}]:\t[{}]", upper_hex(&key), upper_hex(&value))?;
        }
        Ok(())
    }

    /// Backend metrics; empty once closed.
    pub fn stats(&self) -> BTreeMap<String, String> {
        if self.closed.load(Ordering::Acquire) {
            return BTreeMap::new();
        }
        self.backend.stats()
    }

    /// Release the backend. Repeat calls return `Ok(())`; everything else
    /// fails with [`Error::InvalidUse`] afterwards.
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.backend.close()?;
        info!(path = %self.path.display(), backend = %self.backend_type, "store closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn backend_type(&self) -> BackendType {
        self.backend_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether plain `set`/`delete`/`write` sync.
    pub fn force_sync(&self) -> bool {
        self.force_sync
    }

    /// The backend itself.
    ///
    /// Calls made through it skip key and value validation and the store's
    /// force-sync policy.
    pub fn raw_backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("backend", &self.backend_type)
            .field("force_sync", &self.force_sync)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory_store() -> Store {
        Store::open_path("unused", Options::new().with_backend(BackendType::Memory)).unwrap()
    }

    #[test]
    fn test_open_places_store_under_dir() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), "chain", Options::default()).unwrap();
        assert_eq!(store.path(), dir.path().join("chain.db"));
        assert!(dir.path().join("chain.db").is_dir());
        assert_eq!(store.backend_type(), BackendType::Wal);
        assert!(!store.force_sync());
    }

    #[test]
    fn test_open_rejects_empty_name() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Store::open(dir.path(), "", Options::default()),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_upper_hex() {
        assert_eq!(upper_hex(&[]), "");
        assert_eq!(upper_hex(&[0x00, 0xab, 0x7f]), "00AB7F");
    }

    #[test]
    fn test_print_format() {
        let store = memory_store();
        store.set(b"\x01\xff", Some(b"ab")).unwrap();
        store.set(b"\x00", Some(b"")).unwrap();
        let mut out = Vec::new();
        store.print_to(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "[00]:\t[]\n[01FF]:\t[6162]\n"
        );
    }

    #[test]
    fn test_validation_precedes_closed_check() {
        let store = memory_store();
        store.close().unwrap();
        assert!(matches!(store.get(b""), Err(Error::InvalidKey)));
        assert!(matches!(store.set(b"k", None), Err(Error::InvalidValue)));
        assert!(matches!(
            store.iterator(Some(&[][..]), None),
            Err(Error::InvalidBound)
        ));
        assert!(matches!(store.get(b"k"), Err(Error::InvalidUse(_))));
    }

    #[test]
    fn test_stats_empty_after_close() {
        let store = memory_store();
        assert_eq!(store.stats()["backend"], "memory");
        store.close().unwrap();
        assert!(store.stats().is_empty());
    }

    #[test]
    fn test_debug_mentions_backend() {
        let store = memory_store();
        let debug = format!("{store:?}");
        assert!(debug.contains("Memory"));
        assert!(debug.contains("force_sync: false"));
    }
}
