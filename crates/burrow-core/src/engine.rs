//! Durable engine: ordered table + write-ahead log.
//!
//! **Read path**: straight from the in-RAM table, never touches disk.
//! **Write path**: WAL append (synced or not, per call), then table update.
//! **Open**: replay every intact WAL record into an empty table.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::cursor::Cursor;
use crate::durability::Durability;
use crate::error::{EngineError, EngineResult};
use crate::format::{encode_record, BatchOp};
use crate::memtable::MemTable;
use crate::wal::{truncate_tail, WalReader, WalWriter};

/// Point-in-time engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub entries: usize,
    pub open_cursors: usize,
    pub wal_bytes_written: u64,
    pub wal_syncs: u64,
    pub wal_file: Option<PathBuf>,
    pub recovered_records: usize,
}

/// Ordered key-value engine with a crash-safe WAL.
///
/// All methods take `&self`. Writers serialize on the WAL mutex and keep it
/// held while updating the table, so the table always reflects WAL order.
pub struct Engine {
    table: MemTable,
    /// `None` once closed
    wal: Mutex<Option<WalWriter>>,
    closed: AtomicBool,
    path: PathBuf,
    config: Config,
    recovered_records: usize,
}

impl Engine {
    /// Open or create an engine rooted at `path`.
    ///
    /// Creates `path/wal`, replays it, and resumes appending to the newest
    /// WAL file.
    pub fn open<P: AsRef<Path>>(path: P, config: Config) -> EngineResult<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let wal_dir = path.join("wal");
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| EngineError::io_at(&wal_dir, &e, "failed to create WAL directory"))?;

        let table = MemTable::new();
        let recovery = WalReader::new(&wal_dir).recover()?;
        if let Some((newest, valid_len)) = &recovery.tail {
            truncate_tail(newest, *valid_len)?;
        }
        let records = recovery.records;
        for record in &records {
            table.apply(&record.ops);
        }
        if !records.is_empty() {
            info!(
                path = %path.display(),
                records = records.len(),
                entries = table.len(),
                "recovered engine state from WAL"
            );
        }

        let wal = WalWriter::new(&wal_dir, config.wal_rotation_size_bytes)?;

        Ok(Self {
            table,
            wal: Mutex::new(Some(wal)),
            closed: AtomicBool::new(false),
            path,
            config,
            recovered_records: records.len(),
        })
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.table.get(key))
    }

    pub fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> EngineResult<()> {
        self.write(
            &[BatchOp::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            }],
            durability,
        )
    }

    /// Deleting an absent key still logs the tombstone and succeeds.
    pub fn delete(&self, key: &[u8], durability: Durability) -> EngineResult<()> {
        self.write(&[BatchOp::Delete { key: key.to_vec() }], durability)
    }

    /// Apply `ops` atomically: one WAL record, one table update.
    ///
    /// If the WAL append fails the table is never modified. A crash that
    /// tears the record loses the whole batch on replay, never part of it.
    pub fn write(&self, ops: &[BatchOp], durability: Durability) -> EngineResult<()> {
        self.ensure_open()?;
        if ops.is_empty() {
            return Ok(());
        }
        let record = encode_record(ops, &self.config)?;

        let mut wal = self.wal.lock();
        let writer = wal.as_mut().ok_or(EngineError::Closed)?;
        writer.append(&record, durability)?;
        self.table.apply(ops);
        drop(wal);

        if ops.len() > 1 {
            debug!(ops = ops.len(), bytes = record.len(), sync = durability.is_sync(), "applied batch");
        }
        Ok(())
    }

    /// Cursor over `[lower, upper)` on a snapshot of the current table.
    pub fn cursor(&self, lower: Option<&[u8]>, upper: Option<&[u8]>) -> EngineResult<Cursor> {
        self.ensure_open()?;
        Ok(self.table.cursor(lower, upper))
    }

    /// Flush the WAL to media, making every earlier `NoSync` write durable.
    pub fn sync(&self) -> EngineResult<()> {
        let mut wal = self.wal.lock();
        wal.as_mut().ok_or(EngineError::Closed)?.sync()
    }

    /// Flush and release the WAL. Later calls return `Ok(())` and do nothing;
    /// every other operation returns [`EngineError::Closed`].
    pub fn close(&self) -> EngineResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let writer = self.wal.lock().take();
        if let Some(mut writer) = writer {
            writer.sync()?;
        }
        info!(path = %self.path.display(), entries = self.table.len(), "engine closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> EngineStats {
        let wal = self.wal.lock();
        EngineStats {
            entries: self.table.len(),
            open_cursors: self.table.open_cursors(),
            wal_bytes_written: wal.as_ref().map_or(0, WalWriter::bytes_written),
            wal_syncs: wal.as_ref().map_or(0, WalWriter::sync_count),
            wal_file: wal.as_ref().map(|w| w.current_path().to_path_buf()),
            recovered_records: self.recovered_records,
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = %self.path.display(), error = %e, "engine close on drop failed");
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("path", &self.path)
            .field("entries", &self.table.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
