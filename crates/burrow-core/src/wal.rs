//! Write-ahead log
//!
//! Write ordering for every mutation:
//! 1. encode the record (with CRC32C)
//! 2. append it to the current WAL file
//! 3. if the write is `Durability::Sync`, flush the file to media
//! 4. only then does the caller touch the in-memory table
//!
//! A `NoSync` append stops after step 2: the record is in the OS page cache
//! and survives a process crash but not necessarily a machine crash.
//!
//! The log never keeps bytes of a write that was reported as failed. A failed
//! write is cut back off the file. A failed flush is cut back too, and the
//! writer then refuses further appends, since the device state is unknown.
//! On open, whatever follows the last intact record of the newest file is
//! cut off before appending resumes.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::durability::{durable_sync, Durability};
use crate::error::{EngineError, EngineResult};
use crate::format::{decode_record, WalRecord, HEADER_SIZE, MAGIC_ARRAY};

const WAL_PREFIX: &str = "wal-";
const WAL_SUFFIX: &str = ".log";

fn wal_file_name(sequence: u64) -> String {
    format!("{}{:016x}{}", WAL_PREFIX, sequence, WAL_SUFFIX)
}

fn parse_wal_sequence(name: &str) -> Option<u64> {
    let hex = name.strip_prefix(WAL_PREFIX)?.strip_suffix(WAL_SUFFIX)?;
    u64::from_str_radix(hex, 16).ok()
}

/// Appends encoded records to the active WAL file.
///
/// Invariant: `append` has returned before the caller updates the table.
pub struct WalWriter {
    file: File,
    path: PathBuf,
    /// Bytes in the current file, tracked to avoid stat calls
    size: u64,
    wal_dir: PathBuf,
    sequence: u64,
    rotation_size: u64,
    /// Number of flushes to media since open
    syncs: u64,
    /// Total bytes appended since open
    bytes_written: u64,
    /// Set when a failed append could not be undone
    poisoned: bool,
}

impl WalWriter {
    /// Open the WAL in `wal_dir`, resuming the highest-numbered file.
    pub fn new<P: AsRef<Path>>(wal_dir: P, rotation_size: u64) -> EngineResult<Self> {
        let wal_dir = wal_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&wal_dir)
            .map_err(|e| EngineError::io_at(&wal_dir, &e, "failed to create WAL directory"))?;

        let sequence = Self::find_max_sequence(&wal_dir);
        let path = wal_dir.join(wal_file_name(sequence));
        let file = Self::open_file(&path)?;
        let size = file
            .metadata()
            .map_err(|e| EngineError::io_at(&path, &e, "failed to stat WAL file"))?
            .len();

        Ok(Self {
            file,
            path,
            size,
            wal_dir,
            sequence,
            rotation_size,
            syncs: 0,
            bytes_written: 0,
            poisoned: false,
        })
    }

    fn open_file(path: &Path) -> EngineResult<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| EngineError::io_at(path, &e, "failed to open WAL file"))
    }

    fn find_max_sequence(wal_dir: &Path) -> u64 {
        std::fs::read_dir(wal_dir)
            .into_iter()
            .flatten()
            .flatten()
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_wal_sequence))
            .max()
            .unwrap_or(0)
    }

    /// Append one encoded record, flushing it to media when `durability`
    /// asks for it.
    ///
    /// On error the file is cut back to where it was, so the record is never
    /// replayed. A failed flush also poisons the writer.
    pub fn append(&mut self, record: &[u8], durability: Durability) -> EngineResult<()> {
        if self.poisoned {
            return Err(EngineError::Io {
                path: Some(self.path.clone()),
                kind: io::ErrorKind::Other,
                message: "WAL rejected append after an earlier unrecoverable failure".into(),
            });
        }
        if self.size > 0 && self.size + record.len() as u64 > self.rotation_size {
            self.rotate()?;
        }

        if let Err(e) = self.file.write_all(record) {
            self.rollback(false);
            return Err(EngineError::io_at(&self.path, &e, "WAL write failed"));
        }
        if durability.is_sync() {
            if let Err(e) = self.sync() {
                self.rollback(true);
                return Err(e);
            }
        }

        self.size += record.len() as u64;
        self.bytes_written += record.len() as u64;
        Ok(())
    }

    /// Cut the file back to `self.size`, dropping a partial or unacknowledged
    /// record. The writer is poisoned when `poison` is set or the cut fails.
    fn rollback(&mut self, poison: bool) {
        match self.file.set_len(self.size) {
            Ok(()) => {
                warn!(file = %self.path.display(), size = self.size, "rolled back failed WAL append");
            }
            Err(e) => {
                warn!(file = %self.path.display(), error = %e, "WAL rollback failed");
                self.poisoned = true;
            }
        }
        if poison {
            self.poisoned = true;
        }
    }

    /// Flush the current file without writing anything. Makes every prior
    /// `NoSync` append durable at once.
    pub fn sync(&mut self) -> EngineResult<()> {
        durable_sync(&self.file)
            .map_err(|e| EngineError::io_at(&self.path, &e, "WAL durable_sync failed"))?;
        self.syncs += 1;
        Ok(())
    }

    /// Switch to a new file. The old one is flushed first so nothing written
    /// before the rotation depends on a file we no longer hold open.
    fn rotate(&mut self) -> EngineResult<()> {
        self.sync()?;
        self.sequence += 1;
        let new_path = self.wal_dir.join(wal_file_name(self.sequence));
        self.file = Self::open_file(&new_path)?;
        debug!(from = %self.path.display(), to = %new_path.display(), "rotated WAL file");
        self.path = new_path;
        self.size = 0;
        Ok(())
    }

    pub fn current_path(&self) -> &Path {
        &self.path
    }

    pub fn current_size(&self) -> u64 {
        self.size
    }

    pub fn sync_count(&self) -> u64 {
        self.syncs
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}

/// Result of a WAL replay.
#[derive(Debug, Default)]
pub struct WalRecovery {
    /// Every intact record, oldest first
    pub records: Vec<WalRecord>,
    /// Newest WAL file and the offset just past its last intact record
    pub tail: Option<(PathBuf, u64)>,
}

/// Replays WAL files in sequence order.
pub struct WalReader {
    wal_dir: PathBuf,
}

impl WalReader {
    pub fn new<P: AsRef<Path>>(wal_dir: P) -> Self {
        Self {
            wal_dir: wal_dir.as_ref().to_path_buf(),
        }
    }

    /// Recover every intact record, oldest first.
    ///
    /// Per file: a bad magic or checksum skips ahead to the next magic; a
    /// record that runs past end-of-file is the crash point and ends that
    /// file.
    pub fn recover(&self) -> EngineResult<WalRecovery> {
        let dir_entries = std::fs::read_dir(&self.wal_dir)
            .map_err(|e| EngineError::io_at(&self.wal_dir, &e, "failed to read WAL directory"))?;

        let mut wal_files: Vec<(u64, PathBuf)> = Vec::new();
        for entry in dir_entries {
            let entry = entry.map_err(|e| {
                EngineError::io_at(&self.wal_dir, &e, "failed to read directory entry")
            })?;
            let path = entry.path();
            if let Some(seq) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_wal_sequence)
            {
                wal_files.push((seq, path));
            }
        }
        wal_files.sort_by_key(|(seq, _)| *seq);

        let mut recovery = WalRecovery::default();
        for (_, path) in &wal_files {
            let (records, valid_len) = self.recover_from_file(path)?;
            recovery.records.extend(records);
            recovery.tail = Some((path.clone(), valid_len));
        }
        Ok(recovery)
    }

    /// Records of one file plus the offset just past the last of them.
    fn recover_from_file(&self, path: &Path) -> EngineResult<(Vec<WalRecord>, u64)> {
        let mut buffer = Vec::new();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buffer))
            .map_err(|e| EngineError::io_at(path, &e, "failed to read WAL file"))?;

        let mut records = Vec::new();
        let mut offset = 0;
        let mut valid_len = 0;

        while offset + HEADER_SIZE <= buffer.len() {
            if buffer[offset..offset + 4] != MAGIC_ARRAY {
                warn!(file = %path.display(), offset, "bad magic, scanning for next record");
                match find_next_magic(&buffer, offset + 1) {
                    Some(next) => {
                        offset = next;
                        continue;
                    }
                    None => break,
                }
            }

            let length = u32::from_le_bytes([
                buffer[offset + 4],
                buffer[offset + 5],
                buffer[offset + 6],
                buffer[offset + 7],
            ]) as usize;
            let total = HEADER_SIZE + length;

            if offset + total > buffer.len() {
                warn!(
                    file = %path.display(),
                    offset,
                    need = total,
                    have = buffer.len() - offset,
                    "torn write at WAL tail, stopping replay of this file"
                );
                break;
            }

            match decode_record(&buffer[offset..offset + total]) {
                Ok(record) => {
                    records.push(record);
                    offset += total;
                    valid_len = offset;
                }
                Err(e) => {
                    warn!(file = %path.display(), offset, error = %e, "corrupt WAL record skipped");
                    match find_next_magic(&buffer, offset + 1) {
                        Some(next) => offset = next,
                        None => break,
                    }
                }
            }
        }

        Ok((records, valid_len as u64))
    }
}

/// Cut `path` back to `len` bytes and flush the new length, discarding a
/// torn or corrupt tail before anything is appended after it.
pub fn truncate_tail(path: &Path, len: u64) -> EngineResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| EngineError::io_at(path, &e, "failed to open WAL file for truncation"))?;
    let current = file
        .metadata()
        .map_err(|e| EngineError::io_at(path, &e, "failed to stat WAL file"))?
        .len();
    if current <= len {
        return Ok(());
    }
    warn!(file = %path.display(), from = current, to = len, "discarding damaged WAL tail");
    file.set_len(len)
        .map_err(|e| EngineError::io_at(path, &e, "failed to truncate WAL file"))?;
    durable_sync(&file).map_err(|e| EngineError::io_at(path, &e, "WAL durable_sync failed"))
}

/// Position of the next magic sequence at or after `start`.
fn find_next_magic(buffer: &[u8], start: usize) -> Option<usize> {
    if start >= buffer.len() {
        return None;
    }
    buffer[start..]
        .windows(MAGIC_ARRAY.len())
        .position(|w| w == MAGIC_ARRAY)
        .map(|p| start + p)
}
