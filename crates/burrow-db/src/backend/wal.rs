//! [`Backend`] for the WAL engine.

use std::collections::BTreeMap;

use burrow_core::{BatchOp, Cursor, Durability, Engine, EngineResult};

use super::{Backend, BackendCursor, BackendType};

impl Backend for Engine {
    fn backend_type(&self) -> BackendType {
        BackendType::Wal
    }

    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        Engine::get(self, key)
    }

    fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> EngineResult<()> {
        Engine::put(self, key, value, durability)
    }

    fn delete(&self, key: &[u8], durability: Durability) -> EngineResult<()> {
        Engine::delete(self, key, durability)
    }

    fn apply(&self, ops: &[BatchOp], durability: Durability) -> EngineResult<()> {
        self.write(ops, durability)
    }

    fn cursor(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> EngineResult<Box<dyn BackendCursor>> {
        Ok(Box::new(Engine::cursor(self, lower, upper)?))
    }

    fn stats(&self) -> BTreeMap<String, String> {
        let stats = Engine::stats(self);
        let mut out = BTreeMap::new();
        out.insert("backend".to_string(), BackendType::Wal.to_string());
        out.insert("entries".to_string(), stats.entries.to_string());
        out.insert("cursors.open".to_string(), stats.open_cursors.to_string());
        out.insert("wal.bytes".to_string(), stats.wal_bytes_written.to_string());
        out.insert("wal.syncs".to_string(), stats.wal_syncs.to_string());
        out.insert(
            "wal.recovered_records".to_string(),
            stats.recovered_records.to_string(),
        );
        if let Some(file) = stats.wal_file {
            out.insert("wal.file".to_string(), file.display().to_string());
        }
        out
    }

    fn close(&self) -> EngineResult<()> {
        Engine::close(self)
    }
}

impl BackendCursor for Cursor {
    fn first(&mut self) -> bool {
        Cursor::first(self)
    }

    fn last(&mut self) -> bool {
        Cursor::last(self)
    }

    fn next(&mut self) -> bool {
        Cursor::next(self)
    }

    fn prev(&mut self) -> bool {
        Cursor::prev(self)
    }

    fn key(&self) -> Option<&[u8]> {
        Cursor::key(self)
    }

    fn value(&self) -> Option<&[u8]> {
        Cursor::value(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burrow_core::Config;
    use tempfile::TempDir;

    #[test]
    fn test_stats_report_wal_counters() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(dir.path(), Config::default()).unwrap();
        engine.put(b"a", b"1", Durability::Sync).unwrap();

        let backend: &dyn Backend = &engine;
        let stats = backend.stats();
        assert_eq!(stats["backend"], "wal");
        assert_eq!(stats["entries"], "1");
        assert_eq!(stats["wal.syncs"], "1");
        assert!(stats.contains_key("wal.file"));
        assert_ne!(stats["wal.bytes"], "0");
    }

    #[test]
    fn test_boxed_cursor_walks_range() {
        let dir = TempDir::new().unwrap();
        let engine = Engine::open(dir.path(), Config::default()).unwrap();
        for k in ["a", "b", "c", "d"] {
            engine.put(k.as_bytes(), b"v", Durability::NoSync).unwrap();
        }

        let backend: &dyn Backend = &engine;
        let mut cursor = backend.cursor(Some(&b"b"[..]), Some(&b"d"[..])).unwrap();
        assert!(cursor.last());
        assert_eq!(cursor.key(), Some(&b"c"[..]));
        assert!(cursor.prev());
        assert_eq!(cursor.key(), Some(&b"b"[..]));
        assert!(!cursor.prev());
        assert_eq!(backend.stats()["cursors.open"], "1");
        drop(cursor);
        assert_eq!(backend.stats()["cursors.open"], "0");
    }
}
