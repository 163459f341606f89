//! Volatile backend over a bare [`MemTable`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use burrow_core::{
    BatchOp, Config as EngineConfig, Durability, EngineError, EngineResult, MemTable,
};

use super::{Backend, BackendCursor, BackendType};

/// Ordered map with no log behind it.
///
/// Durability arguments are accepted and ignored. Key and value limits from
/// the engine config are enforced the same way the WAL engine enforces them,
/// so a store behaves identically on either backend until it is reopened.
#[derive(Debug)]
pub struct MemoryBackend {
    table: MemTable,
    config: EngineConfig,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            table: MemTable::new(),
            config,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Backend for MemoryBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Memory
    }

    fn get(&self, key: &[u8]) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_open()?;
        Ok(self.table.get(key))
    }

    fn put(&self, key: &[u8], value: &[u8], durability: Durability) -> EngineResult<()> {
        self.apply(
            &[BatchOp::Put {
                key: key.to_vec(),
                value: value.to_vec(),
            }],
            durability,
        )
    }

    fn delete(&self, key: &[u8], durability: Durability) -> EngineResult<()> {
        self.apply(&[BatchOp::Delete { key: key.to_vec() }], durability)
    }

    fn apply(&self, ops: &[BatchOp], _durability: Durability) -> EngineResult<()> {
        self.ensure_open()?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => self.config.check_entry(key, value)?,
                BatchOp::Delete { key } => self.config.check_entry(key, &[])?,
            }
        }
        self.table.apply(ops);
        Ok(())
    }

    fn cursor(
        &self,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
    ) -> EngineResult<Box<dyn BackendCursor>> {
        self.ensure_open()?;
        Ok(Box::new(self.table.cursor(lower, upper)))
    }

    fn stats(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        out.insert("backend".to_string(), BackendType::Memory.to_string());
        out.insert("entries".to_string(), self.table.len().to_string());
        out.insert(
            "cursors.open".to_string(),
            self.table.open_cursors().to_string(),
        );
        out
    }

    fn close(&self) -> EngineResult<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let backend = MemoryBackend::default();
        backend.put(b"k", b"v", Durability::Sync).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), Some(b"v".to_vec()));
        backend.delete(b"k", Durability::NoSync).unwrap();
        assert_eq!(backend.get(b"k").unwrap(), None);
        backend.delete(b"never", Durability::NoSync).unwrap();
    }

    #[test]
    fn test_oversized_batch_applies_nothing() {
        let backend = MemoryBackend::new(EngineConfig::default().with_max_value_size(4));
        let ops = vec![
            BatchOp::Put {
                key: b"a".to_vec(),
                value: b"ok".to_vec(),
            },
            BatchOp::Put {
                key: b"b".to_vec(),
                value: b"too long".to_vec(),
            },
        ];
        let err = backend.apply(&ops, Durability::NoSync).unwrap_err();
        assert!(matches!(err, EngineError::OversizedEntry { component: "value", .. }));
        assert_eq!(backend.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_closed_rejects_everything() {
        let backend = MemoryBackend::default();
        backend.close().unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.get(b"k"), Err(EngineError::Closed)));
        assert!(matches!(
            backend.put(b"k", b"v", Durability::NoSync),
            Err(EngineError::Closed)
        ));
        assert!(matches!(backend.cursor(None, None), Err(EngineError::Closed)));
    }

    #[test]
    fn test_stats() {
        let backend = MemoryBackend::default();
        backend.put(b"a", b"1", Durability::NoSync).unwrap();
        let cursor = backend.cursor(None, None).unwrap();
        let stats = backend.stats();
        assert_eq!(stats["backend"], "memory");
        assert_eq!(stats["entries"], "1");
        assert_eq!(stats["cursors.open"], "1");
        drop(cursor);
    }
}
