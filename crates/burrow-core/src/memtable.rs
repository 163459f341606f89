//! Ordered in-RAM table
//!
//! The table is a `BTreeMap` held behind an `Arc`. Readers that need a stable
//! view (cursors) clone the `Arc`; writers go through `Arc::make_mut`, which
//! copies the tree only while some cursor still pins the old version.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cursor::Cursor;
use crate::format::BatchOp;

pub(crate) type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// Ordered key-value table with snapshot cursors.
///
/// All methods take `&self`; point reads run concurrently, writes hold the
/// write lock for the duration of one `apply`.
pub struct MemTable {
    data: RwLock<Arc<Tree>>,
    /// Live cursor count, shared with every cursor handed out
    open_cursors: Arc<AtomicUsize>,
}

impl MemTable {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(Tree::new())),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Copy of the value stored under `key`.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.read().get(key).cloned()
    }

    /// Apply `ops` in order under a single write lock. Readers observe
    /// either none or all of them.
    pub fn apply(&self, ops: &[BatchOp]) {
        let mut guard = self.data.write();
        let tree = Arc::make_mut(&mut *guard);
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    tree.insert(key.clone(), value.clone());
                }
                BatchOp::Delete { key } => {
                    tree.remove(key.as_slice());
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Cursor over `[lower, upper)` pinned to the table as it is now.
    /// `None` leaves that side unbounded. The cursor starts unpositioned.
    pub fn cursor(&self, lower: Option<&[u8]>, upper: Option<&[u8]>) -> Cursor {
        let snapshot = Arc::clone(&*self.data.read());
        Cursor::new(
            snapshot,
            lower.map(<[u8]>::to_vec),
            upper.map(<[u8]>::to_vec),
            Arc::clone(&self.open_cursors),
        )
    }

    /// Cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemTable")
            .field("entries", &self.len())
            .field("open_cursors", &self.open_cursors())
            .finish()
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(k: &[u8], v: &[u8]) -> BatchOp {
        BatchOp::Put {
            key: k.to_vec(),
            value: v.to_vec(),
        }
    }

    #[test]
    fn test_apply_in_order() {
        let table = MemTable::new();
        table.apply(&[
            put(b"x", b"1"),
            BatchOp::Delete { key: b"x".to_vec() },
            put(b"x", b"2"),
        ]);
        assert_eq!(table.get(b"x"), Some(b"2".to_vec()));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let table = MemTable::new();
        table.apply(&[BatchOp::Delete { key: b"ghost".to_vec() }]);
        assert!(table.is_empty());
        assert_eq!(table.get(b"ghost"), None);
    }

    #[test]
    fn test_cursor_pins_snapshot() {
        let table = MemTable::new();
        table.apply(&[put(b"a", b"1")]);

        let mut cursor = table.cursor(None, None);
        table.apply(&[put(b"b", b"2"), put(b"a", b"changed")]);

        assert!(cursor.first());
        assert_eq!(cursor.value(), Some(&b"1"[..]));
        assert!(!cursor.next());
        assert_eq!(table.get(b"a"), Some(b"changed".to_vec()));
    }

    #[test]
    fn test_open_cursor_count() {
        let table = MemTable::new();
        assert_eq!(table.open_cursors(), 0);
        let c1 = table.cursor(None, None);
        let c2 = table.cursor(Some(&b"a"[..]), Some(&b"z"[..]));
        assert_eq!(table.open_cursors(), 2);
        drop(c1);
        assert_eq!(table.open_cursors(), 1);
        drop(c2);
        assert_eq!(table.open_cursors(), 0);
    }
}
