//! Bounded snapshot cursor
//!
//! A cursor walks one pinned version of the table within `[lower, upper)`.
//! Lower is inclusive, upper exclusive, either may be absent. Positioning
//! calls return whether the cursor landed on a key; once a move runs off
//! either end the cursor is unpositioned and `next`/`prev` keep returning
//! `false` until `first`/`last` reposition it.

use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::memtable::Tree;

pub struct Cursor {
    snapshot: Arc<Tree>,
    lower: Option<Vec<u8>>,
    upper: Option<Vec<u8>>,
    position: Option<Vec<u8>>,
    open_cursors: Arc<AtomicUsize>,
}

impl Cursor {
    pub(crate) fn new(
        snapshot: Arc<Tree>,
        lower: Option<Vec<u8>>,
        upper: Option<Vec<u8>>,
        open_cursors: Arc<AtomicUsize>,
    ) -> Self {
        open_cursors.fetch_add(1, Ordering::AcqRel);
        Self {
            snapshot,
            lower,
            upper,
            position: None,
            open_cursors,
        }
    }

    fn lower_bound(&self) -> Bound<&[u8]> {
        match &self.lower {
            Some(l) => Bound::Included(l.as_slice()),
            None => Bound::Unbounded,
        }
    }

    fn upper_bound(&self) -> Bound<&[u8]> {
        match &self.upper {
            Some(u) => Bound::Excluded(u.as_slice()),
            None => Bound::Unbounded,
        }
    }

    /// `lower >= upper` describes no keys. `BTreeMap::range` panics on an
    /// inverted range, so this is checked first.
    fn range_is_empty(&self) -> bool {
        matches!((&self.lower, &self.upper), (Some(l), Some(u)) if l >= u)
    }

    fn land(&mut self, key: Option<Vec<u8>>) -> bool {
        self.position = key;
        self.position.is_some()
    }

    /// Move to the smallest key in range.
    pub fn first(&mut self) -> bool {
        let found = if self.range_is_empty() {
            None
        } else {
            self.snapshot
                .range::<[u8], _>((self.lower_bound(), self.upper_bound()))
                .next()
                .map(|(k, _)| k.clone())
        };
        self.land(found)
    }

    /// Move to the largest key in range.
    pub fn last(&mut self) -> bool {
        let found = if self.range_is_empty() {
            None
        } else {
            self.snapshot
                .range::<[u8], _>((self.lower_bound(), self.upper_bound()))
                .next_back()
                .map(|(k, _)| k.clone())
        };
        self.land(found)
    }

    /// Move to the next larger key in range.
    pub fn next(&mut self) -> bool {
        let Some(pos) = self.position.as_deref() else {
            return false;
        };
        let found = self
            .snapshot
            .range::<[u8], _>((Bound::Excluded(pos), self.upper_bound()))
            .next()
            .map(|(k, _)| k.clone());
        self.land(found)
    }

    /// Move to the next smaller key in range.
    pub fn prev(&mut self) -> bool {
        let Some(pos) = self.position.as_deref() else {
            return false;
        };
        let found = self
            .snapshot
            .range::<[u8], _>((self.lower_bound(), Bound::Excluded(pos)))
            .next_back()
            .map(|(k, _)| k.clone());
        self.land(found)
    }

    pub fn valid(&self) -> bool {
        self.position.is_some()
    }

    pub fn key(&self) -> Option<&[u8]> {
        self.position.as_deref()
    }

    pub fn value(&self) -> Option<&[u8]> {
        let pos = self.position.as_deref()?;
        self.snapshot.get(pos).map(Vec::as_slice)
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("entries", &self.snapshot.len())
            .field("lower", &self.lower)
            .field("upper", &self.upper)
            .field("position", &self.position)
            .finish()
    }
}
