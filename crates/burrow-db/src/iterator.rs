//! Bounded range iterator
//!
//! A [`RangeIterator`] walks `[start, end)` in either direction over one
//! snapshot of the store. It is in exactly one of three states:
//!
//! - positioned on a pair (`valid()` is true)
//! - exhausted: it ran past the range, or the range was empty
//! - released: `close()` was called; the backend cursor is gone
//!
//! Reads and advances outside the positioned state are
//! [`Error::InvalidUse`]. The current pair is copied out of the backend, so
//! `key()` and `value()` borrow memory owned by the iterator itself.

use std::fmt;

use crate::backend::BackendCursor;
use crate::error::{Error, Result};

pub struct RangeIterator {
    /// `None` once released
    cursor: Option<Box<dyn BackendCursor>>,
    start: Option<Vec<u8>>,
    end: Option<Vec<u8>>,
    reverse: bool,
    /// `None` once exhausted
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl RangeIterator {
    /// Wrap an unpositioned cursor over `[start, end)` and move it to the
    /// first pair in iteration order.
    pub(crate) fn new(
        cursor: Box<dyn BackendCursor>,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        reverse: bool,
    ) -> Self {
        let mut iter = Self {
            cursor: Some(cursor),
            start: start.map(<[u8]>::to_vec),
            end: end.map(<[u8]>::to_vec),
            reverse,
            current: None,
        };
        if let Some(cursor) = iter.cursor.as_mut() {
            if reverse {
                cursor.last();
            } else {
                cursor.first();
            }
        }
        iter.load();
        iter
    }

    fn in_range(&self, key: &[u8]) -> bool {
        let above_start = self.start.as_deref().map_or(true, |s| key >= s);
        let below_end = self.end.as_deref().map_or(true, |e| key < e);
        above_start && below_end
    }

    /// Copy the cursor's pair into `current`, or mark the iterator exhausted.
    fn load(&mut self) {
        let pair = match self.cursor.as_deref() {
            Some(cursor) => match (cursor.key(), cursor.value()) {
                (Some(k), Some(v)) if self.in_range(k) => Some((k.to_vec(), v.to_vec())),
                _ => None,
            },
            None => None,
        };
        self.current = pair;
    }

    fn step(&mut self) {
        if let Some(cursor) = self.cursor.as_mut() {
            if self.reverse {
                cursor.prev();
            } else {
                cursor.next();
            }
        }
        self.load();
    }

    fn pair(&self) -> Result<&(Vec<u8>, Vec<u8>)> {
        if self.cursor.is_none() {
            return Err(Error::InvalidUse("iterator is closed"));
        }
        self.current
            .as_ref()
            .ok_or(Error::InvalidUse("iterator is exhausted"))
    }

    /// Whether the iterator is positioned on a pair.
    pub fn valid(&self) -> bool {
        self.cursor.is_some() && self.current.is_some()
    }

    pub fn key(&self) -> Result<&[u8]> {
        self.pair().map(|(k, _)| k.as_slice())
    }

    pub fn value(&self) -> Result<&[u8]> {
        self.pair().map(|(_, v)| v.as_slice())
    }

    /// Advance one pair in iteration order. Running off the range leaves
    /// the iterator exhausted; advancing an exhausted or closed iterator
    /// is an error.
    pub fn next(&mut self) -> Result<()> {
        self.pair()?;
        self.step();
        Ok(())
    }

    /// Release the backend cursor. Repeat calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        self.cursor = None;
        self.current = None;
        Ok(())
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    /// Inclusive lower bound, if any.
    pub fn start(&self) -> Option<&[u8]> {
        self.start.as_deref()
    }

    /// Exclusive upper bound, if any.
    pub fn end(&self) -> Option<&[u8]> {
        self.end.as_deref()
    }
}

/// Drains the remaining pairs as owned `(key, value)` tuples.
///
/// The inherent [`RangeIterator::next`] takes precedence in method-call
/// syntax; this impl serves `for` loops and adapter chains.
impl Iterator for RangeIterator {
    type Item = (Vec<u8>, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.as_ref()?;
        let pair = self.current.take()?;
        self.step();
        Some(pair)
    }
}

impl fmt::Debug for RangeIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeIterator")
            .field("start", &self.start)
            .field("end", &self.end)
            .field("reverse", &self.reverse)
            .field("valid", &self.valid())
            .field("released", &self.cursor.is_none())
            .finish()
    }
}
