//! Atomic write batches
//!
//! A [`WriteBatch`] buffers sets and deletes and hands them to the backend
//! as one unit. Nothing is visible to readers until commit, and after commit
//! all of it is. Committing or discarding spends the batch.

use std::fmt;
use std::sync::Arc;

use burrow_core::{BatchOp, Durability};
use tracing::debug;

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::validate;

pub struct WriteBatch {
    backend: Arc<dyn Backend>,
    default_durability: Durability,
    ops: Vec<BatchOp>,
    size_bytes: usize,
    spent: bool,
}

impl WriteBatch {
    pub(crate) fn new(backend: Arc<dyn Backend>, default_durability: Durability) -> Self {
        Self {
            backend,
            default_durability,
            ops: Vec::new(),
            size_bytes: 0,
            spent: false,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.spent {
            return Err(Error::InvalidUse("batch already committed or closed"));
        }
        Ok(())
    }

    /// Queue a set. Same argument rules as [`Store::set`](crate::Store::set).
    pub fn set(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.ensure_live()?;
        validate::key(key)?;
        let value = validate::value(value)?;
        self.size_bytes += key.len() + value.len();
        self.ops.push(BatchOp::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        Ok(())
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.ensure_live()?;
        validate::key(key)?;
        self.size_bytes += key.len();
        self.ops.push(BatchOp::Delete { key: key.to_vec() });
        Ok(())
    }

    /// Commit with the store's default durability.
    pub fn write(&mut self) -> Result<()> {
        self.commit(self.default_durability)
    }

    /// Commit and sync before returning.
    pub fn write_sync(&mut self) -> Result<()> {
        self.commit(Durability::Sync)
    }

    /// The batch is spent even when the backend rejects it.
    fn commit(&mut self, durability: Durability) -> Result<()> {
        self.ensure_live()?;
        self.spent = true;
        let ops = std::mem::take(&mut self.ops);
        debug!(
            ops = ops.len(),
            bytes = self.size_bytes,
            sync = durability.is_sync(),
            "committing batch"
        );
        self.backend.apply(&ops, durability)?;
        Ok(())
    }

    /// Discard queued entries without committing. Repeat calls do nothing.
    pub fn close(&mut self) -> Result<()> {
        self.spent = true;
        self.ops.clear();
        self.size_bytes = 0;
        Ok(())
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Sum of queued key and value lengths.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }
}

impl fmt::Debug for WriteBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteBatch")
            .field("ops", &self.ops.len())
            .field("size_bytes", &self.size_bytes)
            .field("spent", &self.spent)
            .finish()
    }
}
