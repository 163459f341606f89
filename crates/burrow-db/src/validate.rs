//! Argument checks shared by the store and its batches.
//!
//! These run before anything reaches a backend.

use crate::error::{Error, Result};

pub(crate) fn key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey);
    }
    Ok(())
}

pub(crate) fn value(value: Option<&[u8]>) -> Result<&[u8]> {
    value.ok_or(Error::InvalidValue)
}

pub(crate) fn bound(bound: Option<&[u8]>) -> Result<()> {
    match bound {
        Some(b) if b.is_empty() => Err(Error::InvalidBound),
        _ => Ok(()),
    }
}
