//! Burrow DB: a backend-agnostic key-value store
//!
//! [`Store`] puts one set of rules in front of any ordered byte-map
//! [`Backend`]:
//!
//! - keys must be non-empty and values present (an empty value is fine)
//! - a missing key is `Ok(None)`, never an error
//! - iterators cover `[start, end)` in either direction over a snapshot
//! - batches commit all of their entries or none
//! - plain writes sync only when the store was opened with `force_sync`
//!
//! # Example
//!
//! ```no_run
//! use burrow_db::{Options, Store};
//!
//! # fn main() -> burrow_db::Result<()> {
//! let store = Store::open("/var/lib/app", "state", Options::default())?;
//! store.set(b"height", Some(b"42"))?;
//!
//! let mut batch = store.new_batch()?;
//! batch.set(b"a", Some(b"1"))?;
//! batch.delete(b"height")?;
//! batch.write_sync()?;
//!
//! for (key, value) in store.iterator(Some(b"a"), None)? {
//!     println!("{key:?} = {value:?}");
//! }
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod batch;
pub mod config;
pub mod error;
pub mod iterator;
pub mod store;
mod validate;

pub use backend::{Backend, BackendCursor, BackendType, MemoryBackend};
pub use batch::WriteBatch;
pub use config::Options;
pub use error::{Error, Result};
pub use iterator::RangeIterator;
pub use store::Store;

pub use burrow_core::{BatchOp, Config as EngineConfig, Durability, EngineError};
