//! Key-Value Module
//!
//! The key-value collaborator the menu layer is written against, plus the
//! in-memory keyspace the engine keeps behind its WAL.
//!
//! ## Responsibilities
//! - Define [`KvBackend`], the four primitive operations the menu layer
//!   consumes (`increment`, `write_fields`, `read_fields`, `add_to_set`)
//! - Group writes into a [`WriteBatch`] that backends may commit atomically
//! - Hold typed values (counter, hash, set) per key in a [`Keyspace`]

mod batch;
mod keyspace;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::Result;

pub use batch::{BatchOp, WriteBatch};
pub use keyspace::{Keyspace, Value};

/// Field name → field value map stored at a hash key
pub type FieldMap = BTreeMap<String, String>;

/// Durable key-value store consumed by the menu layer
///
/// Implementations must be safe to share between threads. Every method either
/// completes or fails without leaving a partially applied operation behind.
pub trait KvBackend: Send + Sync {
    /// Atomically add one to the counter at `counter_key` and return the new
    /// value. A missing counter starts at zero, so the first call returns 1.
    fn increment(&self, counter_key: &str) -> Result<u64>;

    /// Set every field in `fields` on the hash at `key`
    ///
    /// Fields not mentioned keep their previous value.
    fn write_fields(&self, key: &str, fields: &FieldMap) -> Result<()>;

    /// All fields of the hash at `key`; empty when the key does not exist
    fn read_fields(&self, key: &str) -> Result<FieldMap>;

    /// Add `member` to the set at `set_key`, returning whether it was new
    fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool>;

    /// Every member of the set at `set_key`; empty when the key does not exist
    fn set_members(&self, set_key: &str) -> Result<BTreeSet<String>>;

    /// Apply the operations of `batch` in order
    ///
    /// The default runs each operation as its own call and gives no
    /// atomicity: a failure part-way leaves the earlier operations applied.
    fn commit(&self, batch: WriteBatch) -> Result<()> {
        for op in batch.into_ops() {
            match op {
                BatchOp::WriteFields { key, fields } => self.write_fields(&key, &fields)?,
                BatchOp::AddToSet { key, member } => {
                    self.add_to_set(&key, &member)?;
                }
            }
        }
        Ok(())
    }
}

macro_rules! forward_backend {
    ($ty:ty) => {
        impl<B: KvBackend + ?Sized> KvBackend for $ty {
            fn increment(&self, counter_key: &str) -> Result<u64> {
                (**self).increment(counter_key)
            }

            fn write_fields(&self, key: &str, fields: &FieldMap) -> Result<()> {
                (**self).write_fields(key, fields)
            }

            fn read_fields(&self, key: &str) -> Result<FieldMap> {
                (**self).read_fields(key)
            }

            fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool> {
                (**self).add_to_set(set_key, member)
            }

            fn set_members(&self, set_key: &str) -> Result<BTreeSet<String>> {
                (**self).set_members(set_key)
            }

            fn commit(&self, batch: WriteBatch) -> Result<()> {
                (**self).commit(batch)
            }
        }
    };
}

forward_backend!(&B);
forward_backend!(Arc<B>);
