//! Record Store
//!
//! Persists menu records by id and maintains the index of all ids.

use std::collections::BTreeSet;

use crate::error::{MenuError, Result};
use crate::kv::{FieldMap, KvBackend, WriteBatch};

use super::{record_key, retry_once, INDEX_KEY};

/// Id → record fields, plus the set of every committed id
///
/// ## Write ordering
/// `put` commits the record's fields and the index insert as one batch,
/// fields first. With a backend whose `commit` is atomic (the engine) the
/// index can never name a record that is not there. With a backend that
/// applies batch entries one by one, a failure between the two writes can
/// only leave fields without an index entry; and because `get` treats an
/// empty field map as absent, an index entry whose fields were lost reads as
/// not found rather than as an error.
pub struct RecordStore<B> {
    backend: B,
}

impl<B: KvBackend> RecordStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Write every field of record `id` and add `id` to the index
    ///
    /// Idempotent: repeating a call leaves the same state.
    pub fn put(&self, id: u64, fields: &FieldMap) -> Result<()> {
        let batch = WriteBatch::new()
            .write_fields(record_key(id), fields.clone())
            .add_to_set(INDEX_KEY, id.to_string());

        retry_once("write menu record", || self.backend.commit(batch.clone()))
            .map_err(MenuError::into_unavailable)
    }

    /// Fields of record `id`, or `None` when it has none
    pub fn get(&self, id: u64) -> Result<Option<FieldMap>> {
        let key = record_key(id);
        let fields = retry_once("read menu record", || self.backend.read_fields(&key))
            .map_err(MenuError::into_unavailable)?;

        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    /// Every id ever committed through `put`
    pub fn list_ids(&self) -> Result<BTreeSet<u64>> {
        let members = retry_once("read menu index", || self.backend.set_members(INDEX_KEY))
            .map_err(MenuError::into_unavailable)?;

        members
            .iter()
            .map(|member| {
                member.parse::<u64>().map_err(|e| {
                    MenuError::StorageUnavailable(format!(
                        "index member {:?} is not a menu id: {}",
                        member, e
                    ))
                })
            })
            .collect()
    }
}
