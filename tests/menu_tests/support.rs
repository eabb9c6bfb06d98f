//! Shared test backends for the menu layer

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use menukv::config::{Config, WalSyncStrategy};
use menukv::engine::Engine;
use menukv::kv::{FieldMap, Keyspace, KvBackend};
use menukv::wal::Operation;
use menukv::{MenuError, Result};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Engine on a fresh temp directory
pub fn temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build();
    let engine = Engine::open(config).unwrap();
    (temp_dir, engine)
}

/// In-memory backend that fails on demand
///
/// Uses the default, non-atomic `commit`, so a failure injected on
/// `add_to_set` leaves the record's fields written without an index entry.
/// Each `fail_*` counter is the number of upcoming calls of that kind that
/// fail with `StorageUnavailable`.
#[derive(Default)]
pub struct FlakyBackend {
    keyspace: Mutex<Keyspace>,
    pub fail_increments: AtomicUsize,
    pub fail_writes: AtomicUsize,
    pub fail_set_adds: AtomicUsize,
    pub fail_reads: AtomicUsize,
    pub increments: AtomicUsize,
    pub writes: AtomicUsize,
}

impl FlakyBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_increments(&self, n: usize) {
        self.fail_increments.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_set_adds(&self, n: usize) {
        self.fail_set_adds.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_reads(&self, n: usize) {
        self.fail_reads.store(n, Ordering::SeqCst);
    }

    /// Write a hash directly, bypassing failure injection
    pub fn put_raw_fields(&self, key: &str, fields: FieldMap) {
        self.keyspace
            .lock()
            .apply(&Operation::WriteFields {
                key: key.to_string(),
                fields,
            })
            .unwrap();
    }

    /// Add a set member directly, bypassing failure injection
    pub fn put_raw_member(&self, key: &str, member: &str) {
        self.keyspace
            .lock()
            .apply(&Operation::AddToSet {
                key: key.to_string(),
                member: member.to_string(),
            })
            .unwrap();
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.keyspace.lock().contains_key(key)
    }

    fn injected(counter: &AtomicUsize, what: &str) -> Result<()> {
        let hit = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hit {
            Err(MenuError::StorageUnavailable(format!("injected {} failure", what)))
        } else {
            Ok(())
        }
    }
}

impl KvBackend for FlakyBackend {
    fn increment(&self, counter_key: &str) -> Result<u64> {
        Self::injected(&self.fail_increments, "increment")?;
        let mut keyspace = self.keyspace.lock();
        let next = keyspace.counter(counter_key)? + 1;
        keyspace.apply(&Operation::Incr {
            key: counter_key.to_string(),
            value: next,
        })?;
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(next)
    }

    fn write_fields(&self, key: &str, fields: &FieldMap) -> Result<()> {
        Self::injected(&self.fail_writes, "write")?;
        self.keyspace.lock().apply(&Operation::WriteFields {
            key: key.to_string(),
            fields: fields.clone(),
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_fields(&self, key: &str) -> Result<FieldMap> {
        Self::injected(&self.fail_reads, "read")?;
        Ok(self.keyspace.lock().hash(key)?.cloned().unwrap_or_default())
    }

    fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool> {
        Self::injected(&self.fail_set_adds, "set add")?;
        let mut keyspace = self.keyspace.lock();
        let new = !keyspace
            .set(set_key)?
            .map_or(false, |members| members.contains(member));
        keyspace.apply(&Operation::AddToSet {
            key: set_key.to_string(),
            member: member.to_string(),
        })?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(new)
    }

    fn set_members(&self, set_key: &str) -> Result<BTreeSet<String>> {
        Self::injected(&self.fail_reads, "read")?;
        Ok(self.keyspace.lock().set(set_key)?.cloned().unwrap_or_default())
    }
}
