//! Engine Module
//!
//! The durable key-value engine that coordinates all components.
//!
//! ## Responsibilities
//! - Implement [`KvBackend`] on top of the WAL and the in-memory keyspace
//! - Handle concurrent read/write access with bounded lock waits
//! - Checkpoint the keyspace and truncate the WAL when it grows
//! - Manage crash recovery on startup

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard};

use crate::config::Config;
use crate::error::{MenuError, Result};
use crate::kv::{BatchOp, FieldMap, Keyspace, KvBackend, WriteBatch};
use crate::storage::{Snapshot, SnapshotInfo};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// The durable key-value engine
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (increment/write_fields/add_to_set/commit/checkpoint):
///   serialized by the `wal` mutex
///   - Must acquire: wal → keyspace (read) → build + check → append
///     (keyspace unlocked) → keyspace (write) → apply
///   - An operation that fails its check or its append is never applied;
///     an appended operation is always applied before the wal lock is released
///
/// - **Reads** (read_fields/set_members): keyspace read lock only, so they
///   never wait on a WAL append or fsync
///
/// Waits for the wal lock and for keyspace reads are bounded by
/// `storage_timeout`; on expiry the call fails with `StorageUnavailable`
/// before anything is logged.
pub struct Engine {
    /// Engine configuration
    config: Config,

    wal_path: PathBuf,

    snapshot_path: PathBuf,

    /// Write-ahead log; holding this lock makes the caller the single writer
    wal: Mutex<WalWriter>,

    /// Current state of every key
    keyspace: RwLock<Keyspace>,

    timeout: Duration,
}

impl Engine {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SNAPSHOT_FILENAME: &'static str = "snapshot.db";

    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Open/create data directory
    /// 2. Load the last snapshot, if any
    /// 3. Recover the WAL and replay entries newer than the snapshot
    /// 4. Checkpoint recovered entries so the WAL starts empty
    /// 5. Ready to serve requests
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let snapshot_path = config.data_dir.join(Self::SNAPSHOT_FILENAME);

        // A leftover temp file is an unfinished checkpoint
        let stale_tmp = snapshot_path.with_extension("tmp");
        if stale_tmp.exists() {
            fs::remove_file(&stale_tmp)?;
        }

        // Step 2: Load snapshot
        let (snapshot_lsn, mut keyspace) = match Snapshot::load(&snapshot_path)? {
            Some((lsn, keyspace)) => {
                tracing::info!(lsn, keys = keyspace.len(), "Loaded snapshot");
                (lsn, keyspace)
            }
            None => (0, Keyspace::new()),
        };

        // Step 3: Recover WAL and replay what the snapshot does not cover
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;
        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                last_lsn = recovery.last_lsn,
                truncated = recovery.was_truncated,
                "WAL recovery"
            );
        }

        let mut last_lsn = snapshot_lsn;
        let mut replayed = 0u64;
        for entry in entries {
            if entry.lsn <= snapshot_lsn {
                continue;
            }
            keyspace.apply(&entry.operation).map_err(|e| {
                MenuError::Storage(format!("Replay of lsn {} failed: {}", entry.lsn, e))
            })?;
            last_lsn = entry.lsn;
            replayed += 1;
        }

        let mut wal = WalWriter::open(&wal_path, config.wal_sync_strategy)?
            .with_start_lsn(last_lsn.max(recovery.last_lsn) + 1);

        // Step 4: Make recovered data durable in a snapshot, then start a fresh log
        if recovery.entries_recovered > 0 {
            let info = Snapshot::write(&snapshot_path, last_lsn, &keyspace)?;
            wal.truncate()?;
            tracing::info!(
                replayed,
                lsn = info.lsn,
                keys = info.key_count,
                "Checkpointed recovered entries"
            );
        }

        let timeout = config.storage_timeout();

        Ok(Self {
            config,
            wal_path,
            snapshot_path,
            wal: Mutex::new(wal),
            keyspace: RwLock::new(keyspace),
            timeout,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Snapshot the keyspace and truncate the WAL
    ///
    /// Returns `None` when the WAL is already empty.
    pub fn checkpoint(&self) -> Result<Option<SnapshotInfo>> {
        let mut wal = self.lock_wal()?;
        self.checkpoint_locked(&mut wal)
    }

    /// Block every write until the returned guard is dropped
    ///
    /// Syncs the WAL first, so the data directory can be copied while the
    /// guard is held. Reads keep working; writes wait up to the storage
    /// timeout and then fail with `StorageUnavailable`.
    pub fn freeze_writes(&self) -> Result<WriteFreeze<'_>> {
        let mut wal = self.lock_wal()?;
        wal.sync()?;
        tracing::info!(lsn = wal.last_lsn(), "Writes frozen");
        Ok(WriteFreeze { _wal: wal })
    }

    /// Close the engine gracefully
    ///
    /// Checkpoints pending WAL entries and syncs to disk
    pub fn close(self) -> Result<()> {
        let mut wal = self.lock_wal()?;
        self.checkpoint_locked(&mut wal)?;
        wal.sync()?;
        Ok(())
    }

    // =========================================================================
    // Write Path
    // =========================================================================

    /// Run one logged write
    ///
    /// `build` inspects the current keyspace and returns the operation to log
    /// (or `None` when there is nothing to change) plus the caller's result.
    ///
    /// Holding the WAL mutex makes this the only writer, so the keyspace seen
    /// by `build` cannot change before `apply`. Readers are only excluded
    /// while the operation is applied, never during the append or its fsync.
    fn write<R>(
        &self,
        build: impl FnOnce(&Keyspace) -> Result<(Option<Operation>, R)>,
    ) -> Result<R> {
        let mut wal = self.lock_wal()?;

        let (op, out) = {
            let keyspace = self.read_keyspace()?;
            let (op, out) = build(&keyspace)?;
            if let Some(op) = &op {
                keyspace.check(op)?;
            }
            (op, out)
        };

        let Some(op) = op else {
            return Ok(out);
        };

        wal.append(op.clone())?;

        // The entry is durable; it must become visible before the WAL lock is
        // released. Readers hold the keyspace lock only for a lookup or a
        // clone, so this wait is short.
        self.keyspace.write().apply(&op)?;

        if wal.entries_since_truncate() >= self.config.checkpoint_threshold {
            // The write is already durable in the WAL; a failed checkpoint
            // only means the log keeps growing until the next attempt.
            if let Err(e) = self.checkpoint_locked(&mut wal) {
                tracing::warn!(error = %e, "Automatic checkpoint failed");
            }
        }

        Ok(out)
    }

    /// Checkpoint implementation (called with the WAL lock held)
    fn checkpoint_locked(&self, wal: &mut WalWriter) -> Result<Option<SnapshotInfo>> {
        if wal.entries_since_truncate() == 0 {
            return Ok(None);
        }

        let keyspace = self.read_keyspace()?.clone();
        let info = Snapshot::write(&self.snapshot_path, wal.last_lsn(), &keyspace)?;
        wal.truncate()?;

        tracing::debug!(
            lsn = info.lsn,
            keys = info.key_count,
            bytes = info.file_size,
            "Checkpoint written"
        );
        Ok(Some(info))
    }

    // =========================================================================
    // Lock Helpers
    // =========================================================================

    fn lock_wal(&self) -> Result<MutexGuard<'_, WalWriter>> {
        self.wal
            .try_lock_for(self.timeout)
            .ok_or_else(|| self.timed_out("WAL lock"))
    }

    fn read_keyspace(&self) -> Result<RwLockReadGuard<'_, Keyspace>> {
        self.keyspace
            .try_read_for(self.timeout)
            .ok_or_else(|| self.timed_out("keyspace read lock"))
    }

    fn timed_out(&self, what: &str) -> MenuError {
        MenuError::StorageUnavailable(format!(
            "timed out after {}ms waiting for {}",
            self.timeout.as_millis(),
            what
        ))
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// Path of the snapshot file
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Number of keys in the keyspace
    pub fn key_count(&self) -> Result<usize> {
        Ok(self.read_keyspace()?.len())
    }

    /// WAL entries not yet covered by a snapshot
    pub fn wal_entries(&self) -> Result<u64> {
        Ok(self.lock_wal()?.entries_since_truncate())
    }

    /// LSN of the most recent logged write
    pub fn last_lsn(&self) -> Result<u64> {
        Ok(self.lock_wal()?.last_lsn())
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

/// Guard returned by [`Engine::freeze_writes`]
pub struct WriteFreeze<'a> {
    _wal: MutexGuard<'a, WalWriter>,
}

impl Drop for WriteFreeze<'_> {
    fn drop(&mut self) {
        tracing::info!("Writes resumed");
    }
}

impl KvBackend for Engine {
    fn increment(&self, counter_key: &str) -> Result<u64> {
        self.write(|keyspace| {
            let next = keyspace.counter(counter_key)?.checked_add(1).ok_or_else(|| {
                MenuError::Storage(format!("Counter {} overflowed", counter_key))
            })?;
            let op = Operation::Incr {
                key: counter_key.to_string(),
                value: next,
            };
            Ok((Some(op), next))
        })
    }

    fn write_fields(&self, key: &str, fields: &FieldMap) -> Result<()> {
        self.write(|_| {
            let op = Operation::WriteFields {
                key: key.to_string(),
                fields: fields.clone(),
            };
            Ok((Some(op), ()))
        })
    }

    fn read_fields(&self, key: &str) -> Result<FieldMap> {
        let keyspace = self.read_keyspace()?;
        Ok(keyspace.hash(key)?.cloned().unwrap_or_default())
    }

    fn add_to_set(&self, set_key: &str, member: &str) -> Result<bool> {
        self.write(|keyspace| {
            let present = keyspace
                .set(set_key)?
                .map_or(false, |members| members.contains(member));
            if present {
                return Ok((None, false));
            }
            let op = Operation::AddToSet {
                key: set_key.to_string(),
                member: member.to_string(),
            };
            Ok((Some(op), true))
        })
    }

    fn set_members(&self, set_key: &str) -> Result<BTreeSet<String>> {
        let keyspace = self.read_keyspace()?;
        Ok(keyspace.set(set_key)?.cloned().unwrap_or_default())
    }

    /// Logs the whole batch as one WAL entry and applies it under one lock
    fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let ops = batch
            .into_ops()
            .into_iter()
            .map(|op| match op {
                BatchOp::WriteFields { key, fields } => Operation::WriteFields { key, fields },
                BatchOp::AddToSet { key, member } => Operation::AddToSet { key, member },
            })
            .collect();

        self.write(|_| Ok((Some(Operation::Batch(ops)), ())))
    }
}
