//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{MenuError, Result};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (recovery stops at the first one)
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the WAL was (or, for `verify`, would be) truncated
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read valid entries in order
    /// 2. Stop at the first torn or corrupted frame
    /// 3. Truncate the file to the end of the last valid entry
    /// 4. Return the valid entries
    ///
    /// Nothing after a bad frame is replayed: skipping a lost counter update
    /// could let an id be issued twice.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let (result, valid_len) = Self::scan(path, |entry| entries.push(entry))?;

        if result.was_truncated {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                path = %path.display(),
                valid_len,
                corrupted = result.entries_corrupted,
                "Truncated WAL after last valid entry"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path, |_| {}).map(|(result, _)| result)
    }

    fn scan(path: &Path, mut on_entry: impl FnMut(WalEntry)) -> Result<(RecoveryResult, u64)> {
        let mut result = RecoveryResult::default();
        if !path.exists() {
            return Ok((result, 0));
        }

        let mut reader = WalReader::open(path)?;
        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    on_entry(entry);
                }
                Ok(None) => {
                    result.was_truncated = reader.hit_torn_tail();
                    break;
                }
                Err(MenuError::WalCorruption(reason)) => {
                    tracing::warn!(path = %path.display(), %reason, "Corrupted WAL entry");
                    result.entries_corrupted += 1;
                    result.was_truncated = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        Ok((result, reader.position()))
    }
}
