//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{MenuError, Result};

use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
///
/// Each append is handed to the OS immediately; `sync_strategy` only decides
/// when it is fsynced.
pub struct WalWriter {
    path: PathBuf,

    file: File,

    /// Length of the file up to the end of the last complete entry
    len: u64,

    /// LSN the next appended entry will receive
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,

    /// Entries in the file since it was created or last truncated
    entries: u64,

    #[cfg(test)]
    fail_next_sync: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are scanned so LSNs continue where the file left off.
    /// A torn trailing frame is cut off before appending.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let (last_lsn, entries, valid_len) = if path.exists() {
            Self::scan(path)?
        } else {
            (0, 0, 0)
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        if file.metadata()?.len() > valid_len {
            tracing::warn!(
                path = %path.display(),
                valid_len,
                "Cutting torn tail from WAL before appending"
            );
            file.set_len(valid_len)?;
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            len: valid_len,
            next_lsn: last_lsn + 1,
            sync_strategy,
            unsynced: 0,
            entries,
            #[cfg(test)]
            fail_next_sync: false,
        })
    }

    /// Never issue an LSN below `lsn`
    ///
    /// Used after a checkpoint, when the log is empty but earlier LSNs are
    /// already covered by the snapshot.
    pub fn with_start_lsn(mut self, lsn: u64) -> Self {
        self.next_lsn = self.next_lsn.max(lsn);
        self
    }

    /// Append an operation to the WAL, returning its LSN
    ///
    /// When the write or its fsync fails the file is cut back to the previous
    /// entry and no LSN is consumed, so a failed append never resurfaces on
    /// replay.
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = WalEntry::new(lsn, operation).serialize()?;

        if let Err(e) = self.file.write_all(&bytes) {
            self.cut_back();
            return Err(MenuError::WalWrite(format!("append lsn {}: {}", lsn, e)));
        }

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.unsynced + 1 >= count,
        };
        if should_sync {
            if let Err(e) = self.sync_file() {
                self.cut_back();
                return Err(MenuError::WalWrite(format!("fsync lsn {}: {}", lsn, e)));
            }
        }

        self.len += bytes.len() as u64;
        self.next_lsn += 1;
        self.entries += 1;
        self.unsynced = if should_sync { 0 } else { self.unsynced + 1 };

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.sync_file()
            .map_err(|e| MenuError::WalWrite(format!("fsync: {}", e)))?;
        self.unsynced = 0;
        Ok(())
    }

    fn sync_file(&mut self) -> std::io::Result<()> {
        self.injected_sync_failure()?;
        self.file.sync_data()
    }

    #[cfg(test)]
    fn injected_sync_failure(&mut self) -> std::io::Result<()> {
        if std::mem::take(&mut self.fail_next_sync) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected fsync failure",
            ));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn injected_sync_failure(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Drop a partially appended frame
    fn cut_back(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to cut back WAL");
        }
    }

    /// Drop every entry from the file
    ///
    /// LSNs keep increasing across truncation.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        self.file.sync_all()?;
        self.len = 0;
        self.entries = 0;
        self.unsynced = 0;
        Ok(())
    }

    /// Get the current LSN (the one the next append receives)
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// LSN of the most recent append, 0 if nothing was ever written
    pub fn last_lsn(&self) -> u64 {
        self.next_lsn - 1
    }

    /// Entries in the file since creation or the last truncate
    pub fn entries_since_truncate(&self) -> u64 {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns (last lsn, entry count, byte length of the valid prefix)
    fn scan(path: &Path) -> Result<(u64, u64, u64)> {
        let mut reader = WalReader::open(path)?;
        let mut last_lsn = 0;
        let mut entries = 0;
        while let Some(entry) = reader.next_entry()? {
            last_lsn = entry.lsn;
            entries += 1;
        }
        Ok((last_lsn, entries, reader.position()))
    }
}
