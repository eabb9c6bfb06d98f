//! Configuration for menukv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a menukv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log          (write-ahead log)
    ///     └── snapshot.db      (last checkpoint of the keyspace)
    pub data_dir: PathBuf,

    /// Upper bound for any single storage call (lock waits included)
    pub storage_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    ///
    /// With `EveryNEntries`, writes acknowledged since the last fsync can be
    /// lost in an OS crash, and counter values handed out in that window are
    /// issued again after restart.
    pub wal_sync_strategy: WalSyncStrategy,

    /// WAL entries accumulated before a checkpoint truncates the log
    pub checkpoint_threshold: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Threads serving client connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./menukv_data"),
            storage_timeout_ms: 2000,
            wal_sync_strategy: WalSyncStrategy::EveryWrite,
            checkpoint_threshold: 10_000,
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 1024,
            worker_threads: 8,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Storage timeout as a `Duration`
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.storage_timeout_ms)
    }

    /// Check values that would make the engine or server unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.storage_timeout_ms == 0 {
            return Err(crate::MenuError::Config(
                "storage_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.checkpoint_threshold == 0 {
            return Err(crate::MenuError::Config(
                "checkpoint_threshold must be greater than zero".to_string(),
            ));
        }
        if self.worker_threads == 0 {
            return Err(crate::MenuError::Config(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(crate::MenuError::Config(
                "EveryNEntries sync count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the storage call timeout (in milliseconds)
    pub fn storage_timeout_ms(mut self, ms: u64) -> Self {
        self.config.storage_timeout_ms = ms;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set how many WAL entries trigger a checkpoint
    pub fn checkpoint_threshold(mut self, entries: u64) -> Self {
        self.config.checkpoint_threshold = entries;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
