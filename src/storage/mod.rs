//! Storage Module
//!
//! Checkpoints of the keyspace, so the WAL can be truncated.
//!
//! ## Responsibilities
//! - Persist the full keyspace together with the LSN it covers
//! - Replace the previous checkpoint atomically (write temp file, rename)
//! - Detect torn or corrupted checkpoint files on load
//!
//! ## File Format (V1)
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header                                 │
//! │ ┌──────────┬──────────┬──────┬───────┐ │
//! │ │Magic (4) │Version(2)│LSN(8)│Len(8) │ │
//! │ └──────────┴──────────┴──────┴───────┘ │
//! ├────────────────────────────────────────┤
//! │ Body: bincode-encoded Keyspace (Len)   │
//! ├────────────────────────────────────────┤
//! │ Footer                                 │
//! │ ┌────────────────────────────────────┐ │
//! │ │ CRC32 of body (4)                  │ │
//! │ └────────────────────────────────────┘ │
//! └────────────────────────────────────────┘
//! ```

mod snapshot;

pub use snapshot::{Snapshot, SnapshotInfo};

/// Magic bytes at the start of every snapshot file
pub const MAGIC: &[u8; 4] = b"MNKV";

/// Current snapshot format version
pub const VERSION: u16 = 1;

/// Magic (4) + Version (2) + LSN (8) + Len (8)
pub const HEADER_SIZE: usize = 22;

/// CRC32 (4)
pub const FOOTER_SIZE: usize = 4;
