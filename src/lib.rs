//! # menukv
//!
//! A durable weekly-menu record service with:
//! - An identifier allocator backed by a durable atomic counter
//! - A record store keeping records and their id index consistent
//! - A key-value engine with Write-Ahead Logging (WAL) and snapshots
//! - Crash recovery with partial write handling
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    MenuService                               │
//! │            (CreateMenu / GetMenu / ListMenus)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ IdAllocator │          │ RecordStore │
//!   │  (counter)  │          │(hash + set) │
//!   └──────┬──────┘          └──────┬──────┘
//!          └────────────┬────────────┘
//!                       ▼  KvBackend
//!          ┌─────────────────────────┐
//!          │         Engine          │
//!          │ WAL → Keyspace (RwLock) │
//!          │     → Snapshot          │
//!          └─────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod kv;
pub mod storage;
pub mod engine;
pub mod menu;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MenuError, Result};
pub use config::Config;
pub use engine::Engine;
pub use kv::KvBackend;
pub use menu::{MenuService, NewWeekMenu, WeekMenu};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of menukv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
