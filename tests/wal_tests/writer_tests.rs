//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing, including across reopen and truncate
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Integration with reader

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use menukv::config::WalSyncStrategy;
use menukv::wal::{Operation, WalReader, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn incr(value: u64) -> Operation {
    Operation::Incr {
        key: "counter".to_string(),
        value,
    }
}

fn read_all(path: &PathBuf) -> Vec<u64> {
    WalReader::open(path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(incr(1)).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 2);
    assert_eq!(writer.last_lsn(), 1);
    assert_eq!(writer.entries_since_truncate(), 1);
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsns: Vec<u64> = (1..=5).map(|v| writer.append(incr(v)).unwrap()).collect();

    assert_eq!(lsns, vec![1, 2, 3, 4, 5]);
    assert_eq!(read_all(&wal_path), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_new_writer_starts_at_one() {
    let (_temp, wal_path) = setup_temp_wal();

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.current_lsn(), 1);
    assert_eq!(writer.last_lsn(), 0);
    assert!(wal_path.exists());
}

// =============================================================================
// Reopen / Truncate Tests
// =============================================================================

#[test]
fn test_reopen_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(incr(1)).unwrap();
        writer.append(incr(2)).unwrap();
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.entries_since_truncate(), 2);
    assert_eq!(writer.append(incr(3)).unwrap(), 3);

    assert_eq!(read_all(&wal_path), vec![1, 2, 3]);
}

#[test]
fn test_truncate_keeps_lsn_increasing() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(incr(1)).unwrap();
    writer.append(incr(2)).unwrap();
    writer.truncate().unwrap();

    assert_eq!(writer.entries_since_truncate(), 0);
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), 0);

    assert_eq!(writer.append(incr(3)).unwrap(), 3);
    assert_eq!(read_all(&wal_path), vec![3]);
}

#[test]
fn test_with_start_lsn_never_goes_backwards() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite)
        .unwrap()
        .with_start_lsn(100);
    assert_eq!(writer.append(incr(1)).unwrap(), 100);

    let writer = writer.with_start_lsn(50);
    assert_eq!(writer.current_lsn(), 101);
}

#[test]
fn test_open_cuts_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(incr(1)).unwrap();
    }
    let clean_len = std::fs::metadata(&wal_path).unwrap().len();

    // Simulate a crash half-way through the next frame
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[7u8; 9]).unwrap();
    drop(file);

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(std::fs::metadata(&wal_path).unwrap().len(), clean_len);

    assert_eq!(writer.append(incr(2)).unwrap(), 2);
    assert_eq!(read_all(&wal_path), vec![1, 2]);
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_n_entries_is_readable_before_sync() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 100 }).unwrap();
    for v in 1..=3 {
        writer.append(incr(v)).unwrap();
    }

    // Data is handed to the OS on every append even without fsync
    assert_eq!(read_all(&wal_path), vec![1, 2, 3]);

    writer.sync().unwrap();
    assert_eq!(read_all(&wal_path), vec![1, 2, 3]);
}
