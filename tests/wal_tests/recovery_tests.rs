//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean WAL (no corruption)
//! - Recovery from an empty or missing WAL
//! - Recovery with partial writes (truncated tail)
//! - Recovery with corrupted entries (CRC mismatch)
//! - Verify mode (stats only, file untouched)

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use menukv::config::WalSyncStrategy;
use menukv::wal::{Operation, WalEntry, WalRecovery, WalWriter};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

/// Write counter entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &PathBuf, count: u64) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for value in 1..=count {
        writer
            .append(Operation::Incr {
                key: "menu:id_counter".to_string(),
                value,
            })
            .unwrap();
    }
}

fn append_raw(path: &PathBuf, bytes: &[u8]) {
    let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert!(!wal_path.exists());
}

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 0);
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_clean_log() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);

    let values: Vec<u64> = entries
        .iter()
        .map(|e| match &e.operation {
            Operation::Incr { value, .. } => *value,
            other => panic!("unexpected operation {:?}", other),
        })
        .collect();
    assert_eq!(values, (1..=10).collect::<Vec<_>>());
}

// =============================================================================
// Recover: Partial Write Tests
// =============================================================================

#[test]
fn test_recover_truncates_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 3);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    let next = WalEntry::new(
        4,
        Operation::Incr {
            key: "menu:id_counter".to_string(),
            value: 4,
        },
    )
    .serialize()
    .unwrap();
    append_raw(&wal_path, &next[..next.len() / 2]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 3);
    assert_eq!(result.last_lsn, 3);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

// =============================================================================
// Recover: Corruption Tests
// =============================================================================

#[test]
fn test_recover_stops_at_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 2);
    let clean_len = fs::metadata(&wal_path).unwrap().len();

    let mut bad = WalEntry::new(
        3,
        Operation::Incr {
            key: "menu:id_counter".to_string(),
            value: 3,
        },
    )
    .serialize()
    .unwrap();
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;
    append_raw(&wal_path, &bad);

    // A valid entry after the damaged one must not be replayed
    let good = WalEntry::new(
        4,
        Operation::Incr {
            key: "menu:id_counter".to_string(),
            value: 4,
        },
    )
    .serialize()
    .unwrap();
    append_raw(&wal_path, &good);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 2);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), clean_len);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 4);
    append_raw(&wal_path, &[0xAB; 5]);
    let len_before = fs::metadata(&wal_path).unwrap().len();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 4);
    assert_eq!(result.last_lsn, 4);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
}

#[test]
fn test_recover_twice_is_stable() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);
    append_raw(&wal_path, &[1, 2, 3]);

    let (_, first) = WalRecovery::recover(&wal_path).unwrap();
    let (entries, second) = WalRecovery::recover(&wal_path).unwrap();

    assert!(first.was_truncated);
    assert!(!second.was_truncated);
    assert_eq!(entries.len(), 5);
    assert_eq!(first.last_lsn, second.last_lsn);
}
