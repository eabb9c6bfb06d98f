//! Tests for WAL Reader
//!
//! These tests verify:
//! - Reading entries from WAL file
//! - Iterator functionality
//! - Partial write handling
//! - Empty file handling

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use menukv::wal::{Operation, WalEntry, WalReader};
use menukv::MenuError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn add(lsn: u64, member: &str) -> WalEntry {
    WalEntry::new(
        lsn,
        Operation::AddToSet {
            key: "menus:all_ids".to_string(),
            member: member.to_string(),
        },
    )
}

fn write_bytes(path: &PathBuf, bytes: &[u8]) {
    let mut file = File::create(path).unwrap();
    file.write_all(bytes).unwrap();
    file.sync_all().unwrap();
}

fn frames(entries: &[WalEntry]) -> Vec<u8> {
    entries
        .iter()
        .flat_map(|e| e.serialize().unwrap())
        .collect()
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();

    assert!(reader.next_entry().unwrap().is_none());
    assert!(!reader.hit_torn_tail());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    let entries = vec![add(1, "1"), add(2, "2"), add(3, "3")];
    let bytes = frames(&entries);
    write_bytes(&wal_path, &bytes);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for expected in &entries {
        assert_eq!(reader.next_entry().unwrap().as_ref(), Some(expected));
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), bytes.len() as u64);
}

#[test]
fn test_iterator_collects_all() {
    let (_temp, wal_path) = setup_temp_wal();
    write_bytes(&wal_path, &frames(&[add(1, "a"), add(2, "b")]));

    let lsns: Vec<u64> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .map(|e| e.unwrap().lsn)
        .collect();

    assert_eq!(lsns, vec![1, 2]);
}

#[test]
fn test_open_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();
    assert!(matches!(WalReader::open(&wal_path), Err(MenuError::Io(_))));
}

// =============================================================================
// Partial Write / Corruption Tests
// =============================================================================

#[test]
fn test_torn_header_ends_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = frames(&[add(1, "1")]);
    let valid_len = bytes.len() as u64;
    bytes.extend_from_slice(&[1, 2, 3]);
    write_bytes(&wal_path, &bytes);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(reader.next_entry().unwrap().is_none());
    assert!(reader.hit_torn_tail());
    assert_eq!(reader.position(), valid_len);
}

#[test]
fn test_torn_data_ends_iteration() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = frames(&[add(1, "1"), add(2, "2")]);
    bytes.truncate(bytes.len() - 2);
    write_bytes(&wal_path, &bytes);

    let entries: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].as_ref().unwrap().lsn, 1);
}

#[test]
fn test_crc_mismatch_reported() {
    let (_temp, wal_path) = setup_temp_wal();
    let first = add(1, "1").serialize().unwrap();
    let mut second = add(2, "2").serialize().unwrap();
    let last = second.len() - 1;
    second[last] ^= 0x55;

    let mut bytes = first.clone();
    bytes.extend_from_slice(&second);
    write_bytes(&wal_path, &bytes);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(matches!(reader.next_entry(), Err(MenuError::WalCorruption(_))));
    assert_eq!(reader.position(), first.len() as u64);
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = add(1, "1").serialize().unwrap();
    bytes[HEADER_CRC_OFFSET] ^= 0xFF;
    bytes.extend_from_slice(&add(2, "2").serialize().unwrap());
    write_bytes(&wal_path, &bytes);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();

    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

const HEADER_CRC_OFFSET: usize = 8;
