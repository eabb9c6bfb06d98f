//! Tests for WAL Entry serialization and deserialization
//!
//! These tests verify:
//! - Frame layout and decoding for every operation type
//! - CRC32 corruption detection
//! - Edge cases (truncation, oversize length, LSN mismatch)

use menukv::kv::FieldMap;
use menukv::wal::{Operation, WalEntry, HEADER_SIZE, MAX_ENTRY_SIZE};
use menukv::MenuError;

fn fields(pairs: &[(&str, &str)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn menu_batch() -> Operation {
    Operation::Batch(vec![
        Operation::WriteFields {
            key: "menu:7".to_string(),
            fields: fields(&[("ID", "7"), ("Name", "Week 7")]),
        },
        Operation::AddToSet {
            key: "menus:all_ids".to_string(),
            member: "7".to_string(),
        },
    ])
}

// =============================================================================
// Decoding Tests
// =============================================================================

#[test]
fn test_decode_incr() {
    let entry = WalEntry::new(
        1,
        Operation::Incr {
            key: "menu:id_counter".to_string(),
            value: 1,
        },
    );

    let bytes = entry.serialize().unwrap();
    let recovered = WalEntry::deserialize(&bytes).unwrap();

    assert_eq!(entry, recovered);
}

#[test]
fn test_decode_nested_batch() {
    let entry = WalEntry::new(42, menu_batch());

    let recovered = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();

    assert_eq!(recovered.operation, menu_batch());
    assert_eq!(recovered.operation.op_count(), 2);
}

#[test]
fn test_decode_empty_field_map() {
    let entry = WalEntry::new(
        3,
        Operation::WriteFields {
            key: "menu:3".to_string(),
            fields: FieldMap::new(),
        },
    );

    let recovered = WalEntry::deserialize(&entry.serialize().unwrap()).unwrap();
    assert_eq!(entry, recovered);
}

#[test]
fn test_header_layout() {
    let entry = WalEntry::new(0x0102030405060708, menu_batch());
    let bytes = entry.serialize().unwrap();

    let lsn = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let crc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;

    assert_eq!(lsn, 0x0102030405060708);
    assert_eq!(len, bytes.len() - HEADER_SIZE);
    assert_eq!(crc, WalEntry::compute_crc(&bytes[HEADER_SIZE..]));
}

#[test]
fn test_timestamp_is_set() {
    let entry = WalEntry::new(1, menu_batch());
    assert!(entry.timestamp > 0);
}

// =============================================================================
// Corruption Detection Tests
// =============================================================================

#[test]
fn test_crc_corruption_detected() {
    let entry = WalEntry::new(1, menu_batch());
    let mut bytes = entry.serialize().unwrap();

    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;

    match WalEntry::deserialize(&bytes) {
        Err(MenuError::WalCorruption(msg)) => assert!(msg.contains("CRC")),
        other => panic!("expected WalCorruption, got {:?}", other),
    }
}

#[test]
fn test_truncated_header_rejected() {
    let entry = WalEntry::new(1, menu_batch());
    let bytes = entry.serialize().unwrap();

    let result = WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]);
    assert!(matches!(result, Err(MenuError::WalCorruption(_))));
}

#[test]
fn test_truncated_data_rejected() {
    let entry = WalEntry::new(1, menu_batch());
    let bytes = entry.serialize().unwrap();

    let result = WalEntry::deserialize(&bytes[..bytes.len() - 3]);
    assert!(matches!(result, Err(MenuError::WalCorruption(_))));
}

#[test]
fn test_oversize_length_rejected() {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[12..16].copy_from_slice(&(MAX_ENTRY_SIZE + 1).to_le_bytes());

    match WalEntry::deserialize(&bytes) {
        Err(MenuError::WalCorruption(msg)) => assert!(msg.contains("exceeds")),
        other => panic!("expected WalCorruption, got {:?}", other),
    }
}

#[test]
fn test_lsn_mismatch_rejected() {
    let entry = WalEntry::new(5, menu_batch());
    let mut bytes = entry.serialize().unwrap();

    // Header LSN no longer matches the LSN inside the CRC-protected data
    bytes[0..8].copy_from_slice(&6u64.to_le_bytes());

    match WalEntry::deserialize(&bytes) {
        Err(MenuError::WalCorruption(msg)) => assert!(msg.contains("LSN mismatch")),
        other => panic!("expected WalCorruption, got {:?}", other),
    }
}
