//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their on-disk frame.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};

use crate::error::{MenuError, Result};
use crate::kv::FieldMap;

/// Frame header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest data section accepted when decoding a frame (64 MB)
pub const MAX_ENTRY_SIZE: u32 = 64 * 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Counter at `key` now holds `value`
    ///
    /// The resulting value is logged instead of the delta so replaying an
    /// entry twice leaves the counter unchanged.
    Incr { key: String, value: u64 },

    /// Set the given fields of the hash at `key`
    WriteFields { key: String, fields: FieldMap },

    /// Add `member` to the set at `key`
    AddToSet { key: String, member: String },

    /// Several operations applied as one unit
    Batch(Vec<Operation>),
}

impl Operation {
    /// Number of primitive operations (batches are flattened)
    pub fn op_count(&self) -> usize {
        match self {
            Operation::Batch(ops) => ops.iter().map(Operation::op_count).sum(),
            _ => 1,
        }
    }
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Encode into a framed byte vector
    ///
    /// Layout: `lsn (8) | crc (4) | len (4) | data`, little endian, where
    /// `data` is the bincode encoding of the whole entry.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        let crc = Self::compute_crc(&data);

        let mut frame = Vec::with_capacity(HEADER_SIZE + data.len());
        frame.put_u64_le(self.lsn);
        frame.put_u32_le(crc);
        frame.put_u32_le(data.len() as u32);
        frame.put_slice(&data);
        Ok(frame)
    }

    /// Decode a single framed entry, validating length, CRC and LSN
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::parse(bytes)?;

        let end = HEADER_SIZE + header.len as usize;
        if bytes.len() < end {
            return Err(MenuError::WalCorruption(format!(
                "Truncated entry: expected {} bytes, got {}",
                end,
                bytes.len()
            )));
        }

        Self::decode_data(&header, &bytes[HEADER_SIZE..end])
    }

    /// Validate and decode the data section of a frame
    pub(super) fn decode_data(header: &FrameHeader, data: &[u8]) -> Result<Self> {
        let actual_crc = Self::compute_crc(data);
        if actual_crc != header.crc {
            return Err(MenuError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual_crc
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)
            .map_err(|e| MenuError::WalCorruption(format!("Undecodable entry: {}", e)))?;

        if entry.lsn != header.lsn {
            return Err(MenuError::WalCorruption(format!(
                "LSN mismatch: header says {}, entry says {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }

    /// CRC32 over the data section
    pub fn compute_crc(data: &[u8]) -> u32 {
        crc32fast::hash(data)
    }
}

/// Parsed fixed-size frame header
#[derive(Debug, Clone, Copy)]
pub(super) struct FrameHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(MenuError::WalCorruption(format!(
                "Incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut buf = &bytes[..HEADER_SIZE];
        let lsn = buf.get_u64_le();
        let crc = buf.get_u32_le();
        let len = buf.get_u32_le();

        if len > MAX_ENTRY_SIZE {
            return Err(MenuError::WalCorruption(format!(
                "Entry length {} exceeds maximum {}",
                len, MAX_ENTRY_SIZE
            )));
        }

        Ok(Self { lsn, crc, len })
    }
}
