//! Keyspace snapshots
//!
//! Writes the whole keyspace to a checkpoint file and loads it back.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{MenuError, Result};
use crate::kv::Keyspace;

use super::{FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Metadata about a written snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// File path
    pub path: PathBuf,
    /// Every WAL entry up to this LSN is contained in the snapshot
    pub lsn: u64,
    /// Number of keys
    pub key_count: usize,
    /// File size in bytes
    pub file_size: u64,
}

/// Snapshot file reader/writer
pub struct Snapshot;

impl Snapshot {
    /// Write `keyspace` as the snapshot at `path`, covering WAL up to `lsn`
    ///
    /// The file is written next to `path` with a `.tmp` extension, fsynced and
    /// renamed into place, so `path` always holds either the previous or the
    /// new complete snapshot.
    pub fn write(path: &Path, lsn: u64, keyspace: &Keyspace) -> Result<SnapshotInfo> {
        let body = bincode::serialize(keyspace)?;
        let crc = crc32fast::hash(&body);

        let tmp_path = path.with_extension("tmp");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(file);

        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&lsn.to_le_bytes())?;
        writer.write_all(&(body.len() as u64).to_le_bytes())?;
        writer.write_all(&body)?;
        writer.write_all(&crc.to_le_bytes())?;
        writer.flush()?;

        let file = writer
            .into_inner()
            .map_err(|e| MenuError::Storage(format!("Failed to flush snapshot: {}", e)))?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&tmp_path, path)?;
        Self::sync_parent(path);

        Ok(SnapshotInfo {
            path: path.to_path_buf(),
            lsn,
            key_count: keyspace.len(),
            file_size,
        })
    }

    /// Load the snapshot at `path`
    ///
    /// Returns `Ok(None)` when no snapshot exists. A snapshot that fails
    /// validation is an error: silently starting empty would reset the id
    /// counter.
    pub fn load(path: &Path) -> Result<Option<(u64, Keyspace)>> {
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(path)?;
        if bytes.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(MenuError::Storage(format!(
                "Snapshot too short: {} bytes",
                bytes.len()
            )));
        }

        if &bytes[0..4] != MAGIC {
            return Err(MenuError::Storage(format!(
                "Invalid snapshot magic: expected MNKV, got {:?}",
                &bytes[0..4]
            )));
        }

        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(MenuError::Storage(format!(
                "Unsupported snapshot version: {}",
                version
            )));
        }

        let lsn = read_u64(&bytes[6..14]);
        let body_len = read_u64(&bytes[14..22]) as usize;

        let expected_len = body_len
            .checked_add(HEADER_SIZE + FOOTER_SIZE)
            .filter(|&n| n == bytes.len());
        if expected_len.is_none() {
            return Err(MenuError::Storage(format!(
                "Snapshot length mismatch: header says {} body bytes, file has {}",
                body_len,
                bytes.len().saturating_sub(HEADER_SIZE + FOOTER_SIZE)
            )));
        }

        let body = &bytes[HEADER_SIZE..HEADER_SIZE + body_len];
        let footer = &bytes[HEADER_SIZE + body_len..];
        let expected_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let actual_crc = crc32fast::hash(body);
        if expected_crc != actual_crc {
            return Err(MenuError::Storage(format!(
                "Snapshot CRC mismatch: expected {:08x}, got {:08x}",
                expected_crc, actual_crc
            )));
        }

        let keyspace: Keyspace = bincode::deserialize(body)?;
        Ok(Some((lsn, keyspace)))
    }

    /// Persist the rename itself (best effort; not every platform can open
    /// a directory for syncing)
    fn sync_parent(path: &Path) {
        if let Some(parent) = path.parent() {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
