//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::Result;

use super::entry::FrameHeader;
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
///
/// A frame cut short by the end of the file (a torn write) ends iteration
/// with `Ok(None)` and sets [`WalReader::hit_torn_tail`]. A complete frame
/// whose CRC does not match is reported as `WalCorruption`.
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last valid entry
    position: u64,

    torn_tail: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            torn_tail: false,
        })
    }

    /// Read the next entry from the WAL
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        if self.torn_tail {
            return Ok(None);
        }

        let mut header_buf = [0u8; HEADER_SIZE];
        let read = self.read_full(&mut header_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            self.torn_tail = true;
            return Ok(None);
        }

        let header = FrameHeader::parse(&header_buf)?;

        let mut data = vec![0u8; header.len as usize];
        let read = self.read_full(&mut data)?;
        if read < data.len() {
            self.torn_tail = true;
            return Ok(None);
        }

        let entry = WalEntry::decode_data(&header, &data)?;
        self.position += (HEADER_SIZE + data.len()) as u64;
        Ok(Some(entry))
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    /// Byte offset just past the last entry returned
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Whether reading stopped on an incomplete trailing frame
    pub fn hit_torn_tail(&self) -> bool {
        self.torn_tail
    }

    /// Fill `buf` as far as the file allows, returning the bytes read
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}

/// Iterator over WAL entries
///
/// Yields the first error and then stops.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
