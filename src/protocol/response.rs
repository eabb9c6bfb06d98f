//! Response definitions
//!
//! Represents responses to clients.

use bytes::{BufMut, BytesMut};

use crate::error::MenuError;
use crate::menu::WeekMenu;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Unavailable = 0x03,
    AllocationFailed = 0x04,
}

impl TryFrom<u8> for Status {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, u8> {
        match byte {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::NotFound),
            0x02 => Ok(Status::Error),
            0x03 => Ok(Status::Unavailable),
            0x04 => Ok(Status::AllocationFailed),
            other => Err(other),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (menu, id list, PONG, or an error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK response carrying a menu: `id (8, BE) | name`
    pub fn menu(menu: &WeekMenu) -> Self {
        let mut buf = BytesMut::with_capacity(8 + menu.name.len());
        buf.put_u64(menu.id);
        buf.put_slice(menu.name.as_bytes());
        Self::ok(Some(buf.to_vec()))
    }

    /// OK response carrying ids: `count (4, BE) | id (8, BE)*`
    pub fn ids(ids: &[u64]) -> Self {
        let mut buf = BytesMut::with_capacity(4 + ids.len() * 8);
        buf.put_u32(ids.len() as u32);
        for id in ids {
            buf.put_u64(*id);
        }
        Self::ok(Some(buf.to_vec()))
    }

    pub fn pong() -> Self {
        Self::ok(Some(b"PONG".to_vec()))
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self::with_message(Status::Error, message)
    }

    pub fn unavailable(message: &str) -> Self {
        Self::with_message(Status::Unavailable, message)
    }

    pub fn allocation_failed(message: &str) -> Self {
        Self::with_message(Status::AllocationFailed, message)
    }

    /// Map a service error onto its status
    pub fn from_error(error: &MenuError) -> Self {
        match error {
            MenuError::NotFound(_) => Self::not_found(),
            MenuError::StorageUnavailable(msg) => Self::unavailable(msg),
            MenuError::AllocationFailed(msg) => Self::allocation_failed(msg),
            other => Self::error(&other.to_string()),
        }
    }

    /// Payload as UTF-8 text, for error statuses
    pub fn message(&self) -> Option<String> {
        self.payload
            .as_ref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
    }

    fn with_message(status: Status, message: &str) -> Self {
        Self {
            status,
            payload: Some(message.as_bytes().to_vec()),
        }
    }
}
