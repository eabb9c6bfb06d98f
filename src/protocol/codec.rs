//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - CREATE: name (UTF-8, rest of payload)
//! - GET:    id (8 bytes)
//! - LIST:   empty
//! - PING:   empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! All integers are big endian.

use std::io::{Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{MenuError, Result};
use crate::menu::WeekMenu;

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = BytesMut::new();
    match command {
        Command::CreateMenu { name } => payload.put_slice(name.as_bytes()),
        Command::GetMenu { id } => payload.put_u64(*id),
        Command::ListMenus | Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (type_byte, payload) = split_frame(bytes, "command")?;

    let cmd_type = CommandType::try_from(type_byte).map_err(|b| {
        MenuError::Protocol(format!("Unknown command type: 0x{:02x}", b))
    })?;

    match cmd_type {
        CommandType::CreateMenu => {
            let name = std::str::from_utf8(payload).map_err(|e| {
                MenuError::Protocol(format!("CREATE command: name is not UTF-8: {}", e))
            })?;
            Ok(Command::CreateMenu {
                name: name.to_string(),
            })
        }
        CommandType::GetMenu => {
            if payload.len() != 8 {
                return Err(MenuError::Protocol(format!(
                    "GET command: expected 8-byte id, got {} bytes",
                    payload.len()
                )));
            }
            let mut buf = payload;
            Ok(Command::GetMenu { id: buf.get_u64() })
        }
        CommandType::ListMenus => {
            expect_empty(payload, "LIST")?;
            Ok(Command::ListMenus)
        }
        CommandType::Ping => {
            expect_empty(payload, "PING")?;
            Ok(Command::Ping)
        }
    }
}

fn expect_empty(payload: &[u8], name: &str) -> Result<()> {
    if !payload.is_empty() {
        return Err(MenuError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.len()
        )));
    }
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = Status::try_from(status_byte).map_err(|b| {
        MenuError::Protocol(format!("Unknown response status: 0x{:02x}", b))
    })?;

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

/// Decode a menu payload: `id (8) | name`
pub fn decode_menu(payload: &[u8]) -> Result<WeekMenu> {
    if payload.len() < 8 {
        return Err(MenuError::Protocol(format!(
            "Menu payload too short: {} bytes",
            payload.len()
        )));
    }

    let mut buf = payload;
    let id = buf.get_u64();
    let name = std::str::from_utf8(buf)
        .map_err(|e| MenuError::Protocol(format!("Menu name is not UTF-8: {}", e)))?
        .to_string();

    Ok(WeekMenu { id, name })
}

/// Decode an id list payload: `count (4) | id (8)*`
pub fn decode_ids(payload: &[u8]) -> Result<Vec<u64>> {
    let mut buf = payload;
    if buf.remaining() < 4 {
        return Err(MenuError::Protocol(
            "Id list payload: missing count".to_string(),
        ));
    }

    let count = buf.get_u32() as usize;
    if buf.remaining() != count * 8 {
        return Err(MenuError::Protocol(format!(
            "Id list payload: {} ids announced, {} bytes follow",
            count,
            buf.remaining()
        )));
    }

    Ok((0..count).map(|_| buf.get_u64()).collect())
}

// =============================================================================
// Framing
// =============================================================================

fn frame(type_byte: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(type_byte);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.to_vec()
}

/// Split a complete frame into its type byte and payload
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(MenuError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let mut header = &bytes[..HEADER_SIZE];
    let type_byte = header.get_u8();
    let payload_len = header.get_u32();
    check_payload_len(payload_len, what)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(MenuError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((type_byte, &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(len: u32, what: &str) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(MenuError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = (&header[1..]).get_u32();
    check_payload_len(payload_len, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader, "command")?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader, "response")?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
