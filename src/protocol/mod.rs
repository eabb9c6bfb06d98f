//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: CREATE - Payload: menu name (UTF-8)
//! - 0x02: GET    - Payload: id (8)
//! - 0x03: LIST   - Payload: empty
//! - 0x04: PING   - Payload: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK                - menu `id (8) | name`, id list `count (4) | id (8)*`, or `PONG`
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR             - message
//! - 0x03: UNAVAILABLE       - message
//! - 0x04: ALLOCATION_FAILED - message

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_ids, decode_menu, decode_response, encode_command, encode_response,
    read_command, read_response, write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
