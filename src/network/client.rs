//! TCP Client
//!
//! Blocking client for the menu protocol, used by the CLI and tests.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{MenuError, Result};
use crate::menu::WeekMenu;
use crate::protocol::{decode_ids, decode_menu, read_response, write_command, Command, Response, Status};

/// A connection to a menukv server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to `addr`
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| MenuError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Bound how long a single request may take
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        let stream = self.writer.get_ref();
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// Create a menu, returning it with its assigned id
    pub fn create_menu(&mut self, name: &str) -> Result<WeekMenu> {
        let response = self.call(&Command::CreateMenu {
            name: name.to_string(),
        })?;
        decode_menu(&ok_payload(response)?)
    }

    /// Fetch a menu; `None` when the server has no such id
    pub fn get_menu(&mut self, id: u64) -> Result<Option<WeekMenu>> {
        let response = self.call(&Command::GetMenu { id })?;
        if response.status == Status::NotFound {
            return Ok(None);
        }
        decode_menu(&ok_payload(response)?).map(Some)
    }

    /// Ids of every menu on the server
    pub fn list_menus(&mut self) -> Result<Vec<u64>> {
        let response = self.call(&Command::ListMenus)?;
        decode_ids(&ok_payload(response)?)
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let payload = ok_payload(self.call(&Command::Ping)?)?;
        if payload != b"PONG" {
            return Err(MenuError::Protocol("Unexpected PING reply".to_string()));
        }
        Ok(())
    }

    /// Send one command and wait for its response
    pub fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}

/// Payload of an OK response, or the error its status stands for
fn ok_payload(response: Response) -> Result<Vec<u8>> {
    let message = response.message().unwrap_or_default();
    match response.status {
        Status::Ok => Ok(response.payload.unwrap_or_default()),
        Status::NotFound => Err(MenuError::Protocol(
            "Unexpected NOT_FOUND response".to_string(),
        )),
        Status::Unavailable => Err(MenuError::StorageUnavailable(message)),
        Status::AllocationFailed => Err(MenuError::AllocationFailed(message)),
        Status::Error => Err(MenuError::Network(format!("Server error: {}", message))),
    }
}
