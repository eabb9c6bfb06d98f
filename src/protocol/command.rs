//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    CreateMenu = 0x01,
    GetMenu = 0x02,
    ListMenus = 0x03,
    Ping = 0x04,
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(CommandType::CreateMenu),
            0x02 => Ok(CommandType::GetMenu),
            0x03 => Ok(CommandType::ListMenus),
            0x04 => Ok(CommandType::Ping),
            other => Err(other),
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a weekly menu
    CreateMenu { name: String },

    /// Fetch a weekly menu by id
    GetMenu { id: u64 },

    /// List the ids of all menus
    ListMenus,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::CreateMenu { .. } => CommandType::CreateMenu,
            Command::GetMenu { .. } => CommandType::GetMenu,
            Command::ListMenus => CommandType::ListMenus,
            Command::Ping => CommandType::Ping,
        }
    }
}
