//! Command definitions
//!
//! Represents commands from clients.

use crate::store::Entry;

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Put = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    Keys = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get an object by key
    Get { key: String },

    /// Store an object (payload + content type) under a key
    Put { key: String, entry: Entry },

    /// Delete an object by key
    Delete { key: String },

    /// Ping (health check)
    Ping,

    /// List all keys
    Keys,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::Keys => CommandType::Keys,
        }
    }
}
