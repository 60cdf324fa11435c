//! Blocking client
//!
//! Speaks the wire protocol over one TCP connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{Result, StashError};
use crate::protocol::{read_response, write_command, Command, Response, Status};
use crate::snapshot::decode_entry;
use crate::store::Entry;

/// Client connection to a StashKV server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a raw command and wait for its response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Get an object; `None` if the key is absent
    pub fn get(&mut self, key: &str) -> Result<Option<Entry>> {
        let response = self.send(&Command::Get {
            key: key.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(Some(decode_entry(response.payload.as_deref().unwrap_or(&[]))?)),
            Status::NotFound => Ok(None),
            _ => Err(remote_error(&response)),
        }
    }

    /// Store an object
    pub fn put(
        &mut self,
        key: &str,
        payload: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Result<()> {
        let response = self.send(&Command::Put {
            key: key.to_string(),
            entry: Entry::new(payload, content_type),
        })?;
        expect_ok(&response)
    }

    /// Delete an object; `false` if the key was absent
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        let response = self.send(&Command::Delete {
            key: key.to_string(),
        })?;
        match response.status {
            Status::Ok => Ok(true),
            Status::NotFound => Ok(false),
            _ => Err(remote_error(&response)),
        }
    }

    /// List all keys on the server
    pub fn keys(&mut self) -> Result<Vec<String>> {
        let response = self.send(&Command::Keys)?;
        expect_ok(&response)?;
        Ok(bincode::deserialize(response.payload.as_deref().unwrap_or(&[]))?)
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        let response = self.send(&Command::Ping)?;
        expect_ok(&response)
    }
}

fn expect_ok(response: &Response) -> Result<()> {
    match response.status {
        Status::Ok => Ok(()),
        _ => Err(remote_error(response)),
    }
}

fn remote_error(response: &Response) -> StashError {
    StashError::Server(format!("{:?}: {}", response.status, response.message()))
}
