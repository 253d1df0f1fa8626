//! Blocking client for the query protocol.

use std::net::{TcpStream, ToSocketAddrs};

use hostsql::Result;

use crate::protocol::{Request, Response, decode, encode, read_frame, write_frame};

/// A connected protocol client. One request is in flight at a time.
pub struct Client {
    stream: TcpStream,
}

impl Client {
    /// Connect to a running server.
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            stream: TcpStream::connect(addr)?,
        })
    }

    /// Send one query and wait for its response.
    pub fn query(&mut self, sql: &str) -> Result<Response> {
        let request = Request {
            sql: sql.to_owned(),
        };
        write_frame(&mut self.stream, &encode(&request)?)?;
        match read_frame(&mut self.stream)? {
            Some(payload) => decode(&payload),
            None => Err(hostsql::HostError::protocol(
                "server closed the connection mid-request",
            )),
        }
    }
}
