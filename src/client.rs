// src/client.rs
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use thiserror::Error;
use tracing::debug;

use crate::arena::{Arena, with_scratch};
use crate::http::{Request, Response, serialize_request};
use crate::parser::{self, ParseError};

/// Upper bound on how much of one response gets read.
pub const RESPONSE_MAX_SIZE: usize = 128 * 1024 * 512;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not resolve '{0}'")]
    Resolve(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Response(#[from] ParseError),
}

/// Send one request to `host:port` and read one response into `arena`.
///
/// The host is resolved to an IPv4 stream address. The request is
/// serialized into the scratch arena and written in one call; the
/// response must arrive in a single read, budgeted at a sixteenth of the
/// arena's remaining space capped at [`RESPONSE_MAX_SIZE`].
pub fn send_request<'a>(
    arena: &'a Arena,
    host: &str,
    port: u16,
    request: &Request<'_>,
) -> Result<Response<'a>, ClientError> {
    let address = (host, port)
        .to_socket_addrs()
        .map_err(|_| ClientError::Resolve(host.to_string()))?
        .find(|candidate| candidate.is_ipv4())
        .ok_or_else(|| ClientError::Resolve(host.to_string()))?;

    let mut stream = TcpStream::connect(address)?;

    with_scratch(|scratch| {
        let wire = serialize_request(scratch, request);
        stream.write_all(wire)
    })?;

    let budget = (arena.remaining() / 16).min(RESPONSE_MAX_SIZE);
    let buffer = arena.alloc_bytes(budget);
    let received = stream.read(buffer)?;
    debug!(bytes = received, "read response");

    Ok(parser::parse_response(arena, &buffer[..received])?)
}
