//! Agent session: one connection, request/response primitives on top of it
//!
//! The protocol has no request identifiers, so every caller must finish
//! reading a reply before issuing the next command. `Session` takes `&mut self`
//! everywhere to make that ordering the only one expressible.

use crate::error::{ClientError, Result};
use crate::protocol::{Direction, READ_CHUNK};
use crate::protocol_core::{
    build_command_line, decode_text_reply, find_sentinel, parse_size_header,
};
use crate::url::Endpoint;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

pub struct Session<S> {
    stream: S,
}

impl Session<TcpStream> {
    /// Open the single connection to the agent.
    ///
    /// Every failure here is `Connect`; there is no retry.
    pub fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self> {
        let addr = Endpoint::new(host, port).addr();
        let connect_err = |source: io::Error| ClientError::Connect {
            addr: addr.clone(),
            source,
        };
        let candidates = addr.to_socket_addrs().map_err(connect_err)?;
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for sa in candidates {
            match TcpStream::connect_timeout(&sa, connect_timeout) {
                Ok(stream) => {
                    tune_socket(&stream, read_timeout).map_err(connect_err)?;
                    return Ok(Self { stream });
                }
                Err(e) => last_err = e,
            }
        }
        Err(connect_err(last_err))
    }

    /// Shut the connection down in both directions.
    pub fn close(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

// Small request/response exchanges: disable Nagle, bound every read
fn tune_socket(stream: &TcpStream, read_timeout: Duration) -> io::Result<()> {
    let _ = stream.set_nodelay(true);
    stream.set_read_timeout(Some(read_timeout))
}

impl<S: Read + Write> Session<S> {
    /// Wrap an already connected stream. The caller owns any timeout setup.
    pub fn from_stream(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write `<verb> <args...>\n` as one line.
    pub fn send_command(&mut self, verb: &str, args: &[&str]) -> Result<()> {
        let line = build_command_line(verb, args)?;
        self.write_all(&line)
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).map_err(ClientError::from_write)?;
        self.stream.flush().map_err(ClientError::from_write)
    }

    /// Read a NUL-terminated reply and return its text without the sentinel.
    pub fn read_text_reply(&mut self) -> Result<String> {
        let mut reply = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = self.read_some(&mut chunk)?;
            if n == 0 {
                return Err(ClientError::ConnectionClosed);
            }
            reply.extend_from_slice(&chunk[..n]);
            if find_sentinel(&reply).is_some() {
                return Ok(decode_text_reply(&reply));
            }
        }
    }

    /// Read exactly `n` bytes.
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut got = 0;
        while got < n {
            let r = self.read_some(&mut buf[got..])?;
            if r == 0 {
                if got == 0 {
                    return Err(ClientError::ConnectionClosed);
                }
                return Err(ClientError::ShortRead { expected: n, got });
            }
            got += r;
        }
        Ok(buf)
    }

    /// Read the size header that precedes a payload in `direction`.
    pub fn read_size_header(&mut self, direction: Direction) -> Result<u64> {
        let bytes = self.read_exact(direction.header_width())?;
        parse_size_header(direction, &bytes)
    }

    /// One bounded read, decoded as text. Used for the unframed upload ack.
    pub fn read_chunk(&mut self) -> Result<String> {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.read_some(&mut chunk)?;
        if n == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(String::from_utf8_lossy(&chunk[..n]).into_owned())
    }

    /// A single read; `Ok(0)` means the agent closed the stream.
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ClientError::from_read(e)),
            }
        }
    }
}
