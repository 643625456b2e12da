//! Framing helpers shared by the session and the transfer engine
//!
//! Everything here is pure: byte slices in, values out. The session owns the
//! actual reads and writes.

use crate::error::{ClientError, Result};
use crate::protocol::{Direction, ERROR_MARKER, REPLY_SENTINEL, SPECIAL_ENTRIES};

/// Build a command line: `<verb> <arg1> <arg2> ...\n`.
///
/// The protocol has no escaping, so an argument containing whitespace is
/// rejected instead of being split on the agent side.
pub fn build_command_line(verb: &str, args: &[&str]) -> Result<Vec<u8>> {
    let mut len = verb.len() + 1;
    for arg in args {
        if arg.is_empty() || arg.chars().any(char::is_whitespace) {
            return Err(ClientError::UnsupportedArgument(arg.to_string()));
        }
        len += arg.len() + 1;
    }
    let mut line = Vec::with_capacity(len);
    line.extend_from_slice(verb.as_bytes());
    for arg in args {
        line.push(b' ');
        line.extend_from_slice(arg.as_bytes());
    }
    line.push(b'\n');
    Ok(line)
}

/// Position of the reply sentinel, if it has arrived.
pub fn find_sentinel(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == REPLY_SENTINEL)
}

/// Decode a text reply, dropping the sentinel and anything after it.
pub fn decode_text_reply(buf: &[u8]) -> String {
    let end = find_sentinel(buf).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Parse a little-endian size header of the width used by `direction`.
///
/// Download headers are the agent's signed 64-bit `off_t`; a value with the
/// sign bit set has no meaning as a size and is rejected.
pub fn parse_size_header(direction: Direction, bytes: &[u8]) -> Result<u64> {
    let width = direction.header_width();
    if bytes.len() != width {
        return Err(ClientError::ShortRead {
            expected: width,
            got: bytes.len(),
        });
    }
    let mut raw = [0u8; 8];
    raw[..width].copy_from_slice(bytes);
    let value = u64::from_le_bytes(raw);
    if direction == Direction::Download && value > i64::MAX as u64 {
        return Err(ClientError::InvalidSize(value));
    }
    Ok(value)
}

/// Encode the 4-byte upload header for a payload of `len` bytes.
pub fn encode_upload_header(len: u64) -> Result<[u8; 4]> {
    // The agent reads the size into a signed int
    if len > i32::MAX as u64 {
        return Err(ClientError::PayloadTooLarge(len));
    }
    Ok((len as u32).to_le_bytes())
}

/// True when the agent flagged the reply as a failure.
pub fn contains_error_marker(reply: &str) -> bool {
    reply.contains(ERROR_MARKER)
}

/// Split a listing reply into entry names.
///
/// Blank lines and the `.`/`..` entries never name a child and are dropped.
pub fn split_listing(reply: &str) -> Vec<&str> {
    reply
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty() && !SPECIAL_ENTRIES.contains(name))
        .collect()
}

/// Join a remote directory and an entry name with a single `/`.
pub fn join_remote(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{}{}", dir, name)
    } else {
        format!("{}/{}", dir, name)
    }
}
