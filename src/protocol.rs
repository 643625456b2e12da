//! Shared protocol constants for the agent wire format

use std::fmt;
use std::str::FromStr;

// Default agent endpoint
pub const DEFAULT_PORT: u16 = 50052;
pub const LOOPBACK_HOST: &str = "localhost";
// Alias under which the container runtime exposes the host machine
pub const CONTAINER_HOST: &str = "host.docker.internal";
// Relative local paths land here when running inside a container
pub const DEFAULT_WORKSPACE_ROOT: &str = "/workspace";

// Bounded chunk used for text replies and the upload acknowledgment
pub const READ_CHUNK: usize = 1024;

// Text replies end with a single NUL
pub const REPLY_SENTINEL: u8 = 0;

// Substring the agent puts in a reply when an operation failed
pub const ERROR_MARKER: &str = "Error";

// Entries every listing carries that never name a child
pub const SPECIAL_ENTRIES: [&str; 2] = [".", ".."];

// Command verbs as they appear on the wire
pub mod verb {
    pub const LIST: &str = "ls";
    pub const CHANGE_DIR: &str = "cd";
    pub const COPY: &str = "cp";
}

/// Direction of a single `cp` request.
///
/// The header widths differ per direction: the agent announces download sizes
/// with its native 8-byte `off_t` while it reads upload sizes into a 4-byte
/// `int`. Both widths are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    /// Width in bytes of the little-endian size header for this direction.
    pub const fn header_width(self) -> usize {
        match self {
            Direction::Upload => 4,
            Direction::Download => 8,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upload" => Ok(Direction::Upload),
            "download" => Ok(Direction::Download),
            _ => Err(()),
        }
    }
}

// Centralized timeout constants
pub mod timeouts {
    // Per-read deadline on the agent connection (seconds)
    pub const READ_SECS: u64 = 10;

    // Connection establishment timeout (seconds)
    pub const CONNECT_SECS: u64 = 10;

    // Progress tick interval for the optional payload bar (ms)
    pub const PROGRESS_TICK_MS: u64 = 250;
}
