use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single client operation.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out waiting for the agent to reply")]
    ReplyTimeout,

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("connection closed by agent")]
    ConnectionClosed,

    #[error("invalid size header value: {0}")]
    InvalidSize(u64),

    #[error("cannot read local file {}: {source}", .path.display())]
    LocalFileUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write local file {}: {source}", .path.display())]
    LocalWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("agent reported an error: {0}")]
    RemoteReported(String),

    #[error("argument contains whitespace and cannot be sent: {0:?}")]
    UnsupportedArgument(String),

    #[error("payload of {0} bytes does not fit the upload size header")]
    PayloadTooLarge(u64),

    #[error("depth limit {depth} reached at {path}")]
    DepthLimit { path: String, depth: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ClientError {
    /// Errors after which the connection can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ClientError::ConnectionClosed | ClientError::Connect { .. }
        )
    }

    /// Map a transport-level read error onto the taxonomy.
    pub(crate) fn from_read(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ClientError::ReplyTimeout,
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe => ClientError::ConnectionClosed,
            _ => ClientError::Io(err),
        }
    }

    /// Map a transport-level write error onto the taxonomy.
    pub(crate) fn from_write(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::WriteZero => ClientError::ConnectionClosed,
            _ => ClientError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_errors_map_to_taxonomy() {
        let e = ClientError::from_read(io::Error::new(io::ErrorKind::WouldBlock, "x"));
        assert!(matches!(e, ClientError::ReplyTimeout));
        let e = ClientError::from_read(io::Error::new(io::ErrorKind::TimedOut, "x"));
        assert!(matches!(e, ClientError::ReplyTimeout));
        let e = ClientError::from_read(io::Error::new(io::ErrorKind::ConnectionReset, "x"));
        assert!(e.is_fatal());
        let e = ClientError::from_read(io::Error::new(io::ErrorKind::Other, "x"));
        assert!(matches!(e, ClientError::Io(_)));
        assert!(!e.is_fatal());
    }

    #[test]
    fn test_protocol_errors_are_not_fatal() {
        assert!(!ClientError::ReplyTimeout.is_fatal());
        assert!(!ClientError::ShortRead { expected: 8, got: 3 }.is_fatal());
        assert!(!ClientError::InvalidSize(u64::MAX).is_fatal());
        assert!(!ClientError::RemoteReported("Error".into()).is_fatal());
    }
}
