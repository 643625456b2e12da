//! agentcp library
//!
//! Client side of a small line-oriented file protocol spoken by a remote
//! agent: framing, the session, the transfer engine and the command loop.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod filter;
pub mod logger;
pub mod net;
pub mod protocol;
pub mod protocol_core;
pub mod transfer;
pub mod url;

pub use error::{ClientError, Result};
