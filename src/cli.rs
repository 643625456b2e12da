//! Command-line options for the interactive client

use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Parser)]
#[command(
    name = "agentcp",
    author,
    version,
    about = "Interactive shell for listing and copying files through a remote agent"
)]
pub struct ClientOpts {
    /// Agent host (default: localhost, or host.docker.internal inside a container)
    #[arg(long)]
    pub host: Option<String>,

    /// Agent TCP port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Agent endpoint as agent://host[:port] or host:port (overrides --host/--port)
    #[arg(long, conflicts_with_all = ["host", "port"])]
    pub remote: Option<String>,

    /// Per-read timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Entry names to skip while copying a remote directory (supports *)
    #[arg(long = "exclude", action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Maximum directory depth walked by a recursive download
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Root for relative local paths when running inside a container
    #[arg(long)]
    pub workspace_root: Option<PathBuf>,

    /// Append timestamped operation log lines to this file
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,

    /// Show a progress bar while receiving files
    #[arg(long)]
    pub progress: bool,

    /// TOML file with defaults for any of the options above
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
