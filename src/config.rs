// Configuration: built-in defaults < TOML file < command line
use crate::cli::ClientOpts;
use crate::env::{Environment, LocalPaths};
use crate::filter::{is_supported_pattern, EntryFilter};
use crate::protocol::{timeouts, DEFAULT_PORT, DEFAULT_WORKSPACE_ROOT};
use crate::transfer::TransferOptions;
use crate::url::{parse_endpoint, Endpoint};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keys accepted in the `--config` TOML file. All optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub remote: Option<String>,
    pub timeout: Option<u64>,
    #[serde(default)]
    pub exclude: Vec<String>,
    pub max_depth: Option<usize>,
    pub workspace_root: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub progress: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub connect_timeout: Duration,
    pub exclude: Vec<String>,
    pub max_depth: Option<usize>,
    pub workspace_root: PathBuf,
    pub log_file: Option<PathBuf>,
    pub progress: bool,
}

impl ClientConfig {
    pub fn from_opts(opts: &ClientOpts, env: Environment) -> Result<Self> {
        let file = match &opts.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(opts, file, env)
    }

    pub fn merge(opts: &ClientOpts, file: FileConfig, env: Environment) -> Result<Self> {
        let (mut host, mut port) = (file.host, file.port);
        if let Some(remote) = &file.remote {
            let ep = parse_endpoint(remote)
                .with_context(|| format!("Invalid remote in config: {}", remote))?;
            host = Some(ep.host);
            port = Some(ep.port);
        }
        if opts.host.is_some() {
            host = opts.host.clone();
        }
        if opts.port.is_some() {
            port = opts.port;
        }
        if let Some(remote) = &opts.remote {
            let Some(ep) = parse_endpoint(remote) else {
                bail!("Invalid --remote endpoint: {}", remote);
            };
            host = Some(ep.host);
            port = Some(ep.port);
        }

        let timeout = opts.timeout.or(file.timeout).unwrap_or(timeouts::READ_SECS);
        if timeout == 0 {
            bail!("timeout must be at least one second");
        }

        let mut exclude = file.exclude;
        exclude.extend(opts.exclude.iter().cloned());
        if let Some(bad) = exclude.iter().find(|p| !is_supported_pattern(p)) {
            bail!(
                "Unsupported exclude pattern {:?}: '*' may only lead or trail the name",
                bad
            );
        }

        Ok(Self {
            host: host.unwrap_or_else(|| env.default_host().to_string()),
            port: port.unwrap_or(DEFAULT_PORT),
            read_timeout: Duration::from_secs(timeout),
            connect_timeout: Duration::from_secs(timeouts::CONNECT_SECS),
            exclude,
            max_depth: opts.max_depth.or(file.max_depth),
            workspace_root: opts
                .workspace_root
                .clone()
                .or(file.workspace_root)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE_ROOT)),
            log_file: opts.log_file.clone().or(file.log_file),
            progress: opts.progress || file.progress.unwrap_or(false),
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn transfer_options(&self) -> TransferOptions {
        TransferOptions {
            filter: EntryFilter::new(self.exclude.iter().cloned()),
            max_depth: self.max_depth,
            progress: self.progress,
        }
    }

    pub fn local_paths(&self, env: Environment, cwd: impl Into<PathBuf>) -> LocalPaths {
        LocalPaths::new(env, self.workspace_root.clone(), cwd)
    }
}
