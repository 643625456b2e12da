//! Host environment detection and local path resolution
//!
//! Whether the client runs inside a container is decided once at startup and
//! then passed around as a plain value, so nothing below `main` reads the host.

use crate::protocol::{CONTAINER_HOST, LOOPBACK_HOST};
use crate::protocol_core::join_remote;
use std::path::{Component, Path, PathBuf};

// Container runtimes that show up in the init process's cgroup list
const CGROUP_MARKERS: [&str; 4] = ["docker", "containerd", "kubepods", "lxc"];

/// Where to look for container markers. Overridable for tests.
#[derive(Debug, Clone)]
pub struct HostMarkers {
    pub sentinel: PathBuf,
    pub init_cgroup: PathBuf,
}

impl Default for HostMarkers {
    fn default() -> Self {
        Self {
            sentinel: PathBuf::from("/.dockerenv"),
            init_cgroup: PathBuf::from("/proc/1/cgroup"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub contained: bool,
}

impl Environment {
    pub fn detect() -> Self {
        Self::detect_with(&HostMarkers::default())
    }

    pub fn detect_with(markers: &HostMarkers) -> Self {
        if markers.sentinel.exists() {
            return Self { contained: true };
        }
        let contained = std::fs::read_to_string(&markers.init_cgroup)
            .map(|s| CGROUP_MARKERS.iter().any(|m| s.contains(m)))
            .unwrap_or(false);
        Self { contained }
    }

    /// Host the agent is reachable at when nothing else is configured.
    pub fn default_host(&self) -> &'static str {
        if self.contained {
            CONTAINER_HOST
        } else {
            LOOPBACK_HOST
        }
    }
}

/// Maps operator-supplied local paths to absolute, environment-aware paths.
#[derive(Debug, Clone)]
pub struct LocalPaths {
    contained: bool,
    workspace_root: PathBuf,
    cwd: PathBuf,
}

impl LocalPaths {
    pub fn new(
        env: Environment,
        workspace_root: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            contained: env.contained,
            workspace_root: workspace_root.into(),
            cwd: cwd.into(),
        }
    }

    /// Absolute paths pass through; relative ones are anchored on the
    /// workspace root when contained and on the working directory otherwise.
    /// Applying it to its own output returns the same path.
    pub fn resolve(&self, raw: &str) -> PathBuf {
        let path = Path::new(raw);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        let base = if self.contained {
            &self.workspace_root
        } else {
            &self.cwd
        };
        let mut out = base.clone();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                other => out.push(other.as_os_str()),
            }
        }
        out
    }

    /// Resolve `raw` and keep it as the token sent on the `cp` line.
    pub fn target(&self, raw: &str) -> LocalTarget {
        LocalTarget::new(self.resolve(raw), raw)
    }
}

/// The local side of a copy.
///
/// The agent never opens the local side of a `cp` line, so `token` only has
/// to survive whitespace splitting. All file I/O goes through `path`, which
/// may contain characters the wire cannot carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTarget {
    pub path: PathBuf,
    pub token: String,
}

impl LocalTarget {
    pub fn new(path: impl Into<PathBuf>, token: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            token: token.into(),
        }
    }

    /// Use the path itself as the wire token.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = path.to_string_lossy().into_owned();
        Self { path, token }
    }

    /// Entry `name` below this target.
    pub fn child(&self, name: &str) -> Self {
        Self {
            path: self.path.join(name),
            token: join_remote(&self.token, name),
        }
    }
}
