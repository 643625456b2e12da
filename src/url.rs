//! Endpoint parsing for agent:// addresses

use crate::protocol::DEFAULT_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// `host:port`, as accepted by `ToSocketAddrs`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Accepts `agent://host[:port]`, `host:port` or a bare `host`.
pub fn parse_endpoint(s: &str) -> Option<Endpoint> {
    let s_trim = s.trim();
    let mut rest = s_trim;
    if let Some(scheme_end) = s_trim.find("://") {
        if !s_trim[..scheme_end].eq_ignore_ascii_case("agent") {
            return None;
        }
        rest = &s_trim[scheme_end + 3..];
    }
    let hp = rest.split('/').next().unwrap_or(rest);
    if hp.is_empty() {
        return None;
    }
    let (host, port) = match hp.rsplit_once(':') {
        Some((h, pr)) => (h, pr.parse().ok()?),
        None => (hp, DEFAULT_PORT),
    };
    if host.is_empty() {
        return None;
    }
    Some(Endpoint {
        host: host.to_string(),
        port,
    })
}
