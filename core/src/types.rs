//! Value types describing who is probed, as whom, and with what limits.
//!
//! # Design
//! `Target` and `Identity` validate on construction so that nothing built
//! from them can produce a malformed request line or header. Both are
//! immutable once created; a run supplies them once and every exchange
//! borrows them.

use std::fmt;
use std::time::Duration;

use crate::error::ProbeError;

/// Name of the cookie that carries the identity.
pub const NICKNAME_COOKIE: &str = "nickname";

/// The server under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
}

impl Target {
    pub fn new(host: &str, port: u16) -> Result<Self, ProbeError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ProbeError::InvalidArgument("host must not be empty".to_string()));
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ProbeError::InvalidArgument(format!(
                "host {host:?} contains whitespace or control characters"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A username presented to the server as the `nickname` cookie.
///
/// The client never validates what the server makes of it; it only
/// guarantees the value fits in a single `Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: &str) -> Result<Self, ProbeError> {
        if name.is_empty() {
            return Err(ProbeError::InvalidArgument("identity must not be empty".to_string()));
        }
        if name.contains(';') || name.contains('\r') || name.contains('\n') {
            return Err(ProbeError::InvalidArgument(format!(
                "identity {name:?} cannot be sent as a cookie value"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `Cookie` header value, e.g. `nickname=alice`.
    pub fn cookie(&self) -> String {
        format!("{NICKNAME_COOKIE}={}", self.0)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Limits applied to every connection and response capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Upper bound on captured response bytes. Anything past it is dropped
    /// and the response is flagged as truncated.
    pub max_response_bytes: usize,
    /// Size of each individual read from the socket.
    pub chunk_size: usize,
    /// `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// `None` blocks indefinitely on a silent server.
    pub read_timeout: Option<Duration>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_response_bytes: 64 * 1024,
            chunk_size: 4096,
            connect_timeout: None,
            read_timeout: None,
        }
    }
}
