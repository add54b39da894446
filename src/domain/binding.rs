//! Resolved bind address for a background server.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The loopback host callers get when they do not override the bind host.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Resolved bind address of a server.
///
/// The port is only known after the underlying bind completes; for
/// ephemeral-port requests it is the port the operating system assigned.
/// A binding stays readable after shutdown; only network reachability
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerBinding {
    host: String,
    port: u16,
}

impl ServerBinding {
    /// Creates a binding from a resolved host and port.
    #[must_use]
    pub const fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Returns the bound host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the bound port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ServerBinding {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.host, self.port)
    }
}

/// Substitutes the hostname alias for the literal loopback address on
/// platforms where binding `127.0.0.1` is historically unreliable.
///
/// Only an unoverridden loopback request is rewritten; explicit hosts pass
/// through unchanged.
#[must_use]
pub fn effective_host(requested: &str) -> String {
    if cfg!(windows) && requested == LOOPBACK_HOST {
        "localhost".to_owned()
    } else {
        requested.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_host_and_port() {
        let binding = ServerBinding::new("127.0.0.1".to_owned(), 8080);
        assert_eq!(binding.to_string(), "127.0.0.1:8080");
        assert_eq!(binding.host(), "127.0.0.1");
        assert_eq!(binding.port(), 8080);
    }

    #[cfg(windows)]
    #[test]
    fn substitutes_localhost_for_literal_loopback() {
        assert_eq!(effective_host(LOOPBACK_HOST), "localhost");
    }

    #[cfg(not(windows))]
    #[test]
    fn keeps_literal_loopback() {
        assert_eq!(effective_host(LOOPBACK_HOST), LOOPBACK_HOST);
    }

    #[test]
    fn keeps_explicit_hosts() {
        assert_eq!(effective_host("0.0.0.0"), "0.0.0.0");
        assert_eq!(effective_host("localhost"), "localhost");
    }
}
