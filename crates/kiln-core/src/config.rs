//! Binding resolution for the dev server.
//!
//! The upstream address arrives through `FRONTEND_HOST` (with `APP_HOST`
//! as fallback) as either `host:port` or a bare host. A `host:port` value
//! puts the dev server on the next port up; a bare host binds all
//! interfaces on the fixed default port.
//!
//! The +1 derivation is a carried convention: the dev server sits adjacent
//! to the upstream asset port, and that adjacent port is assumed free.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Environment variable carrying the primary upstream address.
pub const FRONTEND_HOST_VAR: &str = "FRONTEND_HOST";

/// Fallback environment variable consulted when the primary is absent.
pub const APP_HOST_VAR: &str = "APP_HOST";

/// Host used when the upstream value carries no port of its own.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Port used when the upstream value carries no port of its own.
pub const DEFAULT_PORT: u16 = 8096;

/// Environment inputs, captured once at the process boundary.
///
/// Nothing else in the workspace reads process environment variables;
/// resolution is a pure function of this struct.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub frontend_host: Option<String>,
    pub app_host: Option<String>,
}

impl Env {
    /// Snapshot the process environment.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            frontend_host: std::env::var(FRONTEND_HOST_VAR).ok(),
            app_host: std::env::var(APP_HOST_VAR).ok(),
        }
    }

    /// The effective upstream value: primary wins over fallback.
    #[must_use]
    pub fn upstream(&self) -> Option<&str> {
        self.frontend_host.as_deref().or(self.app_host.as_deref())
    }
}

/// Resolved server binding. Computed once at startup, immutable after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub host: String,
    pub port: u16,
}

impl Binding {
    /// Resolve the dev server binding from captured environment inputs.
    ///
    /// `host:port` keeps the host and derives `port + 1`; a bare host
    /// yields all interfaces on [`DEFAULT_PORT`]. Extra `:`-separated
    /// segments beyond the second are ignored.
    pub fn resolve(env: &Env) -> Result<Self, Error> {
        let upstream = env.upstream().ok_or(Error::MissingHost)?;

        if upstream.contains(':') {
            let mut parts = upstream.split(':');
            let host = parts.next().unwrap_or_default();
            let suffix = parts.next().unwrap_or_default();

            let upstream_port: u16 = suffix.parse().map_err(|_| Error::InvalidPort {
                value: upstream.to_string(),
            })?;
            let port = upstream_port.checked_add(1).ok_or_else(|| Error::InvalidPort {
                value: upstream.to_string(),
            })?;

            debug!(upstream, port, "resolving dev server binding from upstream address");

            Ok(Self {
                host: host.to_string(),
                port,
            })
        } else {
            debug!(
                upstream,
                port = DEFAULT_PORT,
                "upstream address has no port, using defaults"
            );

            Ok(Self {
                host: DEFAULT_HOST.to_string(),
                port: DEFAULT_PORT,
            })
        }
    }

    /// The content-base URL under which the in-memory output is addressed.
    #[must_use]
    pub fn content_base(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// The `host:port` form passed to the TCP listener.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(frontend: Option<&str>, app: Option<&str>) -> Env {
        Env {
            frontend_host: frontend.map(String::from),
            app_host: app.map(String::from),
        }
    }

    #[test]
    fn test_host_port_derives_next_port() {
        let binding = Binding::resolve(&env_with(Some("127.0.0.1:8080"), None)).unwrap();
        assert_eq!(binding.host, "127.0.0.1");
        assert_eq!(binding.port, 8081);
    }

    #[test]
    fn test_bare_host_uses_defaults() {
        let binding = Binding::resolve(&env_with(Some("localhost"), None)).unwrap();
        assert_eq!(binding.host, DEFAULT_HOST);
        assert_eq!(binding.port, DEFAULT_PORT);
    }

    #[test]
    fn test_fallback_consulted_when_primary_absent() {
        let binding = Binding::resolve(&env_with(None, Some("10.0.0.5:9000"))).unwrap();
        assert_eq!(binding.host, "10.0.0.5");
        assert_eq!(binding.port, 9001);
    }

    #[test]
    fn test_primary_wins_over_fallback() {
        let binding =
            Binding::resolve(&env_with(Some("front:4000"), Some("app:5000"))).unwrap();
        assert_eq!(binding.host, "front");
        assert_eq!(binding.port, 4001);
    }

    #[test]
    fn test_missing_both_is_explicit_error() {
        let err = Binding::resolve(&Env::default()).unwrap_err();
        assert!(matches!(err, Error::MissingHost));
    }

    #[test]
    fn test_non_numeric_port_rejected() {
        let err = Binding::resolve(&env_with(Some("localhost:http"), None)).unwrap_err();
        assert!(matches!(err, Error::InvalidPort { .. }));
    }

    #[test]
    fn test_port_derivation_must_stay_in_range() {
        let err = Binding::resolve(&env_with(Some("localhost:65535"), None)).unwrap_err();
        assert!(matches!(err, Error::InvalidPort { .. }));
    }

    #[test]
    fn test_extra_segments_ignored() {
        // Only the first two `:`-separated segments participate.
        let binding = Binding::resolve(&env_with(Some("host:8080:junk"), None)).unwrap();
        assert_eq!(binding.host, "host");
        assert_eq!(binding.port, 8081);
    }

    #[test]
    fn test_content_base() {
        let binding = Binding {
            host: "127.0.0.1".to_string(),
            port: 8081,
        };
        assert_eq!(binding.content_base(), "http://127.0.0.1:8081");
        assert_eq!(binding.addr(), "127.0.0.1:8081");
    }

    #[test]
    #[serial_test::serial]
    fn test_capture_reads_both_variables() {
        std::env::set_var(FRONTEND_HOST_VAR, "a:1");
        std::env::set_var(APP_HOST_VAR, "b:2");

        let env = Env::capture();

        std::env::remove_var(FRONTEND_HOST_VAR);
        std::env::remove_var(APP_HOST_VAR);

        assert_eq!(env.frontend_host.as_deref(), Some("a:1"));
        assert_eq!(env.app_host.as_deref(), Some("b:2"));
        assert_eq!(env.upstream(), Some("a:1"));
    }
}
