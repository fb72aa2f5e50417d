//! Server configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use crate::middleware::DEFAULT_REQUEST_TIMEOUT;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deadline enforced on every request by the timeout middleware.
    pub request_timeout: Duration,
    /// How long shutdown waits for in-flight requests before giving up.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    /// Reads `HOST`, `PORT`, `REQUEST_TIMEOUT_SECS` and `SHUTDOWN_GRACE_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Missing keys use the
    /// defaults; unparseable values are logged and also use the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let seconds = |key: &str| parse_var::<u64>(key, lookup(key)).map(Duration::from_secs);

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", lookup("PORT")).unwrap_or(defaults.port),
            request_timeout: seconds("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.request_timeout),
            shutdown_grace: seconds("SHUTDOWN_GRACE_SECS").unwrap_or(defaults.shutdown_grace),
        }
    }

    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr(), "0.0.0.0:8080");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
    }

    #[test]
    fn every_variable_is_read() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "3000"),
            ("REQUEST_TIMEOUT_SECS", "5"),
            ("SHUTDOWN_GRACE_SECS", " 10 "),
        ]));

        assert_eq!(config.socket_addr(), "127.0.0.1:3000");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.shutdown_grace, Duration::from_secs(10));
    }

    #[rstest]
    #[case("PORT", "not-a-port")]
    #[case("PORT", "70000")]
    #[case("REQUEST_TIMEOUT_SECS", "-3")]
    #[case("SHUTDOWN_GRACE_SECS", "soon")]
    fn unparseable_values_fall_back_to_defaults(#[case] key: &str, #[case] value: &str) {
        let config = ServerConfig::from_lookup(lookup_from(&[(key, value)]));
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn new_keeps_default_durations() {
        let config = ServerConfig::new("localhost", 9000);
        assert_eq!(config.socket_addr(), "localhost:9000");
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
