//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `hostd.toml` in the working directory unless `--config` names
//! another file. Every field has a sensible default so the file is optional.
//! Environment variables take precedence over file values, and the `-b`
//! flag takes precedence over both.

use std::path::Path;

use hostd_adapter_libvirt::LibvirtConfig;
use hostd_app::services::dispatch_service::DEFAULT_LISTING_LIMIT;
use serde::Deserialize;

const DEFAULT_PATH: &str = "hostd.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Management connection settings.
    pub libvirt: LibvirtConfig,
    /// Identifier resolution settings.
    pub dispatch: DispatchConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// Dispatcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Largest active-domain listing accepted before a request fails.
    pub listing_limit: usize,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Config {
    /// Load configuration from `path` (or `hostd.toml`) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, if an explicitly named
    /// file cannot be read, or if validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path, true)?,
            None => Self::from_file(Path::new(DEFAULT_PATH), false)?,
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(val) = var("HOSTD_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("HOSTD_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("HOSTD_BIND") {
            self.set_bind(&val)?;
        }
        if let Some(val) = var("HOSTD_LIBVIRT_ADDRESS") {
            self.libvirt.address = val;
        }
        if let Some(val) = var("HOSTD_LIBVIRT_URI") {
            self.libvirt.uri = Some(val);
        }
        if let Some(limit) = var("HOSTD_LISTING_LIMIT").and_then(|val| val.parse().ok()) {
            self.dispatch.listing_limit = limit;
        }
        if let Some(val) = var("HOSTD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    /// Apply a `host:port` bind address. An empty host (`:8084`) keeps
    /// listening on every interface.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the value has no `:port` part
    /// or the port is not a number.
    pub fn set_bind(&mut self, bind: &str) -> Result<(), ConfigError> {
        let (host, port) = bind
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::Validation(format!("bind address {bind:?} has no port")))?;
        let port = port
            .parse()
            .map_err(|_| ConfigError::Validation(format!("invalid port in bind address {bind:?}")))?;
        self.server.host = if host.is_empty() {
            ServerConfig::default().host
        } else {
            host.to_string()
        };
        self.server.port = port;
        Ok(())
    }

    /// Check semantic constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for a zero port, dial timeout,
    /// listing limit, or queue depth.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.libvirt.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "libvirt connect timeout must be non-zero".to_string(),
            ));
        }
        if self.libvirt.queue_depth == 0 {
            return Err(ConfigError::Validation(
                "libvirt queue depth must be non-zero".to_string(),
            ));
        }
        if self.dispatch.listing_limit == 0 {
            return Err(ConfigError::Validation(
                "listing limit must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8084,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            listing_limit: DEFAULT_LISTING_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "libvirt_hostd=info,hostd=info,tower_http=debug".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8084);
        assert_eq!(config.libvirt.address, "10.0.100.1:16509");
        assert_eq!(config.libvirt.connect_timeout_secs, 2);
        assert_eq!(config.dispatch.listing_limit, 1024);
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8084);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [server]
            host = '127.0.0.1'
            port = 9090

            [libvirt]
            address = 'kvm01:16509'
            connect_timeout_secs = 5
            uri = 'qemu:///system'
            queue_depth = 16

            [dispatch]
            listing_limit = 4096

            [logging]
            filter = 'debug'
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.libvirt.address, "kvm01:16509");
        assert_eq!(config.libvirt.connect_timeout_secs, 5);
        assert_eq!(config.libvirt.uri.as_deref(), Some("qemu:///system"));
        assert_eq!(config.libvirt.queue_depth, 16);
        assert_eq!(config.dispatch.listing_limit, 4096);
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn should_return_default_when_default_file_not_found() {
        let config = Config::from_file(Path::new("nonexistent.toml"), false).unwrap();
        assert_eq!(config.server.port, 8084);
    }

    #[test]
    fn should_fail_when_named_file_not_found() {
        let result = Config::from_file(Path::new("nonexistent.toml"), true);
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn should_apply_environment_overrides() {
        let mut config = Config::default();
        config.apply_overrides(env(&[
            ("HOSTD_HOST", "127.0.0.1"),
            ("HOSTD_PORT", "9000"),
            ("HOSTD_LIBVIRT_ADDRESS", "kvm02:16509"),
            ("HOSTD_LIBVIRT_URI", "qemu:///system"),
            ("HOSTD_LISTING_LIMIT", "2048"),
            ("HOSTD_LOG", "trace"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.libvirt.address, "kvm02:16509");
        assert_eq!(config.libvirt.uri.as_deref(), Some("qemu:///system"));
        assert_eq!(config.dispatch.listing_limit, 2048);
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_prefer_rust_log_over_hostd_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("HOSTD_LOG", "trace"), ("RUST_LOG", "warn")]))
            .unwrap();
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_ignore_unparsable_port_override() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("HOSTD_PORT", "eighty")])).unwrap();
        assert_eq!(config.server.port, 8084);
    }

    #[test]
    fn should_apply_bind_with_empty_host() {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.set_bind(":9191").unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9191");
    }

    #[test]
    fn should_apply_bind_with_host() {
        let mut config = Config::default();
        config.set_bind("10.1.2.3:8080").unwrap();
        assert_eq!(config.bind_addr(), "10.1.2.3:8080");
    }

    #[test]
    fn should_reject_bind_without_port() {
        let mut config = Config::default();
        let result = config.set_bind("9191");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        assert_eq!(config.bind_addr(), "0.0.0.0:8084");
    }

    #[test]
    fn should_reject_bind_with_unparsable_port() {
        let mut config = Config::default();
        let result = config.set_bind("127.0.0.1:http");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
        assert_eq!(config.bind_addr(), "0.0.0.0:8084");
    }

    #[test]
    fn should_reject_unparsable_bind_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("HOSTD_BIND", "localhost")]));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_listing_limit() {
        let mut config = Config::default();
        config.dispatch.listing_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_connect_timeout() {
        let mut config = Config::default();
        config.libvirt.connect_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
