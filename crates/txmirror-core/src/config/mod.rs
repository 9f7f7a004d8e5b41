//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML or YAML file passed with `--config` (or `TXMIRROR_CONFIG`)
//! 3. **Environment variables**: `TXMIRROR__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`ApiConfig`]: listener address, outbound client timeout, body size limit
//! - [`TlsConfig`]: certificate/key paths enabling the TLS listener
//! - [`PoolConfig`]: backend connection pool tuning
//! - [`RelayConfig`]: optional third-party relay (disabled without an API key)
//! - [`LoggingConfig`]: log level and format
//! - `backends`: list of submission endpoint URLs
//!
//! # Validation
//!
//! Configuration is validated at load time. An empty backend list is accepted here and
//! rejected per request instead, so a misconfigured instance still answers health checks.
//!
//! # Example
//!
//! ```toml
//! backends = ["http://node-a:8090/api/submit/tx", "http://node-b:8090/api/submit/tx"]
//!
//! [api]
//! port = 8090
//! client_timeout_ms = 5000
//!
//! [relay]
//! api_key = "..."
//! network = "preprod"
//! turbo = true
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

/// Environment variable prefix for overrides, e.g. `TXMIRROR__API__PORT=9000`.
pub const ENV_PREFIX: &str = "TXMIRROR";

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Inbound listener and outbound client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// IP address to bind the listener to. Defaults to `0.0.0.0`.
    #[serde(default = "default_address")]
    pub address: String,

    /// Port number to listen on. Defaults to `8090`.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Outbound request timeout in milliseconds, covering connect, handshake and the full
    /// round trip of one delivery attempt. Defaults to `60000`.
    #[serde(default = "default_client_timeout_ms")]
    pub client_timeout_ms: u64,

    /// Maximum accepted submission body in bytes. Defaults to `65536`.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_client_timeout_ms() -> u64 {
    60_000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

/// TLS listener settings. TLS is enabled only when both paths are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub cert_file_path: Option<PathBuf>,

    #[serde(default)]
    pub key_file_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Returns the certificate and key paths when TLS is enabled.
    #[must_use]
    pub fn paths(&self) -> Option<(&Path, &Path)> {
        match (&self.cert_file_path, &self.key_file_path) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }
}

/// Backend connection pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum idle connections kept per backend host. Defaults to `100`.
    #[serde(default = "default_max_idle_per_host")]
    pub max_idle_per_host: usize,

    /// Seconds an idle pooled connection is kept before being closed. Defaults to `90`.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Seconds allowed for TCP connect plus TLS handshake. Defaults to `10`.
    #[serde(default = "default_handshake_timeout_secs")]
    pub handshake_timeout_secs: u64,
}

fn default_max_idle_per_host() -> usize {
    100
}

fn default_idle_timeout_secs() -> u64 {
    90
}

fn default_handshake_timeout_secs() -> u64 {
    10
}

/// Optional third-party relay (Maestro transaction manager).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// API key. The relay is disabled when this is unset or empty.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Network name used to build the default endpoint. Defaults to `"mainnet"`.
    #[serde(default = "default_network")]
    pub network: String,

    /// Use the turbo submission endpoint. Defaults to `false`.
    #[serde(default)]
    pub turbo: bool,

    /// Overrides the `https://{network}.gomaestro-api.org/v1` base URL.
    #[serde(default)]
    pub base_url: Option<String>,
}

fn default_network() -> String {
    "mainnet".to_string()
}

impl RelayConfig {
    /// Returns `true` when an API key is configured.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    /// Returns the API base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.gomaestro-api.org/v1", self.network),
        }
    }
}

/// Application logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "trace", "debug", "info", "warn", "error"). Defaults to `"info"`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: `"json"` or `"pretty"`. Defaults to `"pretty"`.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub tls: TlsConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Submission endpoint URLs every transaction is relayed to.
    #[serde(default)]
    pub backends: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            client_timeout_ms: default_client_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: default_max_idle_per_host(),
            idle_timeout_secs: default_idle_timeout_secs(),
            handshake_timeout_secs: default_handshake_timeout_secs(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { api_key: None, network: default_network(), turbo: false, base_url: None }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), format: default_format() }
    }
}

impl AppConfig {
    /// Loads configuration from an optional file with environment variable overrides.
    ///
    /// The file format follows its extension (`.toml`, `.yaml`/`.yml`). Environment
    /// variables use the `TXMIRROR__` prefix and `__` as the nesting separator
    /// (e.g. `TXMIRROR__API__CLIENT_TIMEOUT_MS=5000`); `TXMIRROR__BACKENDS` takes a
    /// comma-separated list. The result is validated before it is returned.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigLoadError> {
        let mut builder = Config::builder()
            .set_default("api.address", default_address())?
            .set_default("api.port", i64::from(default_port()))?
            .set_default("api.client_timeout_ms", 60_000)?
            .set_default("logging.level", default_level())?
            .set_default("logging.format", default_format())?
            .set_default("relay.network", default_network())?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("backends"),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Returns the parsed socket address for the listener.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigLoadError> {
        let ip: IpAddr = self.api.address.parse().map_err(|_| {
            ConfigLoadError::Invalid(format!("invalid listen address: {}", self.api.address))
        })?;
        Ok(SocketAddr::new(ip, self.api.port))
    }

    /// Returns the per-attempt outbound timeout.
    #[must_use]
    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.api.client_timeout_ms)
    }

    /// Validates the configuration for correctness and consistency.
    ///
    /// Checks include:
    /// - Port, client timeout and body limit are greater than zero
    /// - Every backend is an absolute `http`/`https` URL
    /// - TLS certificate and key paths are set together
    /// - Relay network is set when the relay is enabled
    /// - Logging format is either `"json"` or `"pretty"`
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |msg: String| Err(ConfigLoadError::Invalid(msg));

        if self.api.port == 0 {
            return invalid("listen port must be greater than 0".to_string());
        }

        if self.api.client_timeout_ms == 0 {
            return invalid("client timeout must be greater than 0".to_string());
        }

        if self.api.max_body_bytes == 0 {
            return invalid("max body size must be greater than 0".to_string());
        }

        for backend in &self.backends {
            validate_backend_url(backend).map_err(ConfigLoadError::Invalid)?;
        }

        if self.tls.cert_file_path.is_some() != self.tls.key_file_path.is_some() {
            return invalid("TLS requires both cert_file_path and key_file_path".to_string());
        }

        if self.relay.enabled() && self.relay.network.trim().is_empty() {
            return invalid("relay network must be set when relay api_key is configured".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return invalid("logging format must be 'json' or 'pretty'".to_string());
        }

        self.socket_addr()?;

        Ok(())
    }
}

fn validate_backend_url(backend: &str) -> Result<(), String> {
    let uri: http::Uri =
        backend.parse().map_err(|e| format!("invalid backend URL {backend}: {e}"))?;

    match uri.scheme_str() {
        Some("http" | "https") => {}
        _ => return Err(format!("backend URL must use http or https: {backend}")),
    }

    if uri.authority().is_none() {
        return Err(format!("backend URL has no host: {backend}"));
    }

    Ok(())
}
