//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every section is optional; omitted fields take their defaults.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::protocol::SERVER_NAME;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Protocol-level settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Document backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Response size limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.name.trim().is_empty() {
            return Err(invalid("server.name must not be empty"));
        }

        if self.http.host.trim().is_empty() {
            return Err(invalid("http.host must not be empty"));
        }

        if self.backend.timeout_secs == 0 {
            return Err(invalid("backend.timeout_secs must be greater than zero"));
        }

        if self.backend.user_agent.trim().is_empty() {
            return Err(invalid("backend.user_agent must not be empty"));
        }

        for (field, url) in [
            ("backend.rfc_base_url", &self.backend.rfc_base_url),
            ("backend.rfc_editor_url", &self.backend.rfc_editor_url),
            ("backend.datatracker_url", &self.backend.datatracker_url),
            ("backend.openid_base_url", &self.backend.openid_base_url),
        ] {
            validate_url(field, url)?;
        }

        let limits = &self.limits;
        if limits.content_cap_bytes == 0 {
            return Err(invalid("limits.content_cap_bytes must be greater than zero"));
        }
        if limits.content_cap_bytes >= limits.soft_limit_bytes {
            return Err(invalid(format!(
                "limits.content_cap_bytes ({}) must be below limits.soft_limit_bytes ({})",
                limits.content_cap_bytes, limits.soft_limit_bytes
            )));
        }
        if limits.soft_limit_bytes > limits.hard_limit_bytes {
            return Err(invalid(format!(
                "limits.soft_limit_bytes ({}) must not exceed limits.hard_limit_bytes ({})",
                limits.soft_limit_bytes, limits.hard_limit_bytes
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(invalid(format!(
            "{field} must use http or https, got '{}'",
            parsed.scheme()
        ))),
        Err(e) => Err(invalid(format!("{field} is not a valid URL: {e}"))),
    }
}

/// Protocol-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Reject `tools/*` requests that arrive before `initialize`.
    /// Default: false (warn and serve).
    #[serde(default)]
    pub strict_handshake: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            strict_handshake: false,
        }
    }
}

fn default_server_name() -> String {
    SERVER_NAME.to_string()
}

/// HTTP transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    3000
}

/// Document backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Base URL for RFC text files.
    #[serde(default = "default_rfc_base_url")]
    pub rfc_base_url: String,

    /// Base URL of the RFC Editor site (search).
    #[serde(default = "default_rfc_editor_url")]
    pub rfc_editor_url: String,

    /// Base URL of the IETF Datatracker.
    #[serde(default = "default_datatracker_url")]
    pub datatracker_url: String,

    /// Base URL for OpenID specification pages.
    #[serde(default = "default_openid_base_url")]
    pub openid_base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            rfc_base_url: default_rfc_base_url(),
            rfc_editor_url: default_rfc_editor_url(),
            datatracker_url: default_datatracker_url(),
            openid_base_url: default_openid_base_url(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("standard-finder-mcp/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rfc_base_url() -> String {
    "https://www.rfc-editor.org/rfc".to_string()
}

fn default_rfc_editor_url() -> String {
    "https://www.rfc-editor.org".to_string()
}

fn default_datatracker_url() -> String {
    "https://datatracker.ietf.org".to_string()
}

fn default_openid_base_url() -> String {
    "https://openid.net/specs/".to_string()
}

/// Outbound response size limits, in bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Above this size a single text result is truncated.
    #[serde(default = "default_soft_limit")]
    pub soft_limit_bytes: usize,

    /// Length a truncated text result is cut to.
    #[serde(default = "default_content_cap")]
    pub content_cap_bytes: usize,

    /// Above this size the response is replaced by an error.
    #[serde(default = "default_hard_limit")]
    pub hard_limit_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            soft_limit_bytes: default_soft_limit(),
            content_cap_bytes: default_content_cap(),
            hard_limit_bytes: default_hard_limit(),
        }
    }
}

const fn default_soft_limit() -> usize {
    100 * 1024
}

const fn default_content_cap() -> usize {
    50 * 1024
}

const fn default_hard_limit() -> usize {
    200 * 1024
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
