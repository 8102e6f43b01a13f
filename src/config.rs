// Configuration File Support
//
// Gateway configuration in TOML with environment variable overrides.
// The file path comes from --config, then REVIEW_GATEWAY_CONFIG, then
// ./review-gateway.toml. A missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::auth::VerifiedIdentity;
use crate::rate_limit::RateLimitConfig;
use crate::timeout::DependencyTimeout;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "review-gateway.toml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Rate limiter window configuration
    pub rate_limit: RateLimitConfig,

    /// Per-dependency call deadlines
    pub timeouts: TimeoutConfig,

    /// Credential configuration
    pub auth: AuthConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address for the API listener
    pub bind_address: String,

    /// Default page size for job listings
    pub default_list_limit: usize,

    /// Upper bound for job listing page size
    pub max_list_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            default_list_limit: 20,
            max_list_limit: 100,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

/// Dependency deadlines in milliseconds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub identity_ms: u64,
    pub rate_limit_ms: u64,
    pub account_store_ms: u64,
    pub job_store_ms: u64,
    pub queue_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            identity_ms: 2_000,
            rate_limit_ms: 250,
            account_store_ms: 1_000,
            job_store_ms: 1_000,
            queue_ms: 1_000,
        }
    }
}

impl TimeoutConfig {
    pub fn identity(&self) -> DependencyTimeout {
        DependencyTimeout::from_millis("identity.verify", self.identity_ms)
    }

    pub fn rate_limit(&self) -> DependencyTimeout {
        DependencyTimeout::from_millis("rate_limit.increment", self.rate_limit_ms)
    }

    /// Deadline for an account store call
    pub fn account_store(&self, operation: &'static str) -> DependencyTimeout {
        DependencyTimeout::from_millis(operation, self.account_store_ms)
    }

    /// Deadline for a job store call
    pub fn job_store(&self, operation: &'static str) -> DependencyTimeout {
        DependencyTimeout::from_millis(operation, self.job_store_ms)
    }

    pub fn queue(&self) -> DependencyTimeout {
        DependencyTimeout::from_millis("queue.publish", self.queue_ms)
    }
}

/// Credential configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer tokens accepted by the static verifier, keyed by token
    pub static_tokens: HashMap<String, VerifiedIdentity>,

    /// Bearer token for the admin routes; admin routes are disabled when unset
    pub admin_token: Option<String>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    /// Whether to serve the metrics endpoint
    pub enabled: bool,

    /// Port for metrics server
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: GatewayConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::info!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    pub fn config_path() -> PathBuf {
        std::env::var("REVIEW_GATEWAY_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - REVIEW_GATEWAY_BIND_ADDRESS
    /// - REVIEW_GATEWAY_LOG_LEVEL
    /// - REVIEW_GATEWAY_LOG_FORMAT
    /// - REVIEW_GATEWAY_ADMIN_TOKEN
    /// - REVIEW_GATEWAY_METRICS_ENABLED
    /// - REVIEW_GATEWAY_METRICS_PORT
    /// - REVIEW_GATEWAY_RATE_LIMIT_ENABLED
    /// - REVIEW_GATEWAY_RATE_LIMIT_WINDOW_SECS
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(addr) = std::env::var("REVIEW_GATEWAY_BIND_ADDRESS") {
            self.server.bind_address = addr;
        }

        if let Ok(level) = std::env::var("REVIEW_GATEWAY_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("REVIEW_GATEWAY_LOG_FORMAT") {
            self.logging.format = format;
        }

        if let Ok(token) = std::env::var("REVIEW_GATEWAY_ADMIN_TOKEN") {
            if !token.is_empty() {
                self.auth.admin_token = Some(token);
            }
        }

        if let Ok(enabled) = std::env::var("REVIEW_GATEWAY_METRICS_ENABLED") {
            self.metrics.enabled = enabled.parse().unwrap_or(self.metrics.enabled);
        }
        if let Ok(port) = std::env::var("REVIEW_GATEWAY_METRICS_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.metrics.port = port;
            }
        }

        self.rate_limit = self.rate_limit.apply_env_overrides();
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: pretty, compact",
                self.logging.format
            ),
        }

        self.server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))?;

        if self.server.default_list_limit == 0 {
            anyhow::bail!("Default list limit must be > 0");
        }
        if self.server.default_list_limit > self.server.max_list_limit {
            anyhow::bail!("Default list limit must not exceed the maximum list limit");
        }

        if self.rate_limit.window_secs == 0 {
            anyhow::bail!("Rate limit window must be at least 1 second");
        }

        let timeouts = [
            ("identity_ms", self.timeouts.identity_ms),
            ("rate_limit_ms", self.timeouts.rate_limit_ms),
            ("account_store_ms", self.timeouts.account_store_ms),
            ("job_store_ms", self.timeouts.job_store_ms),
            ("queue_ms", self.timeouts.queue_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                anyhow::bail!("Timeout {} must be > 0", name);
            }
        }

        for (token, identity) in &self.auth.static_tokens {
            if token.is_empty() {
                anyhow::bail!("Static token must not be empty");
            }
            if identity.subject.is_empty() {
                anyhow::bail!("Static token for '{}' has an empty subject", identity.email);
            }
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            anyhow::bail!("Metrics port must be > 0");
        }

        Ok(())
    }
}
