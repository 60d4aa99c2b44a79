mod llm;
mod network;
mod pricing;
mod runtime;
mod server;
mod services;

pub use llm::*;
pub use network::*;
pub use pricing::*;
pub use runtime::*;
pub use server::*;
pub use services::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub turn: TurnConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub image_store: ImageStoreConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigError {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Error, field: field.into(), message: message.into() }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: ConfigSeverity::Warning, field: field.into(), message: message.into() }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError::error("server.port", "port must be greater than 0"));
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError::error("server.host", "host must not be empty"));
        }
        if self.server.max_concurrent_requests == 0 {
            errors.push(ConfigError::error(
                "server.max_concurrent_requests",
                "must be greater than 0",
            ));
        }
        if let Some(rl) = &self.server.rate_limit {
            if rl.requests_per_second == 0 || rl.burst_size == 0 {
                errors.push(ConfigError::error(
                    "server.rate_limit",
                    "requests_per_second and burst_size must be greater than 0",
                ));
            }
        }

        for (field, url) in [
            ("llm.base_url", &self.llm.base_url),
            ("scrape.base_url", &self.scrape.base_url),
            ("images.base_url", &self.images.base_url),
        ] {
            if url.is_empty() {
                errors.push(ConfigError::error(field, "base_url must not be empty"));
            }
        }

        if self.llm.auth.key.is_some() {
            errors.push(ConfigError::warning(
                "llm.auth.key",
                "plaintext API key in config; prefer `env`",
            ));
        }

        if self.turn.max_rounds == 0 {
            errors.push(ConfigError::error("turn.max_rounds", "must be at least 1"));
        }
        if self.turn.deadline_secs == 0 {
            errors.push(ConfigError::error("turn.deadline_secs", "must be greater than 0"));
        }
        if self.turn.channel_capacity == 0 {
            errors.push(ConfigError::error("turn.channel_capacity", "must be greater than 0"));
        }

        if self.images.job.max_poll_attempts == 0 {
            errors.push(ConfigError::error(
                "images.job.max_poll_attempts",
                "must be at least 1",
            ));
        }
        if self.image_store.max_entries == 0 {
            errors.push(ConfigError::error("image_store.max_entries", "must be at least 1"));
        }

        for (field, price) in [
            ("pricing.scrape", self.pricing.scrape),
            ("pricing.ad_copy", self.pricing.ad_copy),
            ("pricing.image_fast", self.pricing.image_fast),
            ("pricing.image_dev", self.pricing.image_dev),
        ] {
            if !price.is_finite() || price < 0.0 {
                errors.push(ConfigError::error(field, "price must be a non-negative number"));
            }
        }

        if self.payments.enabled && !self.network.id.is_testnet() && self.payments.pay_to.is_none() {
            errors.push(ConfigError::warning(
                "payments.pay_to",
                "payments enabled on mainnet without an explicit pay_to address",
            ));
        }

        if self.server.cors.allowed_origins.len() == 1
            && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError::warning(
                "server.cors.allowed_origins",
                "wildcard \"*\" allows all origins (not recommended for production)",
            ));
        }

        errors
    }
}
