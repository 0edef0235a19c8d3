use std::str::FromStr;

use thiserror::Error;

use starcoin_wallet_core::{WalletMetadata, WalletOptions};

pub const ENV_PROFILE: &str = "STARCOIN_WALLET_PROFILE";
pub const ENV_BRIDGE_URL: &str = "STARCOIN_WALLET_BRIDGE_URL";
pub const ENV_TIMEOUT_MS: &str = "STARCOIN_WALLET_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "STARCOIN_WALLET_POLL_INTERVAL_MS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "STARCOIN_WALLET_POLL_MAX_ATTEMPTS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl FromStr for RuntimeProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            _ => Err(ConfigError::Invalid {
                key: ENV_PROFILE,
                value: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WalletAdapterConfig {
    pub runtime_profile: RuntimeProfile,
    /// JSON-RPC bridge fronting the extension, used outside the browser.
    pub bridge_url: Option<String>,
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    pub metadata: WalletMetadata,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        let options = WalletOptions::default();
        Self {
            runtime_profile: RuntimeProfile::Development,
            bridge_url: None,
            timeout_ms: options.timeout_ms,
            poll_interval_ms: options.poll_interval_ms,
            max_poll_attempts: options.max_poll_attempts,
            metadata: options.metadata,
        }
    }
}

impl WalletAdapterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get(ENV_PROFILE) {
            cfg.runtime_profile = raw.parse()?;
        }
        if let Some(raw) = get(ENV_BRIDGE_URL) {
            cfg.bridge_url = Some(raw.trim().to_owned());
        }
        if let Some(raw) = get(ENV_TIMEOUT_MS) {
            cfg.timeout_ms = parse_number(ENV_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_POLL_INTERVAL_MS) {
            cfg.poll_interval_ms = parse_number(ENV_POLL_INTERVAL_MS, &raw)?;
        }
        if let Some(raw) = get(ENV_POLL_MAX_ATTEMPTS) {
            cfg.max_poll_attempts = parse_number(ENV_POLL_MAX_ATTEMPTS, &raw)?;
        }
        Ok(cfg)
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn wallet_options(&self) -> WalletOptions {
        WalletOptions {
            metadata: self.metadata.clone(),
            poll_interval_ms: self.poll_interval_ms,
            max_poll_attempts: self.max_poll_attempts,
            timeout_ms: self.timeout_ms,
        }
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_owned(),
    })
}
