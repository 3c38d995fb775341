//! Process configuration from environment variables

use anyhow::Context;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub ha_url: String,
    pub ha_token: String,
    pub ha_enabled: bool,
    pub ha_timeout: Duration,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model_name: String,
    pub scheduler_poll: Duration,
}

impl AppConfig {
    /// Load from the environment (and a `.env` file if present)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:8000")
                .parse()
                .context("BIND_ADDR must be a socket address")?,
            ha_url: var_or("HA_URL", "http://localhost:8123"),
            ha_token: var_or("HA_TOKEN", ""),
            ha_enabled: parse_bool(&var_or("HA_ENABLED", "false"))
                .context("HA_ENABLED must be true or false")?,
            ha_timeout: Duration::from_secs(
                var_or("HA_TIMEOUT_SECS", "10")
                    .parse()
                    .context("HA_TIMEOUT_SECS must be a number of seconds")?,
            ),
            openai_api_key: var_or("OPENAI_API_KEY", ""),
            openai_base_url: var_or("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            model_name: var_or("MODEL_NAME", "gpt-4o-mini"),
            scheduler_poll: Duration::from_secs(
                var_or("SCHEDULER_POLL_SECS", "30")
                    .parse()
                    .context("SCHEDULER_POLL_SECS must be a number of seconds")?,
            ),
        })
    }

    /// Live mode requires both the switch and a token
    #[must_use]
    pub fn ha_live(&self) -> bool {
        self.ha_enabled && !self.ha_token.is_empty()
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("invalid boolean {other:?}"),
    }
}
