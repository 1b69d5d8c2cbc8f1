//! Process-scoped configuration, loaded once at startup from the environment.

use std::env;

use thiserror::Error;

const DEFAULT_RESCUE_DELAY_SECONDS: i64 = 604_800; // 7 days
const DEFAULT_SLACK_SECONDS: i64 = 0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// The XRPL `rippled` JSON-RPC endpoint this coordinator submits transactions to.
    pub network_endpoint: String,
    pub listen_port: u16,
    /// Seconds after `deployed_at` before a rescue is admissible. 7 days in production;
    /// integration builds set this to 1800 via `RESCUE_DELAY_SECONDS`.
    pub rescue_delay_seconds: i64,
    /// Added to the wall clock before phase-window checks, to absorb clock skew with
    /// the counterpart EVM chain. Zero in production.
    pub slack_seconds: i64,
    /// Gates `ensure_funded`'s faucet top-up path. Must stay false outside testnets.
    pub faucet_enabled: bool,
    pub faucet_endpoint: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(?path, "loaded .env file");
        }

        Ok(Self {
            network_endpoint: required("NETWORK_ENDPOINT")?,
            listen_port: parse_or_default("LISTEN_PORT", 8080)?,
            rescue_delay_seconds: parse_or_default("RESCUE_DELAY_SECONDS", DEFAULT_RESCUE_DELAY_SECONDS)?,
            slack_seconds: parse_or_default("SLACK_SECONDS", DEFAULT_SLACK_SECONDS)?,
            faucet_enabled: parse_or_default("FAUCET_ENABLED", false)?,
            faucet_endpoint: env::var("FAUCET_ENDPOINT").ok(),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_or_default<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
