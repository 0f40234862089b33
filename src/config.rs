//! Environment-driven configuration.

use crate::domain::Decimal;
use crate::engine::PositionPolicy;
use crate::stream::{StreamConfig, Subscription};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub ws_url: String,
    pub account_id: String,
    /// Cap on discrete buy additions into one position.
    pub max_splits: u32,
    /// Take-profit offset from average cost, e.g. 0.10.
    pub target_pct: Decimal,
    /// Stop-loss offset from average cost, e.g. -0.10.
    pub stop_pct: Decimal,
    /// Applied when a fill packet carries zero commission.
    pub default_buy_commission: Decimal,
    pub default_sell_commission: Decimal,
    pub default_sell_tax: Decimal,
    pub backoff_floor_ms: u64,
    pub backoff_cap_ms: u64,
    pub read_timeout_ms: u64,
    /// Token file handed to the credential provider; never read ambiently.
    pub access_token_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let ws_url = env_map
            .get("WS_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("WS_URL".to_string()))?;
        let parsed = url::Url::parse(&ws_url).map_err(|e| {
            ConfigError::InvalidValue("WS_URL".to_string(), e.to_string())
        })?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidValue(
                "WS_URL".to_string(),
                "scheme must be ws or wss".to_string(),
            ));
        }

        let account_id = env_map
            .get("ACCOUNT_ID")
            .cloned()
            .unwrap_or_else(|| "ACC1".to_string());

        let max_splits = parse_number(&env_map, "MAX_SPLITS", "4")?;
        let target_pct = parse_decimal(&env_map, "TARGET_PCT", "0.10")?;
        let stop_pct = parse_decimal(&env_map, "STOP_PCT", "-0.10")?;
        let default_buy_commission = parse_decimal(&env_map, "DEFAULT_BUY_COMMISSION", "0.00")?;
        let default_sell_commission = parse_decimal(&env_map, "DEFAULT_SELL_COMMISSION", "0.00")?;
        let default_sell_tax = parse_decimal(&env_map, "DEFAULT_SELL_TAX", "0.00")?;
        let backoff_floor_ms = parse_number(&env_map, "RECONNECT_BACKOFF_MS", "1000")?;
        let backoff_cap_ms = parse_number(&env_map, "RECONNECT_BACKOFF_MAX_MS", "30000")?;
        let read_timeout_ms = parse_number(&env_map, "READ_TIMEOUT_MS", "45000")?;
        let access_token_path = env_map.get("ACCESS_TOKEN_PATH").cloned();

        Ok(Config {
            database_path,
            ws_url,
            account_id,
            max_splits,
            target_pct,
            stop_pct,
            default_buy_commission,
            default_sell_commission,
            default_sell_tax,
            backoff_floor_ms,
            backoff_cap_ms,
            read_timeout_ms,
            access_token_path,
        })
    }

    /// Sizing policy for the position aggregator.
    pub fn position_policy(&self) -> PositionPolicy {
        PositionPolicy {
            max_splits: self.max_splits,
            target_pct: self.target_pct,
            stop_pct: self.stop_pct,
        }
    }

    /// Connection settings for the stream supervisor.
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            ws_url: self.ws_url.clone(),
            backoff_floor: Duration::from_millis(self.backoff_floor_ms),
            backoff_cap: Duration::from_millis(self.backoff_cap_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            subscription: Subscription::order_executions(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), "must be a valid number".to_string()))
}

fn parse_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<Decimal, ConfigError> {
    let raw = env_map.get(key).map(|s| s.as_str()).unwrap_or(default);
    Decimal::from_str_canonical(raw).map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), "must be a valid decimal".to_string())
    })
}
