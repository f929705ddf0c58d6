// src/config.rs
//
// TOML configuration. Credentials never live here; they come from the
// environment so a shared config file cannot leak them.

use crate::connection::ConnectionConfig;
use crate::executor::ExecutorConfig;
use crate::models::BalanceMode;
use crate::strategy::{BandConfig, EntryRule};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Configuration Types
// =============================================================================

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub connection: ConnectionSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct AccountConfig {
    /// Which balance the session trades against.
    #[serde(default)]
    pub balance_mode: BalanceMode,
}

#[derive(Debug, Deserialize)]
pub struct StrategyConfig {
    #[serde(default = "default_candle_period")]
    pub candle_period_seconds: u32,
    #[serde(default = "default_trade_duration")]
    pub trade_duration_minutes: u32,
    #[serde(default = "default_band_period")]
    pub band_period: usize,
    #[serde(default = "default_band_std_dev")]
    pub band_std_dev: f64,
    #[serde(default)]
    pub entry_rule: EntryRule,
    #[serde(default = "default_history_backfill")]
    pub history_backfill: u32,
    #[serde(default = "default_min_payout")]
    pub min_payout_pct: f64,
    #[serde(default = "default_max_daily_trades")]
    pub max_daily_trades: u32,
    #[serde(default = "default_min_active_trades")]
    pub min_active_trades: usize,
    #[serde(default = "default_base_stake")]
    pub base_stake: f64,
    #[serde(default = "default_martingale_factor")]
    pub martingale_factor: f64,
    #[serde(default = "default_max_martingale_level")]
    pub max_martingale_level: u32,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_rerank_interval")]
    pub rerank_interval_secs: u64,
    #[serde(default = "default_settlement_grace")]
    pub settlement_grace_secs: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        // An empty TOML table must hydrate every field default.
        toml::from_str("").expect("strategy defaults")
    }
}

fn default_candle_period() -> u32 {
    120
}
fn default_trade_duration() -> u32 {
    2
}
fn default_band_period() -> usize {
    7
}
fn default_band_std_dev() -> f64 {
    3.0
}
fn default_history_backfill() -> u32 {
    20
}
fn default_min_payout() -> f64 {
    70.0
}
fn default_max_daily_trades() -> u32 {
    15
}
fn default_min_active_trades() -> usize {
    4
}
fn default_base_stake() -> f64 {
    1.0
}
fn default_martingale_factor() -> f64 {
    2.5
}
fn default_max_martingale_level() -> u32 {
    2
}
fn default_top_n() -> usize {
    4
}
fn default_rerank_interval() -> u64 {
    300
}
fn default_settlement_grace() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct ConnectionSection {
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_verify_url")]
    pub verify_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_heartbeat_timeout")]
    pub heartbeat_timeout_secs: u64,
    #[serde(default = "default_verification_window")]
    pub verification_window_secs: u64,
    #[serde(default)]
    pub reconnect: ReconnectSection,
}

impl Default for ConnectionSection {
    fn default() -> Self {
        toml::from_str("").expect("connection defaults")
    }
}

fn default_ws_url() -> String {
    "wss://iqoption.com/echo/websocket".to_string()
}
fn default_login_url() -> String {
    "https://auth.iqoption.com/api/v2/login".to_string()
}
fn default_verify_url() -> String {
    "https://auth.iqoption.com/api/v2/verify/2fa".to_string()
}
fn default_request_timeout() -> u64 {
    10
}
fn default_heartbeat_timeout() -> u64 {
    30
}
fn default_verification_window() -> u64 {
    120
}

#[derive(Debug, Deserialize)]
pub struct ReconnectSection {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_secs: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        toml::from_str("").expect("reconnect defaults")
    }
}

fn default_initial_backoff() -> u64 {
    1
}
fn default_max_backoff() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    8
}

// =============================================================================
// Configuration Loading
// =============================================================================

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents =
            fs::read_to_string(&path).map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(s: &str) -> Result<Self, String> {
        toml::from_str(s).map_err(|e| format!("Failed to parse config: {}", e))
    }
}

impl StrategyConfig {
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            bands: BandConfig {
                period: self.band_period,
                std_dev: self.band_std_dev,
                entry_rule: self.entry_rule,
            },
            candle_period_secs: self.candle_period_seconds,
            trade_duration_minutes: self.trade_duration_minutes,
            history_backfill: self.history_backfill,
            base_stake: self.base_stake,
            martingale_factor: self.martingale_factor,
            max_martingale_level: self.max_martingale_level,
            max_daily_trades: self.max_daily_trades,
            min_active_trades: self.min_active_trades,
            top_n: self.top_n,
            rerank_interval: Duration::from_secs(self.rerank_interval_secs),
            settlement_grace: Duration::from_secs(self.settlement_grace_secs),
        }
    }
}

impl ConnectionSection {
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            heartbeat_timeout: Duration::from_secs(self.heartbeat_timeout_secs),
            verification_window: Duration::from_secs(self.verification_window_secs),
            initial_backoff: Duration::from_secs(self.reconnect.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.reconnect.max_backoff_secs),
            max_reconnect_attempts: self.reconnect.max_attempts,
        }
    }
}

// =============================================================================
// Default Configuration
// =============================================================================

/// Returns a default configuration string for documentation.
pub fn default_config_template() -> &'static str {
    r#"# bandbot configuration
#
# Credentials are read from the environment, never from this file:
#   BANDBOT_IDENTIFIER  account identifier
#   BANDBOT_SECRET      account secret

[account]
# "practice" or "real"
balance_mode = "practice"

[strategy]
candle_period_seconds = 120
trade_duration_minutes = 2
band_period = 7
band_std_dev = 3.0
# "middle-touch" or "outer-cross"
entry_rule = "middle-touch"
min_payout_pct = 70.0
max_daily_trades = 15
min_active_trades = 4
base_stake = 1.0
martingale_factor = 2.5
max_martingale_level = 2
top_n = 4
rerank_interval_secs = 300

[connection]
ws_url = "wss://iqoption.com/echo/websocket"
login_url = "https://auth.iqoption.com/api/v2/login"
verify_url = "https://auth.iqoption.com/api/v2/verify/2fa"
request_timeout_secs = 10
heartbeat_timeout_secs = 30
verification_window_secs = 120

[connection.reconnect]
initial_backoff_secs = 1
max_backoff_secs = 60
max_attempts = 8
"#
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.account.balance_mode, BalanceMode::Practice);
        assert_eq!(config.strategy.band_period, 7);
        assert_eq!(config.strategy.band_std_dev, 3.0);
        assert_eq!(config.strategy.max_daily_trades, 15);
        assert_eq!(config.strategy.martingale_factor, 2.5);
        assert_eq!(config.connection.reconnect.max_attempts, 8);
    }

    #[test]
    fn test_parse_overrides() {
        let config = Config::from_str(
            r#"
            [account]
            balance_mode = "real"

            [strategy]
            band_period = 14
            entry_rule = "outer-cross"
            max_daily_trades = 5

            [connection.reconnect]
            max_attempts = 3
        "#,
        )
        .unwrap();
        assert_eq!(config.account.balance_mode, BalanceMode::Real);
        assert_eq!(config.strategy.band_period, 14);
        assert_eq!(config.strategy.entry_rule, EntryRule::OuterCross);
        assert_eq!(config.strategy.max_daily_trades, 5);
        assert_eq!(config.connection.reconnect.max_attempts, 3);
        // Untouched sections keep defaults.
        assert_eq!(config.strategy.base_stake, 1.0);
        assert_eq!(config.connection.request_timeout_secs, 10);
    }

    #[test]
    fn test_template_parses() {
        let config = Config::from_str(default_config_template()).unwrap();
        assert_eq!(config.strategy.candle_period_seconds, 120);
        assert_eq!(config.connection.heartbeat_timeout_secs, 30);
    }

    #[test]
    fn test_executor_config_mapping() {
        let config = Config::from_str("[strategy]\nband_period = 9\n").unwrap();
        let exec = config.strategy.executor_config();
        assert_eq!(exec.bands.period, 9);
        assert_eq!(exec.rerank_interval, Duration::from_secs(300));
    }
}
