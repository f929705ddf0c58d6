// src/models.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Market and Direction Types
// =============================================================================

/// Market kinds the venue lists instruments under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Binary,
    Turbo,
    Digital,
}

impl fmt::Display for MarketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketKind::Binary => write!(f, "binary"),
            MarketKind::Turbo => write!(f, "turbo"),
            MarketKind::Digital => write!(f, "digital"),
        }
    }
}

/// Trade direction. The venue vocabulary is "call"/"put".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Call => "call",
            Direction::Put => "put",
        }
    }

}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Instruments
// =============================================================================

/// Suffix the venue appends to over-the-counter listings ("EURUSD-OTC").
pub const OTC_SUFFIX: &str = "-OTC";

/// A tradable instrument as reported by the venue catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub kind: MarketKind,
    pub open: bool,
    /// Payout percentage for a winning trade (e.g. 85.0).
    pub payout_pct: f64,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, kind: MarketKind, open: bool, payout_pct: f64) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
            open,
            payout_pct,
        }
    }

    pub fn is_otc(&self) -> bool {
        self.symbol.ends_with(OTC_SUFFIX)
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.symbol)
    }
}

/// Returns the OTC counterpart of a plain symbol ("EURUSD" -> "EURUSD-OTC").
/// A symbol that is already OTC is returned unchanged.
pub fn otc_variant(symbol: &str) -> String {
    if symbol.ends_with(OTC_SUFFIX) {
        symbol.to_string()
    } else {
        format!("{}{}", symbol, OTC_SUFFIX)
    }
}

// =============================================================================
// Candles
// =============================================================================

/// A closed candle. Timestamps are unix seconds for the candle start.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    #[serde(alias = "from")]
    pub ts: i64,
    pub open: f64,
    #[serde(alias = "max")]
    pub high: f64,
    #[serde(alias = "min")]
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn is_green(&self) -> bool {
        self.close > self.open
    }

    pub fn is_red(&self) -> bool {
        self.close < self.open
    }

    /// Lower edge of the candle body (ignores wicks, as the entry rule does).
    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Upper edge of the candle body.
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }
}

// =============================================================================
// Trades and Settlement
// =============================================================================

/// Terminal result of a settled trade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Tied,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Tied => write!(f, "tied"),
        }
    }
}

/// Order ID assigned by the venue.
pub type OrderId = u64;

/// A live position awaiting settlement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenTrade {
    pub symbol: String,
    pub kind: MarketKind,
    pub direction: Direction,
    pub stake: f64,
    pub order_id: OrderId,
    pub placed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Settlement of an open trade, as reported by the venue.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub order_id: OrderId,
    pub outcome: Outcome,
    /// Signed profit/loss for the trade.
    pub profit: f64,
    /// Account balance after settlement, when the venue reports one.
    pub balance: Option<f64>,
}

// =============================================================================
// Account
// =============================================================================

/// Which balance the session trades against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMode {
    #[default]
    Practice,
    Real,
}

impl fmt::Display for BalanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BalanceMode::Practice => write!(f, "practice"),
            BalanceMode::Real => write!(f, "real"),
        }
    }
}

/// Account credentials. Debug is implemented by hand so the secret can never
/// leak through an error or log line.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otc_variant() {
        assert_eq!(otc_variant("EURUSD"), "EURUSD-OTC");
        assert_eq!(otc_variant("EURUSD-OTC"), "EURUSD-OTC");
    }

    #[test]
    fn test_candle_body() {
        let green = Candle {
            ts: 0,
            open: 1.0,
            high: 1.5,
            low: 0.9,
            close: 1.2,
        };
        assert!(green.is_green());
        assert_eq!(green.body_low(), 1.0);
        assert_eq!(green.body_high(), 1.2);

        let red = Candle {
            ts: 0,
            open: 1.2,
            high: 1.5,
            low: 0.9,
            close: 1.0,
        };
        assert!(red.is_red());
        assert_eq!(red.body_low(), 1.0);
        assert_eq!(red.body_high(), 1.2);
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new("user@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_candle_field_aliases() {
        // The venue sends "from"/"max"/"min" for ts/high/low.
        let json = r#"{"from": 1700000000, "open": 1.1, "max": 1.2, "min": 1.0, "close": 1.15}"#;
        let candle: Candle = serde_json::from_str(json).unwrap();
        assert_eq!(candle.ts, 1700000000);
        assert_eq!(candle.high, 1.2);
        assert_eq!(candle.low, 1.0);
    }
}
