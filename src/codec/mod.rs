// src/codec/mod.rs
//
// Wire codec for the venue protocol. Every frame, in both directions, is a
// JSON envelope { "name", "request_id", "msg" }. Inbound frames are decoded
// exactly once here into the tagged ServerEvent enum; nothing downstream
// branches on raw JSON.

use crate::errors::VenueError;
use crate::models::{Candle, Direction, Instrument, MarketKind, Outcome, OrderId, Settlement};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// =============================================================================
// Outbound Requests
// =============================================================================

/// A request the client can send. `name()` and `payload()` produce the wire
/// envelope; the connection layer attaches the correlation id.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    /// Authenticate the socket with a session id obtained over HTTP.
    Authenticate { ssid: String },
    /// Fetch the most recent closed candles for a symbol.
    GetCandles {
        symbol: String,
        period_secs: u32,
        count: u32,
        to_ts: i64,
    },
    /// Subscribe to the closed-candle stream for a symbol.
    SubscribeCandles { symbol: String, period_secs: u32 },
    UnsubscribeCandles { symbol: String, period_secs: u32 },
    /// Fetch the instrument schedule/payout catalog.
    GetInitializationData,
    /// Select which balance the session trades against.
    ChangeBalance { balance_id: u64 },
    GetBalances,
    /// Place a fixed-expiry option.
    PlaceOption {
        symbol: String,
        kind: MarketKind,
        direction: Direction,
        stake: f64,
        duration_minutes: u32,
    },
    /// Poll the outcome of a placed option.
    CheckResult { order_id: OrderId },
    Heartbeat { ts: i64 },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Authenticate { .. } => "ssid",
            Request::GetCandles { .. } => "get-candles",
            Request::SubscribeCandles { .. } => "subscribe-candles",
            Request::UnsubscribeCandles { .. } => "unsubscribe-candles",
            Request::GetInitializationData => "get-initialization-data",
            Request::ChangeBalance { .. } => "change-balance",
            Request::GetBalances => "get-balances",
            Request::PlaceOption { .. } => "open-option",
            Request::CheckResult { .. } => "check-option-result",
            Request::Heartbeat { .. } => "heartbeat",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Request::Authenticate { ssid } => json!(ssid),
            Request::GetCandles {
                symbol,
                period_secs,
                count,
                to_ts,
            } => json!({
                "active": symbol,
                "size": period_secs,
                "count": count,
                "to": to_ts,
            }),
            Request::SubscribeCandles {
                symbol,
                period_secs,
            }
            | Request::UnsubscribeCandles {
                symbol,
                period_secs,
            } => json!({
                "active": symbol,
                "size": period_secs,
            }),
            Request::GetInitializationData => json!({}),
            Request::ChangeBalance { balance_id } => json!({ "balance_id": balance_id }),
            Request::GetBalances => json!({}),
            Request::PlaceOption {
                symbol,
                kind,
                direction,
                stake,
                duration_minutes,
            } => json!({
                "active": symbol,
                "option_type": kind,
                "direction": direction,
                "price": stake,
                "expired": duration_minutes,
            }),
            Request::CheckResult { order_id } => json!({ "id": order_id }),
            Request::Heartbeat { ts } => json!(ts),
        }
    }

    /// True if the payload may contain credential material. Such frames are
    /// never echoed into logs.
    pub fn is_sensitive(&self) -> bool {
        matches!(self, Request::Authenticate { .. })
    }
}

/// Encodes a request into a wire frame. The venue echoes request ids as
/// strings, so the id is stringified on the way out.
pub fn encode_request(request: &Request, id: u64) -> String {
    json!({
        "name": request.name(),
        "request_id": id.to_string(),
        "msg": request.payload(),
    })
    .to_string()
}

// =============================================================================
// Inbound Frames
// =============================================================================

/// Correlation id echoed by the venue. Arrives as a JSON string or integer
/// depending on the endpoint; both forms decode.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireId {
    Int(u64),
    Text(String),
}

impl WireId {
    fn as_u64(&self) -> Option<u64> {
        match self {
            WireId::Int(n) => Some(*n),
            WireId::Text(s) => s.parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    name: String,
    #[serde(default)]
    request_id: Option<WireId>,
    #[serde(default)]
    msg: Value,
}

/// One balance entry from the profile/balances payloads. `kind` 4 is the
/// venue's code for a practice balance, 1 for real.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct BalanceEntry {
    pub id: u64,
    #[serde(alias = "type")]
    pub kind: u8,
    pub amount: f64,
}

impl BalanceEntry {
    pub const KIND_REAL: u8 = 1;
    pub const KIND_PRACTICE: u8 = 4;
}

/// One instrument record from the initialization-data payload.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct InstrumentRecord {
    #[serde(alias = "active")]
    pub symbol: String,
    pub kind: MarketKind,
    #[serde(alias = "enabled")]
    pub open: bool,
    #[serde(alias = "profit_percent")]
    pub payout_pct: f64,
}

impl From<InstrumentRecord> for Instrument {
    fn from(r: InstrumentRecord) -> Self {
        Instrument::new(r.symbol, r.kind, r.open, r.payout_pct)
    }
}

/// A decoded inbound frame: the typed event plus the correlation id, when
/// the frame answers a specific request.
#[derive(Debug)]
pub struct Frame {
    pub request_id: Option<u64>,
    pub event: ServerEvent,
}

/// Every inbound payload shape, decoded once at this boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    Authenticated,
    Unauthorized { reason: String },
    Profile { balances: Vec<BalanceEntry> },
    Balances { balances: Vec<BalanceEntry> },
    BalanceChanged { id: u64, amount: f64 },
    CandleGenerated {
        symbol: String,
        candle: Candle,
        closed: bool,
    },
    Candles { data: Vec<Candle> },
    InitializationData { instruments: Vec<InstrumentRecord> },
    OptionOpened { order_id: OrderId, expires_ts: i64 },
    OptionRejected { reason: String },
    OptionClosed(Settlement),
    OptionPending { order_id: OrderId },
    TimeSync { ts: i64 },
    /// Generic success/failure acknowledgement (subscriptions, balance change).
    Ack { success: bool },
    /// Recognized envelope, unrecognized name. Dropped by the read loop.
    Unknown { name: String },
}

#[derive(Debug, Deserialize)]
struct CandleGeneratedMsg {
    #[serde(alias = "active")]
    symbol: String,
    #[serde(flatten)]
    candle: Candle,
    #[serde(default = "default_true")]
    closed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct OptionClosedMsg {
    #[serde(alias = "id")]
    order_id: OrderId,
    /// Venue vocabulary: "win" | "loose" | "equal".
    result: String,
    profit: f64,
    #[serde(default)]
    balance: Option<f64>,
}

impl OptionClosedMsg {
    fn into_settlement(self) -> Result<Settlement, VenueError> {
        let outcome = match self.result.as_str() {
            "win" => Outcome::Win,
            "loose" => Outcome::Loss,
            "equal" => Outcome::Tied,
            other => {
                return Err(VenueError::Protocol(format!(
                    "unknown option result: {other}"
                )))
            }
        };
        Ok(Settlement {
            order_id: self.order_id,
            outcome,
            profit: self.profit,
            balance: self.balance,
        })
    }
}

/// Decodes one inbound text frame. Any structural failure is a
/// `VenueError::Protocol`; the caller logs and drops those without
/// terminating the connection.
pub fn decode_frame(text: &str) -> Result<Frame, VenueError> {
    let raw: RawEnvelope = serde_json::from_str(text)
        .map_err(|e| VenueError::Protocol(format!("bad envelope: {e}")))?;
    let request_id = raw.request_id.as_ref().and_then(WireId::as_u64);
    let event = decode_event(&raw.name, raw.msg)?;
    Ok(Frame { request_id, event })
}

fn decode_event(name: &str, msg: Value) -> Result<ServerEvent, VenueError> {
    let bad = |e: serde_json::Error| VenueError::Protocol(format!("bad {name} payload: {e}"));
    let event = match name {
        "authenticated" => ServerEvent::Authenticated,
        "unauthorized" => ServerEvent::Unauthorized {
            reason: msg
                .as_str()
                .unwrap_or("session rejected")
                .to_string(),
        },
        "profile" => {
            #[derive(Deserialize)]
            struct ProfileMsg {
                #[serde(default)]
                balances: Vec<BalanceEntry>,
            }
            let p: ProfileMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::Profile {
                balances: p.balances,
            }
        }
        "balances" => {
            let balances: Vec<BalanceEntry> = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::Balances { balances }
        }
        "balance-changed" => {
            #[derive(Deserialize)]
            struct BalanceMsg {
                id: u64,
                amount: f64,
            }
            let b: BalanceMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::BalanceChanged {
                id: b.id,
                amount: b.amount,
            }
        }
        "candle-generated" => {
            let c: CandleGeneratedMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::CandleGenerated {
                symbol: c.symbol,
                candle: c.candle,
                closed: c.closed,
            }
        }
        "candles" => {
            #[derive(Deserialize)]
            struct CandlesMsg {
                data: Vec<Candle>,
            }
            let c: CandlesMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::Candles { data: c.data }
        }
        "initialization-data" => {
            #[derive(Deserialize)]
            struct InitMsg {
                instruments: Vec<InstrumentRecord>,
            }
            let i: InitMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::InitializationData {
                instruments: i.instruments,
            }
        }
        "option-opened" => {
            #[derive(Deserialize)]
            struct OpenedMsg {
                #[serde(alias = "id")]
                order_id: OrderId,
                #[serde(alias = "expired")]
                expires_ts: i64,
            }
            let o: OpenedMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::OptionOpened {
                order_id: o.order_id,
                expires_ts: o.expires_ts,
            }
        }
        "option-rejected" => ServerEvent::OptionRejected {
            reason: msg
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| msg.as_str())
                .unwrap_or("declined")
                .to_string(),
        },
        "option-closed" => {
            let o: OptionClosedMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::OptionClosed(o.into_settlement()?)
        }
        "option-pending" => {
            #[derive(Deserialize)]
            struct PendingMsg {
                #[serde(alias = "id")]
                order_id: OrderId,
            }
            let p: PendingMsg = serde_json::from_value(msg).map_err(bad)?;
            ServerEvent::OptionPending {
                order_id: p.order_id,
            }
        }
        "timeSync" => {
            let ts = msg
                .as_i64()
                .ok_or_else(|| VenueError::Protocol("timeSync payload not an integer".into()))?;
            ServerEvent::TimeSync { ts }
        }
        "result" => {
            let success = msg
                .get("success")
                .and_then(Value::as_bool)
                .or_else(|| msg.as_bool())
                .unwrap_or(false);
            ServerEvent::Ack { success }
        }
        other => ServerEvent::Unknown {
            name: other.to_string(),
        },
    };
    Ok(event)
}

// =============================================================================
// Topics
// =============================================================================

/// Subscription topics unsolicited events fan out under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Closed-candle stream for one symbol.
    Candles { symbol: String },
    /// Settlement pushes for any order.
    Options,
    /// Balance-changed pushes.
    Balance,
}

impl ServerEvent {
    /// The topic this event fans out under, if it is an unsolicited push.
    pub fn topic(&self) -> Option<Topic> {
        match self {
            ServerEvent::CandleGenerated { symbol, .. } => Some(Topic::Candles {
                symbol: symbol.clone(),
            }),
            ServerEvent::OptionClosed(_) => Some(Topic::Options),
            ServerEvent::BalanceChanged { .. } => Some(Topic::Balance),
            _ => None,
        }
    }
}
