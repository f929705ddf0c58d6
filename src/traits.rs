// src/traits.rs

use crate::errors::{AuthError, TransportError, VenueError};
use crate::models::{
    Candle, Credentials, Direction, Instrument, MarketKind, OpenTrade, OrderId, Settlement,
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Write half of a duplex text-frame transport.
#[async_trait]
pub trait FrameSink: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self);
}

/// Read half of a duplex text-frame transport. `None` means the peer closed
/// the stream.
#[async_trait]
pub trait FrameStream: Send {
    async fn next(&mut self) -> Option<Result<String, TransportError>>;
}

/// A freshly opened transport, already split so the connection actor can
/// write while a read is parked in its select loop.
pub type TransportPair = (Box<dyn FrameSink>, Box<dyn FrameStream>);

/// Opens fresh transports. The reconnect loop calls this for every attempt,
/// so tests can script a connector that fails once and then succeeds.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<TransportPair, TransportError>;
}

/// Result of the HTTP credential exchange.
#[derive(Clone, Debug)]
pub enum LoginOutcome {
    /// Venue issued a session id directly.
    Session { ssid: String },
    /// Venue challenged with an out-of-band one-time code; `token`
    /// identifies the challenge for the verify call.
    CodeRequired { token: String },
}

/// The out-of-band authentication flow (login + one-time-code verify).
#[async_trait]
pub trait AuthFlow: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AuthError>;

    /// Exchanges a challenge token plus operator-supplied code for a session
    /// id. A wrong code yields the retryable `AuthError::CodeRejected`.
    async fn verify(&self, token: &str, code: &str) -> Result<String, AuthError>;
}

/// High-level venue operations the catalog and the execution coordinator
/// depend on. `VenueClient` implements this over the live connection; tests
/// substitute mocks.
#[async_trait]
pub trait Venue: Send + Sync {
    /// Current instrument schedule and payouts across all market kinds.
    async fn instruments(&self) -> Result<Vec<Instrument>, VenueError>;

    /// The most recent `count` closed candles for a symbol.
    async fn recent_candles(
        &self,
        symbol: &str,
        period_secs: u32,
        count: u32,
    ) -> Result<Vec<Candle>, VenueError>;

    /// Subscribes to the closed-candle stream for a symbol. The channel
    /// survives reconnects (subscriptions are replayed automatically).
    async fn candle_stream(
        &self,
        symbol: &str,
        period_secs: u32,
    ) -> Result<mpsc::Receiver<Candle>, VenueError>;

    /// Places a fixed-expiry option. Declines surface as
    /// `VenueError::OrderDeclined`.
    async fn place_option(
        &self,
        symbol: &str,
        kind: MarketKind,
        direction: Direction,
        stake: f64,
        duration_minutes: u32,
    ) -> Result<OpenTrade, VenueError>;

    /// Polls a placed order once. `None` while the trade is still open.
    async fn check_result(&self, order_id: OrderId) -> Result<Option<Settlement>, VenueError>;
}

/// Shared handle used by the catalog and executor.
pub type SharedVenue = Arc<dyn Venue>;
