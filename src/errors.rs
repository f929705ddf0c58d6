// src/errors.rs
//
// Error taxonomy for the session and execution layers. Transport failures
// trigger reconnection; everything else is local to a single call or a
// single instrument's trading cycle.

use thiserror::Error;

/// Socket-level failures. These put the connection into reconnect.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("connection closed by peer: {0}")]
    Closed(String),

    #[error("heartbeat timeout")]
    HeartbeatTimeout,
}

/// Authentication failures. Fatal except where noted.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Venue rejected the credentials outright.
    #[error("credentials rejected: {0}")]
    CredentialsRejected(String),

    /// A submitted one-time code was rejected. Retryable: the session stays
    /// in the awaiting-verification state.
    #[error("verification code rejected")]
    CodeRejected,

    /// No valid code arrived within the configured window.
    #[error("verification window expired")]
    VerificationTimedOut,

    /// No verification is pending (a code was submitted outside the
    /// awaiting-verification state).
    #[error("no verification pending")]
    NoVerificationPending,

    #[error("auth endpoint error: {0}")]
    Endpoint(String),
}

/// Errors surfaced by the connection manager and the execution layer.
#[derive(Debug, Error)]
pub enum VenueError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed frame. Logged and dropped at the read loop; surfaced only
    /// when a caller's own response fails to decode.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A specific pending request exceeded its deadline. The connection
    /// itself is unaffected.
    #[error("request timed out")]
    Timeout,

    /// The connection dropped while this request was in flight.
    #[error("connection lost")]
    ConnectionLost,

    /// Reconnection attempts were exhausted. The only fatal failure path.
    #[error("reconnect attempts exhausted after {attempts} tries")]
    ReconnectExhausted { attempts: u32 },

    /// Session shutdown interrupted the call.
    #[error("cancelled by shutdown")]
    Cancelled,

    /// The venue refused an order placement.
    #[error("order declined: {0}")]
    OrderDeclined(String),

    /// The daily trade cap (or a concurrency cap) refused the placement.
    #[error("trade cap reached")]
    CapReached,

    /// The response arrived but was not the kind the request expects.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl VenueError {
    /// True for errors that abort the whole run loop rather than one cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            VenueError::ReconnectExhausted { .. }
                | VenueError::Auth(AuthError::CredentialsRejected(_))
                | VenueError::Auth(AuthError::VerificationTimedOut)
        )
    }
}
