// src/connection/mod.rs
//
// The connection manager. One actor task owns the transport, the session
// state machine, and the request-correlation table; the cloneable
// `VenueClient` handle talks to it over a command channel. Only the actor
// ever runs a handshake or reconnect sequence, which makes the mutual
// exclusion requirement structural rather than lock-based.

pub mod auth;
pub mod transport;

pub use auth::HttpAuth;
pub use transport::WsConnector;

use crate::codec::{decode_frame, encode_request, Request, ServerEvent, Topic};
use crate::errors::{AuthError, TransportError, VenueError};
use crate::models::{
    BalanceMode, Candle, Credentials, Direction, Instrument, MarketKind, OpenTrade, OrderId,
    Settlement,
};
use crate::traits::{AuthFlow, Connector, FrameSink, FrameStream, LoginOutcome, Venue};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, timeout, Instant, MissedTickBehavior};

const CMD_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 256;

// =============================================================================
// Session State and Configuration
// =============================================================================

/// Where the session currently is. Observable through `state_watch`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Authenticating,
    AwaitingVerificationCode,
    Connected,
    Reconnecting,
}

#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Deadline for a single request/response round trip.
    pub request_timeout: Duration,
    /// Silence on the socket longer than this triggers a reconnect.
    pub heartbeat_timeout: Duration,
    /// How long the session waits in AwaitingVerificationCode for a code.
    pub verification_window: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            heartbeat_timeout: Duration::from_secs(30),
            verification_window: Duration::from_secs(120),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            max_reconnect_attempts: 8,
        }
    }
}

// =============================================================================
// Client Handle
// =============================================================================

enum Command {
    Request {
        request: Request,
        reply: oneshot::Sender<Result<ServerEvent, VenueError>>,
    },
    Subscribe {
        topic: Topic,
        /// Request to (re)issue so the venue starts pushing this topic.
        /// Replayed automatically after every reconnect.
        replay: Option<Request>,
        tx: mpsc::Sender<ServerEvent>,
        ack: oneshot::Sender<Result<(), VenueError>>,
    },
    SubmitCode {
        code: String,
        reply: oneshot::Sender<Result<(), VenueError>>,
    },
    Disconnect,
}

/// Cloneable handle to one venue session.
#[derive(Clone)]
pub struct VenueClient {
    cmd_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<SessionState>,
    fatal: Arc<Mutex<Option<VenueError>>>,
    request_timeout: Duration,
}

impl VenueClient {
    /// Starts the connection actor. The handshake begins immediately; await
    /// `wait_connected` (and feed `submit_verification_code` if the venue
    /// challenges) before trading.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        auth: Arc<dyn AuthFlow>,
        credentials: Credentials,
        cfg: ConnectionConfig,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(CMD_BUFFER);
        let (state_tx, state_rx) = watch::channel(SessionState::Authenticating);
        let fatal = Arc::new(Mutex::new(None));
        let request_timeout = cfg.request_timeout;

        let actor = ConnectionActor {
            connector,
            auth,
            credentials,
            cfg,
            cmd_rx,
            state_tx,
            fatal: fatal.clone(),
            pending: HashMap::new(),
            subs: HashMap::new(),
            next_id: 1,
            ssid: None,
        };
        tokio::spawn(actor.run());

        Self {
            cmd_tx,
            state_rx,
            fatal,
            request_timeout,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_rx.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_rx.clone()
    }

    /// Blocks until the session reaches Connected, or fails with the fatal
    /// error if the session dies first.
    pub async fn wait_connected(&self) -> Result<(), VenueError> {
        let mut rx = self.state_rx.clone();
        loop {
            match *rx.borrow_and_update() {
                SessionState::Connected => return Ok(()),
                SessionState::Disconnected => return Err(self.takedown_error()),
                _ => {}
            }
            if rx.changed().await.is_err() {
                return Err(self.takedown_error());
            }
        }
    }

    /// Sends a request and awaits its correlated response.
    pub async fn send(&self, request: Request) -> Result<ServerEvent, VenueError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Request {
                request,
                reply: tx,
            })
            .await
            .map_err(|_| self.takedown_error())?;
        match timeout(self.request_timeout, rx).await {
            Err(_) => Err(VenueError::Timeout),
            Ok(Err(_)) => Err(self.takedown_error()),
            Ok(Ok(result)) => result,
        }
    }

    /// Registers a subscriber for a topic. `replay`, when given, is sent now
    /// and again after every reconnect. The receiver survives reconnects.
    pub async fn subscribe(
        &self,
        topic: Topic,
        replay: Option<Request>,
    ) -> Result<mpsc::Receiver<ServerEvent>, VenueError> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let (ack_tx, ack_rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Subscribe {
                topic,
                replay,
                tx,
                ack: ack_tx,
            })
            .await
            .map_err(|_| self.takedown_error())?;
        ack_rx.await.map_err(|_| self.takedown_error())??;
        Ok(rx)
    }

    /// Supplies the out-of-band one-time code while the session is in
    /// AwaitingVerificationCode. A rejected code is retryable; the state is
    /// unchanged.
    pub async fn submit_verification_code(&self, code: &str) -> Result<(), VenueError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SubmitCode {
                code: code.to_string(),
                reply: tx,
            })
            .await
            .map_err(|_| self.takedown_error())?;
        rx.await.map_err(|_| self.takedown_error())?
    }

    /// Selects the balance the session trades against; returns its amount.
    pub async fn change_balance_mode(&self, mode: BalanceMode) -> Result<f64, VenueError> {
        let balances = match self.send(Request::GetBalances).await? {
            ServerEvent::Balances { balances } | ServerEvent::Profile { balances } => balances,
            other => return Err(unexpected(&other)),
        };
        let kind = match mode {
            BalanceMode::Practice => crate::codec::BalanceEntry::KIND_PRACTICE,
            BalanceMode::Real => crate::codec::BalanceEntry::KIND_REAL,
        };
        let entry = balances
            .iter()
            .find(|b| b.kind == kind)
            .ok_or_else(|| VenueError::UnexpectedResponse(format!("no {mode} balance listed")))?;
        match self
            .send(Request::ChangeBalance {
                balance_id: entry.id,
            })
            .await?
        {
            ServerEvent::Ack { success: true } => Ok(entry.amount),
            ServerEvent::Ack { success: false } => Err(VenueError::UnexpectedResponse(
                "balance change refused".into(),
            )),
            other => Err(unexpected(&other)),
        }
    }

    /// Explicit shutdown. Pending requests fail with `Cancelled`.
    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Disconnect).await;
    }

    fn takedown_error(&self) -> VenueError {
        self.fatal
            .lock()
            .expect("fatal mutex poisoned")
            .take()
            .unwrap_or(VenueError::ConnectionLost)
    }
}

fn unexpected(event: &ServerEvent) -> VenueError {
    VenueError::UnexpectedResponse(format!("{event:?}"))
}

// =============================================================================
// Venue Implementation
// =============================================================================

#[async_trait]
impl Venue for VenueClient {
    async fn instruments(&self) -> Result<Vec<Instrument>, VenueError> {
        match self.send(Request::GetInitializationData).await? {
            ServerEvent::InitializationData { instruments } => {
                Ok(instruments.into_iter().map(Instrument::from).collect())
            }
            other => Err(unexpected(&other)),
        }
    }

    async fn recent_candles(
        &self,
        symbol: &str,
        period_secs: u32,
        count: u32,
    ) -> Result<Vec<Candle>, VenueError> {
        let request = Request::GetCandles {
            symbol: symbol.to_string(),
            period_secs,
            count,
            to_ts: Utc::now().timestamp(),
        };
        match self.send(request).await? {
            ServerEvent::Candles { data } => Ok(data),
            other => Err(unexpected(&other)),
        }
    }

    async fn candle_stream(
        &self,
        symbol: &str,
        period_secs: u32,
    ) -> Result<mpsc::Receiver<Candle>, VenueError> {
        let topic = Topic::Candles {
            symbol: symbol.to_string(),
        };
        let replay = Request::SubscribeCandles {
            symbol: symbol.to_string(),
            period_secs,
        };
        let mut events = self.subscribe(topic, Some(replay)).await?;

        // Narrow the raw event stream down to closed candles.
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let client = self.clone();
        let symbol = symbol.to_string();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let ServerEvent::CandleGenerated {
                    candle,
                    closed: true,
                    ..
                } = event
                {
                    if tx.send(candle).await.is_err() {
                        break;
                    }
                }
            }
            // Consumer walked away (or the session ended); tell the venue to
            // stop pushing the feed.
            let _ = client
                .send(Request::UnsubscribeCandles { symbol, period_secs })
                .await;
        });
        Ok(rx)
    }

    async fn place_option(
        &self,
        symbol: &str,
        kind: MarketKind,
        direction: Direction,
        stake: f64,
        duration_minutes: u32,
    ) -> Result<OpenTrade, VenueError> {
        let request = Request::PlaceOption {
            symbol: symbol.to_string(),
            kind,
            direction,
            stake,
            duration_minutes,
        };
        match self.send(request).await? {
            ServerEvent::OptionOpened {
                order_id,
                expires_ts,
            } => {
                let placed_at = Utc::now();
                let expires_at = Utc
                    .timestamp_opt(expires_ts, 0)
                    .single()
                    .unwrap_or(placed_at + chrono::Duration::minutes(duration_minutes as i64));
                Ok(OpenTrade {
                    symbol: symbol.to_string(),
                    kind,
                    direction,
                    stake,
                    order_id,
                    placed_at,
                    expires_at,
                })
            }
            ServerEvent::OptionRejected { reason } => Err(VenueError::OrderDeclined(reason)),
            other => Err(unexpected(&other)),
        }
    }

    async fn check_result(&self, order_id: OrderId) -> Result<Option<Settlement>, VenueError> {
        match self.send(Request::CheckResult { order_id }).await? {
            ServerEvent::OptionClosed(settlement) => Ok(Some(settlement)),
            ServerEvent::OptionPending { .. } => Ok(None),
            other => Err(unexpected(&other)),
        }
    }
}

// =============================================================================
// The Connection Actor
// =============================================================================

#[derive(Default)]
struct SubEntry {
    replay: Option<Request>,
    senders: Vec<mpsc::Sender<ServerEvent>>,
}

enum Exit {
    Shutdown,
    Lost(TransportError),
}

struct ConnectionActor {
    connector: Arc<dyn Connector>,
    auth: Arc<dyn AuthFlow>,
    credentials: Credentials,
    cfg: ConnectionConfig,
    cmd_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<SessionState>,
    fatal: Arc<Mutex<Option<VenueError>>>,
    /// Correlation table: request id -> completer. Owned by the actor, so
    /// insert/remove never contend and nothing is held across an await.
    pending: HashMap<u64, oneshot::Sender<Result<ServerEvent, VenueError>>>,
    subs: HashMap<Topic, SubEntry>,
    next_id: u64,
    /// Session id from the last successful login, reused across reconnects.
    ssid: Option<String>,
}

impl ConnectionActor {
    async fn run(mut self) {
        let (mut sink, mut stream) = match self.establish().await {
            Ok(pair) => pair,
            Err(e) => return self.finish_fatal(e),
        };

        loop {
            match self.serve(&mut sink, &mut stream).await {
                Exit::Shutdown => {
                    sink.close().await;
                    self.fail_all_pending(|| VenueError::Cancelled);
                    self.set_state(SessionState::Disconnected);
                    info!("session closed");
                    return;
                }
                Exit::Lost(err) => {
                    warn!("transport lost: {err}");
                    self.fail_all_pending(|| VenueError::ConnectionLost);
                    self.set_state(SessionState::Reconnecting);
                    match self.reconnect().await {
                        Ok(pair) => (sink, stream) = pair,
                        Err(e) => return self.finish_fatal(e),
                    }
                }
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        let _ = self.state_tx.send(state);
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn finish_fatal(mut self, err: VenueError) {
        error!("session failed terminally: {err}");
        self.fail_all_pending(|| VenueError::ConnectionLost);
        *self.fatal.lock().expect("fatal mutex poisoned") = Some(err);
        self.set_state(SessionState::Disconnected);
    }

    fn fail_all_pending(&mut self, make_err: impl Fn() -> VenueError) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(make_err()));
        }
    }

    // -------------------------------------------------------------------------
    // Handshake
    // -------------------------------------------------------------------------

    /// Full handshake: (re-)login if needed, open the transport, authenticate
    /// the socket, replay subscriptions. On success the state is Connected.
    async fn establish(&mut self) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), VenueError> {
        self.set_state(SessionState::Authenticating);
        let mut reused_session = self.ssid.is_some();

        loop {
            let ssid = match self.ssid.clone() {
                Some(ssid) => ssid,
                None => {
                    let ssid = self.login_flow().await?;
                    self.set_state(SessionState::Authenticating);
                    self.ssid = Some(ssid.clone());
                    reused_session = false;
                    ssid
                }
            };

            let (mut sink, mut stream) = self.connector.open().await.map_err(VenueError::from)?;
            let id = self.alloc_id();
            sink.send(encode_request(&Request::Authenticate { ssid }, id))
                .await
                .map_err(VenueError::from)?;

            match self.await_socket_auth(&mut stream).await {
                Ok(()) => {
                    self.replay_subscriptions(&mut sink).await?;
                    self.set_state(SessionState::Connected);
                    info!("session connected");
                    return Ok((sink, stream));
                }
                Err(VenueError::Auth(_)) if reused_session => {
                    info!("stored session rejected, running full login");
                    self.ssid = None;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// HTTP login, driving the one-time-code exchange when challenged.
    async fn login_flow(&mut self) -> Result<String, VenueError> {
        match self.auth.login(&self.credentials).await? {
            LoginOutcome::Session { ssid } => Ok(ssid),
            LoginOutcome::CodeRequired { token } => {
                self.set_state(SessionState::AwaitingVerificationCode);
                info!("awaiting verification code");
                let deadline = Instant::now() + self.cfg.verification_window;

                loop {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(AuthError::VerificationTimedOut.into());
                    }
                    let cmd = match timeout(remaining, self.cmd_rx.recv()).await {
                        Err(_) => return Err(AuthError::VerificationTimedOut.into()),
                        Ok(None) | Ok(Some(Command::Disconnect)) => {
                            return Err(VenueError::Cancelled)
                        }
                        Ok(Some(cmd)) => cmd,
                    };
                    match cmd {
                        Command::SubmitCode { code, reply } => {
                            match self.auth.verify(&token, &code).await {
                                Ok(ssid) => {
                                    let _ = reply.send(Ok(()));
                                    return Ok(ssid);
                                }
                                Err(AuthError::CodeRejected) => {
                                    info!("verification code rejected, still waiting");
                                    let _ = reply.send(Err(AuthError::CodeRejected.into()));
                                }
                                Err(e) => {
                                    let _ = reply
                                        .send(Err(AuthError::Endpoint(e.to_string()).into()));
                                    return Err(e.into());
                                }
                            }
                        }
                        Command::Request { reply, .. } => {
                            let _ = reply.send(Err(VenueError::ConnectionLost));
                        }
                        Command::Subscribe {
                            topic,
                            replay,
                            tx,
                            ack,
                        } => {
                            self.register_subscriber(topic, replay, tx);
                            let _ = ack.send(Ok(()));
                        }
                        Command::Disconnect => unreachable!("handled above"),
                    }
                }
            }
        }
    }

    /// Waits for the venue to accept the ssid on the freshly opened socket.
    async fn await_socket_auth(
        &mut self,
        stream: &mut Box<dyn FrameStream>,
    ) -> Result<(), VenueError> {
        let deadline = Instant::now() + self.cfg.request_timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(VenueError::Timeout);
            }
            let frame = match timeout(remaining, stream.next()).await {
                Err(_) => return Err(VenueError::Timeout),
                Ok(None) => {
                    return Err(TransportError::Closed("closed during auth".into()).into())
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(text))) => match decode_frame(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("dropping malformed frame during auth: {e}");
                        continue;
                    }
                },
            };
            match frame.event {
                ServerEvent::Authenticated => return Ok(()),
                ServerEvent::Unauthorized { reason } => {
                    return Err(AuthError::CredentialsRejected(reason).into())
                }
                // Profile, timeSync and other pushes can precede the ack.
                _ => continue,
            }
        }
    }

    async fn replay_subscriptions(
        &mut self,
        sink: &mut Box<dyn FrameSink>,
    ) -> Result<(), VenueError> {
        let replays: Vec<Request> = self
            .subs
            .values()
            .filter_map(|entry| entry.replay.clone())
            .collect();
        for request in replays {
            let id = self.alloc_id();
            debug!("replaying subscription: {}", request.name());
            sink.send(encode_request(&request, id))
                .await
                .map_err(VenueError::from)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Serve Loop
    // -------------------------------------------------------------------------

    async fn serve(
        &mut self,
        sink: &mut Box<dyn FrameSink>,
        stream: &mut Box<dyn FrameStream>,
    ) -> Exit {
        let mut last_frame = Instant::now();
        let period = (self.cfg.heartbeat_timeout / 3).max(Duration::from_secs(1));
        let mut tick = interval(period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tick.reset();

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Disconnect) => return Exit::Shutdown,
                    Some(Command::Request { request, reply }) => {
                        let id = self.alloc_id();
                        if !request.is_sensitive() {
                            debug!("-> {} (id {id})", request.name());
                        }
                        let text = encode_request(&request, id);
                        self.pending.insert(id, reply);
                        if let Err(e) = sink.send(text).await {
                            return Exit::Lost(e);
                        }
                    }
                    Some(Command::Subscribe { topic, replay, tx, ack }) => {
                        if let Some(request) = &replay {
                            let id = self.alloc_id();
                            if let Err(e) = sink.send(encode_request(request, id)).await {
                                let _ = ack.send(Err(VenueError::ConnectionLost));
                                return Exit::Lost(e);
                            }
                        }
                        self.register_subscriber(topic, replay, tx);
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::SubmitCode { reply, .. }) => {
                        let _ = reply.send(Err(AuthError::NoVerificationPending.into()));
                    }
                },
                frame = stream.next() => match frame {
                    None => return Exit::Lost(TransportError::Closed("stream ended".into())),
                    Some(Err(e)) => return Exit::Lost(e),
                    Some(Ok(text)) => {
                        last_frame = Instant::now();
                        if let Some(exit) = self.route(&text) {
                            return exit;
                        }
                    }
                },
                _ = tick.tick() => {
                    // Purge correlation entries whose caller timed out; the
                    // venue may never answer those ids.
                    self.pending.retain(|id, reply| {
                        if reply.is_closed() {
                            debug!("sweeping abandoned request {id}");
                            false
                        } else {
                            true
                        }
                    });
                    if last_frame.elapsed() > self.cfg.heartbeat_timeout {
                        return Exit::Lost(TransportError::HeartbeatTimeout);
                    }
                    let id = self.alloc_id();
                    let heartbeat = encode_request(
                        &Request::Heartbeat { ts: Utc::now().timestamp_millis() },
                        id,
                    );
                    if let Err(e) = sink.send(heartbeat).await {
                        return Exit::Lost(e);
                    }
                }
            }
        }
    }

    /// Decodes and dispatches one inbound frame. Responses resolve exactly
    /// one pending request; pushes fan out to topic subscribers; malformed
    /// frames are logged and dropped.
    fn route(&mut self, text: &str) -> Option<Exit> {
        let frame = match decode_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("dropping malformed frame: {e}");
                return None;
            }
        };

        if let ServerEvent::Unauthorized { reason } = &frame.event {
            warn!("session invalidated by venue: {reason}");
            self.ssid = None;
            return Some(Exit::Lost(TransportError::Closed(format!(
                "session invalidated: {reason}"
            ))));
        }

        if let Some(id) = frame.request_id {
            if let Some(reply) = self.pending.remove(&id) {
                if reply.send(Ok(frame.event)).is_err() {
                    debug!("response {id} arrived after caller gave up");
                }
                return None;
            }
        }

        if let Some(topic) = frame.event.topic() {
            if let Some(entry) = self.subs.get_mut(&topic) {
                entry.senders.retain(|tx| match tx.try_send(frame.event.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!("subscriber lagging on {topic:?}, dropping event");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
                if entry.senders.is_empty() {
                    self.subs.remove(&topic);
                }
            }
        } else if frame.request_id.is_some() {
            debug!("dropping unmatched response");
        }
        None
    }

    fn register_subscriber(
        &mut self,
        topic: Topic,
        replay: Option<Request>,
        tx: mpsc::Sender<ServerEvent>,
    ) {
        let entry = self.subs.entry(topic).or_default();
        if replay.is_some() {
            entry.replay = replay;
        }
        entry.senders.push(tx);
    }

    // -------------------------------------------------------------------------
    // Reconnection
    // -------------------------------------------------------------------------

    async fn reconnect(
        &mut self,
    ) -> Result<(Box<dyn FrameSink>, Box<dyn FrameStream>), VenueError> {
        let mut delay = self.cfg.initial_backoff;
        let attempts = self.cfg.max_reconnect_attempts;

        for attempt in 1..=attempts {
            info!(
                "reconnect attempt {attempt}/{attempts} after {}ms",
                delay.as_millis()
            );
            if self.backoff_wait(delay).await {
                return Err(VenueError::Cancelled);
            }
            match self.establish().await {
                Ok(pair) => return Ok(pair),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("reconnect attempt {attempt} failed: {e}");
                    self.set_state(SessionState::Reconnecting);
                    delay = (delay * 2).min(self.cfg.max_backoff);
                }
            }
        }
        Err(VenueError::ReconnectExhausted { attempts })
    }

    /// Sleeps out the backoff while keeping the command channel drained so
    /// callers fail fast instead of piling up. Returns true on shutdown.
    async fn backoff_wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                _ = &mut sleep => return false,
                cmd = self.cmd_rx.recv() => match cmd {
                    None | Some(Command::Disconnect) => return true,
                    Some(Command::Request { reply, .. }) => {
                        let _ = reply.send(Err(VenueError::ConnectionLost));
                    }
                    Some(Command::Subscribe { topic, replay, tx, ack }) => {
                        // Registered now, replayed once the session is back.
                        self.register_subscriber(topic, replay, tx);
                        let _ = ack.send(Ok(()));
                    }
                    Some(Command::SubmitCode { reply, .. }) => {
                        let _ = reply.send(Err(AuthError::NoVerificationPending.into()));
                    }
                },
            }
        }
    }
}
