// src/executor/mod.rs
//
// Execution coordinator. Supervises one worker task per ranked instrument,
// enforces the daily trade cap, applies the OTC fallback, and drives each
// martingale sequence from placement through settlement. Status flows out
// over an mpsc channel; the coordinator never formats for display.

use crate::catalog::AssetCatalog;
use crate::errors::VenueError;
use crate::models::{Candle, Direction, Instrument, Outcome, Settlement};
use crate::strategy::{BandConfig, BandEngine, StakeState};
use crate::traits::SharedVenue;
use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

const SETTLEMENT_POLL_INTERVAL: Duration = Duration::from_secs(2);

// =============================================================================
// Daily Trade Counter
// =============================================================================

/// Daily trade cap with reserve/release semantics. A slot is reserved before
/// placement and released if the venue declines, so failed attempts never
/// consume cap. The count resets on the UTC date change.
pub struct DailyTradeCounter {
    cap: u32,
    state: Mutex<(NaiveDate, u32)>,
}

impl DailyTradeCounter {
    pub fn new(cap: u32) -> Self {
        Self {
            cap,
            state: Mutex::new((Utc::now().date_naive(), 0)),
        }
    }

    pub fn try_reserve(&self) -> bool {
        self.try_reserve_on(Utc::now().date_naive())
    }

    fn try_reserve_on(&self, today: NaiveDate) -> bool {
        let mut state = self.state.lock().expect("counter lock poisoned");
        if state.0 != today {
            *state = (today, 0);
        }
        if state.1 >= self.cap {
            return false;
        }
        state.1 += 1;
        true
    }

    pub fn release(&self) {
        let mut state = self.state.lock().expect("counter lock poisoned");
        state.1 = state.1.saturating_sub(1);
    }

    pub fn used(&self) -> u32 {
        self.state.lock().expect("counter lock poisoned").1
    }
}

// =============================================================================
// Status Reporting
// =============================================================================

/// Structured status events for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum StatusUpdate {
    Watching {
        symbol: String,
    },
    TradePlaced {
        symbol: String,
        direction: Direction,
        stake: f64,
        level: u32,
        order_id: u64,
    },
    TradeSettled {
        symbol: String,
        outcome: Outcome,
        profit: f64,
        balance: Option<f64>,
    },
    /// The regular listing was closed or declined; the OTC variant was used.
    OtcSubstituted {
        requested: String,
        substituted: String,
    },
    CapReached {
        symbol: String,
    },
}

// =============================================================================
// Configuration
// =============================================================================

#[derive(Clone, Debug)]
pub struct ExecutorConfig {
    pub bands: BandConfig,
    pub candle_period_secs: u32,
    pub trade_duration_minutes: u32,
    /// Historical candles fetched to warm the indicator window.
    pub history_backfill: u32,
    pub base_stake: f64,
    pub martingale_factor: f64,
    pub max_martingale_level: u32,
    pub max_daily_trades: u32,
    /// Floor of concurrently open trades; topped up from ranked candidates.
    pub min_active_trades: usize,
    pub top_n: usize,
    pub rerank_interval: Duration,
    /// Extra time past expiry before an unsettled trade is given up on.
    pub settlement_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            bands: BandConfig::default(),
            candle_period_secs: 120,
            trade_duration_minutes: 2,
            history_backfill: 20,
            base_stake: 1.0,
            martingale_factor: 2.5,
            max_martingale_level: 2,
            max_daily_trades: 15,
            min_active_trades: 4,
            top_n: 4,
            rerank_interval: Duration::from_secs(300),
            settlement_grace: Duration::from_secs(30),
        }
    }
}

// =============================================================================
// Coordinator
// =============================================================================

struct ExecCtx {
    venue: SharedVenue,
    catalog: Arc<AssetCatalog>,
    counter: DailyTradeCounter,
    cfg: ExecutorConfig,
    status_tx: mpsc::Sender<StatusUpdate>,
    /// Symbols with a running worker.
    watched: Mutex<HashSet<String>>,
    /// Trades currently open across all workers.
    open_trades: AtomicUsize,
}

impl ExecCtx {
    async fn status(&self, update: StatusUpdate) {
        let _ = self.status_tx.send(update).await;
    }
}

pub struct Executor {
    ctx: Arc<ExecCtx>,
}

impl Executor {
    pub fn new(
        venue: SharedVenue,
        catalog: Arc<AssetCatalog>,
        cfg: ExecutorConfig,
        status_tx: mpsc::Sender<StatusUpdate>,
    ) -> Self {
        let counter = DailyTradeCounter::new(cfg.max_daily_trades);
        Self {
            ctx: Arc::new(ExecCtx {
                venue,
                catalog,
                counter,
                cfg,
                status_tx,
                watched: Mutex::new(HashSet::new()),
                open_trades: AtomicUsize::new(0),
            }),
        }
    }

    /// Supervises workers until shutdown flips. Reranks periodically and
    /// keeps the active-trade floor topped up.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), VenueError> {
        self.ctx.catalog.refresh().await?;
        let mut workers: JoinSet<()> = JoinSet::new();

        loop {
            self.spawn_missing_workers(&mut workers, shutdown.clone())
                .await;
            self.top_up_active_floor(&mut workers, shutdown.clone())
                .await;

            tokio::select! {
                _ = tokio::time::sleep(self.ctx.cfg.rerank_interval) => {
                    if let Err(e) = self.ctx.catalog.refresh().await {
                        warn!("Executor: catalog refresh failed: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Executor: shutting down, stopping workers");
                        workers.shutdown().await;
                        return Ok(());
                    }
                }
            }
        }
    }

    async fn spawn_missing_workers(
        &self,
        workers: &mut JoinSet<()>,
        shutdown: watch::Receiver<bool>,
    ) {
        let candidates = self.ctx.catalog.top_candidates(self.ctx.cfg.top_n).await;
        for instrument in candidates {
            let fresh = {
                let mut watched = self.ctx.watched.lock().expect("watched lock poisoned");
                watched.insert(instrument.symbol.clone())
            };
            if fresh {
                info!("Executor: watching {instrument}");
                let ctx = self.ctx.clone();
                let shutdown = shutdown.clone();
                workers.spawn(async move {
                    run_instrument(ctx, instrument, None, shutdown).await;
                });
            }
        }
    }

    /// When open trades sit below the floor, start ranked candidates without
    /// waiting for a signal, seeded with the last candle's color, until the
    /// deficit is covered or the candidates run out.
    async fn top_up_active_floor(
        &self,
        workers: &mut JoinSet<()>,
        shutdown: watch::Receiver<bool>,
    ) {
        let mut deficit = self
            .ctx
            .cfg
            .min_active_trades
            .saturating_sub(self.ctx.open_trades.load(Ordering::SeqCst));
        if deficit == 0 {
            return;
        }
        for instrument in self.ctx.catalog.ranked() {
            if deficit == 0 {
                return;
            }
            let fresh = {
                let mut watched = self.ctx.watched.lock().expect("watched lock poisoned");
                watched.insert(instrument.symbol.clone())
            };
            if !fresh {
                continue;
            }
            let seed = match self
                .ctx
                .venue
                .recent_candles(&instrument.symbol, self.ctx.cfg.candle_period_secs, 1)
                .await
            {
                Ok(candles) => candles.last().and_then(seed_direction),
                Err(e) => {
                    warn!("Executor: top-up fetch for {} failed: {e}", instrument.symbol);
                    None
                }
            };
            info!(
                "Executor: topping up active floor with {instrument} (seed {:?})",
                seed
            );
            let ctx = self.ctx.clone();
            let shutdown = shutdown.clone();
            workers.spawn(async move {
                run_instrument(ctx, instrument, seed, shutdown).await;
            });
            deficit -= 1;
        }
    }
}

/// Direction a floor top-up trades in: the color of the last closed candle.
fn seed_direction(candle: &Candle) -> Option<Direction> {
    if candle.is_green() {
        Some(Direction::Call)
    } else if candle.is_red() {
        Some(Direction::Put)
    } else {
        None
    }
}

// =============================================================================
// Per-Instrument Worker
// =============================================================================

/// Removes the symbol from the watched set when the worker exits, however it
/// exits.
struct WatchGuard {
    ctx: Arc<ExecCtx>,
    symbol: String,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        if let Ok(mut watched) = self.ctx.watched.lock() {
            watched.remove(&self.symbol);
        }
    }
}

async fn run_instrument(
    ctx: Arc<ExecCtx>,
    instrument: Instrument,
    seed: Option<Direction>,
    mut shutdown: watch::Receiver<bool>,
) {
    let _guard = WatchGuard {
        ctx: ctx.clone(),
        symbol: instrument.symbol.clone(),
    };
    ctx.status(StatusUpdate::Watching {
        symbol: instrument.symbol.clone(),
    })
    .await;

    let mut engine = BandEngine::new(ctx.cfg.bands);
    match ctx
        .venue
        .recent_candles(
            &instrument.symbol,
            ctx.cfg.candle_period_secs,
            ctx.cfg.history_backfill,
        )
        .await
    {
        Ok(history) => engine.warm_up(&history),
        Err(e) => {
            warn!("Executor: {} backfill failed: {e}", instrument.symbol);
            return;
        }
    }

    let mut candles = match ctx
        .venue
        .candle_stream(&instrument.symbol, ctx.cfg.candle_period_secs)
        .await
    {
        Ok(rx) => rx,
        Err(e) => {
            warn!("Executor: {} candle stream failed: {e}", instrument.symbol);
            return;
        }
    };

    let mut stake = StakeState::new(
        ctx.cfg.base_stake,
        ctx.cfg.martingale_factor,
        ctx.cfg.max_martingale_level,
    );

    if let Some(direction) = seed {
        run_sequence(&ctx, &instrument, direction, &mut stake).await;
    }

    loop {
        let candle = tokio::select! {
            candle = candles.recv() => match candle {
                Some(c) => c,
                None => {
                    debug!("Executor: {} candle stream ended", instrument.symbol);
                    return;
                }
            },
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
                continue;
            }
        };

        if let Some(signal) = engine.on_candle(&candle) {
            debug!(
                "Executor: {} signal {} (middle {:.5})",
                instrument.symbol, signal.direction, signal.bands.middle
            );
            run_sequence(&ctx, &instrument, signal.direction, &mut stake).await;
        }
    }
}

// =============================================================================
// Trade Sequences
// =============================================================================

/// Runs one martingale sequence: place, settle, and on a loss re-enter in
/// the same direction with the escalated stake until the level cap stops
/// climbing. The settled outcome always lands in the stake state before the
/// next placement decision.
async fn run_sequence(
    ctx: &ExecCtx,
    instrument: &Instrument,
    direction: Direction,
    stake: &mut StakeState,
) {
    loop {
        if !ctx.counter.try_reserve() {
            info!("Executor: daily cap reached, skipping {}", instrument.symbol);
            ctx.status(StatusUpdate::CapReached {
                symbol: instrument.symbol.clone(),
            })
            .await;
            return;
        }

        let amount = stake.current();
        let trade = match place_with_fallback(ctx, instrument, direction, amount).await {
            Ok(trade) => trade,
            Err(e) => {
                ctx.counter.release();
                warn!("Executor: placement on {} failed: {e}", instrument.symbol);
                return;
            }
        };
        ctx.open_trades.fetch_add(1, Ordering::SeqCst);
        ctx.status(StatusUpdate::TradePlaced {
            symbol: trade.symbol.clone(),
            direction,
            stake: amount,
            level: stake.level(),
            order_id: trade.order_id,
        })
        .await;

        let settlement = await_settlement(ctx, &trade).await;
        ctx.open_trades.fetch_sub(1, Ordering::SeqCst);

        let Some(settlement) = settlement else {
            warn!(
                "Executor: order {} on {} unsettled past grace, abandoning sequence",
                trade.order_id, trade.symbol
            );
            return;
        };

        let level_before = stake.level();
        stake.apply(settlement.outcome);
        ctx.status(StatusUpdate::TradeSettled {
            symbol: trade.symbol.clone(),
            outcome: settlement.outcome,
            profit: settlement.profit,
            balance: settlement.balance,
        })
        .await;

        match settlement.outcome {
            Outcome::Win | Outcome::Tied => return,
            Outcome::Loss => {
                if stake.level() == level_before {
                    // Level cap: the sequence ends here.
                    stake.reset();
                    return;
                }
            }
        }
    }
}

/// Places the option, substituting the OTC listing at most once when the
/// regular symbol is declined and a tradable variant exists.
async fn place_with_fallback(
    ctx: &ExecCtx,
    instrument: &Instrument,
    direction: Direction,
    amount: f64,
) -> Result<crate::models::OpenTrade, VenueError> {
    let first = ctx
        .venue
        .place_option(
            &instrument.symbol,
            instrument.kind,
            direction,
            amount,
            ctx.cfg.trade_duration_minutes,
        )
        .await;

    let declined = match first {
        Ok(trade) => return Ok(trade),
        Err(e @ VenueError::OrderDeclined(_)) => e,
        Err(e) => return Err(e),
    };

    let Some(variant) = ctx.catalog.otc_fallback(instrument) else {
        return Err(declined);
    };
    info!(
        "Executor: {} declined, substituting {}",
        instrument.symbol, variant.symbol
    );
    ctx.status(StatusUpdate::OtcSubstituted {
        requested: instrument.symbol.clone(),
        substituted: variant.symbol.clone(),
    })
    .await;

    ctx.venue
        .place_option(
            &variant.symbol,
            variant.kind,
            direction,
            amount,
            ctx.cfg.trade_duration_minutes,
        )
        .await
}

/// Polls the order result until settlement or until expiry plus the grace
/// period passes.
async fn await_settlement(
    ctx: &ExecCtx,
    trade: &crate::models::OpenTrade,
) -> Option<Settlement> {
    let deadline = trade.expires_at
        + chrono::Duration::from_std(ctx.cfg.settlement_grace).unwrap_or_default();
    loop {
        match ctx.venue.check_result(trade.order_id).await {
            Ok(Some(settlement)) => return Some(settlement),
            Ok(None) => {}
            Err(e) => {
                debug!("Executor: result poll for {} failed: {e}", trade.order_id);
            }
        }
        if Utc::now() > deadline {
            return None;
        }
        tokio::time::sleep(SETTLEMENT_POLL_INTERVAL).await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarketKind, OpenTrade};
    use crate::traits::Venue;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    fn inst(symbol: &str) -> Instrument {
        Instrument::new(symbol, MarketKind::Binary, true, 85.0)
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Placement {
        symbol: String,
        stake: f64,
    }

    /// Scripted venue: declines configured symbols, settles each order with
    /// the next queued outcome.
    struct ScriptedVenue {
        declines: HashSet<String>,
        outcomes: Mutex<VecDeque<Outcome>>,
        placements: Mutex<Vec<Placement>>,
        next_order: AtomicUsize,
    }

    impl ScriptedVenue {
        fn new(declines: &[&str], outcomes: &[Outcome]) -> Self {
            Self {
                declines: declines.iter().map(|s| s.to_string()).collect(),
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                placements: Mutex::new(Vec::new()),
                next_order: AtomicUsize::new(1),
            }
        }

        fn placements(&self) -> Vec<Placement> {
            self.placements.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Venue for ScriptedVenue {
        async fn instruments(&self) -> Result<Vec<Instrument>, VenueError> {
            Ok(vec![])
        }

        async fn recent_candles(
            &self,
            _symbol: &str,
            _period_secs: u32,
            count: u32,
        ) -> Result<Vec<Candle>, VenueError> {
            Ok(vec![
                Candle {
                    ts: 0,
                    open: 1.0,
                    high: 1.1,
                    low: 0.9,
                    close: 1.05,
                };
                count as usize
            ])
        }

        async fn candle_stream(
            &self,
            _symbol: &str,
            _period_secs: u32,
        ) -> Result<mpsc::Receiver<Candle>, VenueError> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(rx)
        }

        async fn place_option(
            &self,
            symbol: &str,
            _kind: MarketKind,
            _direction: Direction,
            stake: f64,
            duration_minutes: u32,
        ) -> Result<OpenTrade, VenueError> {
            if self.declines.contains(symbol) {
                return Err(VenueError::OrderDeclined("closed".into()));
            }
            self.placements.lock().unwrap().push(Placement {
                symbol: symbol.to_string(),
                stake,
            });
            let order_id = self.next_order.fetch_add(1, Ordering::SeqCst) as u64;
            let now = Utc::now();
            Ok(OpenTrade {
                symbol: symbol.to_string(),
                kind: MarketKind::Binary,
                direction: Direction::Call,
                stake,
                order_id,
                placed_at: now,
                expires_at: now + chrono::Duration::minutes(duration_minutes as i64),
            })
        }

        async fn check_result(&self, order_id: u64) -> Result<Option<Settlement>, VenueError> {
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .expect("unscripted settlement");
            Ok(Some(Settlement {
                order_id,
                outcome,
                profit: match outcome {
                    Outcome::Win => 0.85,
                    Outcome::Loss => -1.0,
                    Outcome::Tied => 0.0,
                },
                balance: Some(100.0),
            }))
        }
    }

    fn ctx_with(venue: ScriptedVenue, cfg: ExecutorConfig) -> (Arc<ExecCtx>, mpsc::Receiver<StatusUpdate>) {
        let venue: SharedVenue = Arc::new(venue);
        let catalog = Arc::new(AssetCatalog::new(venue.clone(), 70.0, 120));
        let (status_tx, status_rx) = mpsc::channel(64);
        let counter = DailyTradeCounter::new(cfg.max_daily_trades);
        (
            Arc::new(ExecCtx {
                venue,
                catalog,
                counter,
                cfg,
                status_tx,
                watched: Mutex::new(HashSet::new()),
                open_trades: AtomicUsize::new(0),
            }),
            status_rx,
        )
    }

    fn drain(rx: &mut mpsc::Receiver<StatusUpdate>) -> Vec<StatusUpdate> {
        let mut out = Vec::new();
        while let Ok(update) = rx.try_recv() {
            out.push(update);
        }
        out
    }

    #[test]
    fn test_counter_reserve_release() {
        let counter = DailyTradeCounter::new(2);
        assert!(counter.try_reserve());
        assert!(counter.try_reserve());
        assert!(!counter.try_reserve());
        counter.release();
        assert!(counter.try_reserve());
        assert_eq!(counter.used(), 2);
    }

    #[test]
    fn test_counter_resets_on_date_change() {
        let counter = DailyTradeCounter::new(1);
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        assert!(counter.try_reserve_on(monday));
        assert!(!counter.try_reserve_on(monday));
        assert!(counter.try_reserve_on(tuesday));
    }

    #[tokio::test]
    async fn test_daily_cap_blocks_sequence() {
        let cfg = ExecutorConfig {
            max_daily_trades: 1,
            ..Default::default()
        };
        let (ctx, mut status_rx) = ctx_with(
            ScriptedVenue::new(&[], &[Outcome::Win, Outcome::Win]),
            cfg,
        );
        let mut stake = StakeState::new(1.0, 2.5, 2);

        run_sequence(&ctx, &inst("EURUSD"), Direction::Call, &mut stake).await;
        run_sequence(&ctx, &inst("EURUSD"), Direction::Call, &mut stake).await;

        let updates = drain(&mut status_rx);
        assert!(updates.contains(&StatusUpdate::CapReached {
            symbol: "EURUSD".into()
        }));
        let placed = updates
            .iter()
            .filter(|u| matches!(u, StatusUpdate::TradePlaced { .. }))
            .count();
        assert_eq!(placed, 1);
    }

    #[tokio::test]
    async fn test_loss_escalates_within_one_sequence() {
        let (ctx, mut status_rx) = ctx_with(
            ScriptedVenue::new(&[], &[Outcome::Loss, Outcome::Loss, Outcome::Win]),
            ExecutorConfig::default(),
        );
        let mut stake = StakeState::new(1.0, 2.5, 2);

        run_sequence(&ctx, &inst("EURUSD"), Direction::Put, &mut stake).await;

        // Each settlement updated the stake before the next placement.
        let updates = drain(&mut status_rx);
        let stakes: Vec<f64> = updates
            .iter()
            .filter_map(|u| match u {
                StatusUpdate::TradePlaced { stake, .. } => Some(*stake),
                _ => None,
            })
            .collect();
        assert_eq!(stakes, vec![1.0, 2.5, 6.25]);
        // The win ended the sequence at level zero.
        assert_eq!(stake.level(), 0);
    }

    #[tokio::test]
    async fn test_level_cap_ends_sequence_and_resets() {
        let (ctx, _status_rx) = ctx_with(
            ScriptedVenue::new(&[], &[Outcome::Loss, Outcome::Loss, Outcome::Loss]),
            ExecutorConfig::default(),
        );
        let mut stake = StakeState::new(1.0, 2.5, 2);

        run_sequence(&ctx, &inst("EURUSD"), Direction::Call, &mut stake).await;

        // Three placements (levels 0, 1, 2); the third loss cannot raise the
        // level, so the sequence ends and the stake resets.
        assert_eq!(ctx.counter.used(), 3);
        assert_eq!(stake.level(), 0);
        assert_eq!(stake.current(), 1.0);
    }

    #[tokio::test]
    async fn test_otc_substitution_once() {
        let (ctx, mut status_rx) = ctx_with(
            ScriptedVenue::new(&["EURUSD"], &[Outcome::Win]),
            ExecutorConfig::default(),
        );
        ctx.catalog.seed(vec![inst("EURUSD-OTC")]);
        let mut stake = StakeState::new(1.0, 2.5, 2);

        run_sequence(&ctx, &inst("EURUSD"), Direction::Call, &mut stake).await;

        let updates = drain(&mut status_rx);
        assert!(updates.contains(&StatusUpdate::OtcSubstituted {
            requested: "EURUSD".into(),
            substituted: "EURUSD-OTC".into(),
        }));
        match updates
            .iter()
            .find(|u| matches!(u, StatusUpdate::TradePlaced { .. }))
        {
            Some(StatusUpdate::TradePlaced { symbol, .. }) => assert_eq!(symbol, "EURUSD-OTC"),
            other => panic!("expected a placement, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decline_without_fallback_releases_cap() {
        let (ctx, _status_rx) = ctx_with(
            ScriptedVenue::new(&["EURUSD", "EURUSD-OTC"], &[]),
            ExecutorConfig::default(),
        );
        ctx.catalog.seed(vec![inst("EURUSD-OTC")]);
        let mut stake = StakeState::new(1.0, 2.5, 2);

        run_sequence(&ctx, &inst("EURUSD"), Direction::Call, &mut stake).await;

        assert_eq!(ctx.counter.used(), 0);
    }

    #[tokio::test]
    async fn test_floor_top_up_covers_deficit_in_one_pass() {
        let scripted = Arc::new(ScriptedVenue::new(&[], &[Outcome::Win, Outcome::Win]));
        let venue: SharedVenue = scripted.clone();
        let catalog = Arc::new(AssetCatalog::new(venue.clone(), 70.0, 120));
        catalog.seed(vec![inst("EURUSD"), inst("GBPUSD"), inst("USDJPY")]);
        let cfg = ExecutorConfig {
            min_active_trades: 2,
            ..Default::default()
        };
        let (status_tx, _status_rx) = mpsc::channel(64);
        let executor = Executor::new(venue, catalog, cfg, status_tx);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut workers = JoinSet::new();

        executor
            .top_up_active_floor(&mut workers, shutdown_rx)
            .await;
        while workers.join_next().await.is_some() {}

        // One pass started enough seeded workers to cover the whole deficit,
        // taking the two best-ranked candidates.
        let mut symbols: Vec<String> = scripted
            .placements()
            .into_iter()
            .map(|p| p.symbol)
            .collect();
        symbols.sort();
        assert_eq!(symbols, vec!["EURUSD", "GBPUSD"]);
    }

    #[test]
    fn test_seed_direction_from_candle_color() {
        let green = Candle {
            ts: 0,
            open: 1.0,
            high: 1.2,
            low: 0.9,
            close: 1.1,
        };
        let red = Candle { close: 0.9, ..green };
        let doji = Candle { close: 1.0, ..green };
        assert_eq!(seed_direction(&green), Some(Direction::Call));
        assert_eq!(seed_direction(&red), Some(Direction::Put));
        assert_eq!(seed_direction(&doji), None);
    }
}
