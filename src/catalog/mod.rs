// src/catalog/mod.rs
//
// Asset discovery and ranking. The catalog pulls the venue's instrument
// schedule, keeps the tradable subset, and hands the executor a ranked list
// of candidates. Symbols carry an "-OTC" variant on weekends; the catalog
// resolves that substitution when the regular listing is closed.

use crate::errors::VenueError;
use crate::models::{otc_variant, Instrument};
use crate::traits::SharedVenue;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::RwLock;

/// Instrument catalog over a live venue session.
pub struct AssetCatalog {
    venue: SharedVenue,
    /// Tradable instruments keyed by symbol. One entry per symbol; when a
    /// symbol is listed under several market kinds the best payout wins.
    inner: RwLock<HashMap<String, Instrument>>,
    min_payout_pct: f64,
    candle_period_secs: u32,
}

impl AssetCatalog {
    pub fn new(venue: SharedVenue, min_payout_pct: f64, candle_period_secs: u32) -> Self {
        Self {
            venue,
            inner: RwLock::new(HashMap::new()),
            min_payout_pct,
            candle_period_secs,
        }
    }

    /// Refreshes the catalog from the venue. Keeps instruments that are open
    /// and meet the payout floor; collapses duplicate listings (a symbol can
    /// appear under binary and turbo) to the best payout. Returns the
    /// tradable count.
    pub async fn refresh(&self) -> Result<usize, VenueError> {
        let all = self.venue.instruments().await?;
        let total = all.len();

        let mut kept: HashMap<String, Instrument> = HashMap::new();
        for instrument in all {
            if !instrument.open || instrument.payout_pct < self.min_payout_pct {
                continue;
            }
            match kept.get(&instrument.symbol) {
                Some(existing) if existing.payout_pct >= instrument.payout_pct => {}
                _ => {
                    kept.insert(instrument.symbol.clone(), instrument);
                }
            }
        }

        info!(
            "AssetCatalog: {} tradable of {} listed (payout floor {}%)",
            kept.len(),
            total,
            self.min_payout_pct
        );

        let mut state = self.inner.write().expect("catalog lock poisoned");
        *state = kept;
        Ok(state.len())
    }

    /// All tradable instruments ranked by payout descending, symbol
    /// ascending as the deterministic tie-break.
    pub fn ranked(&self) -> Vec<Instrument> {
        let state = self.inner.read().expect("catalog lock poisoned");
        let mut out: Vec<Instrument> = state.values().cloned().collect();
        out.sort_by(|a, b| {
            b.payout_pct
                .partial_cmp(&a.payout_pct)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        out
    }

    /// The top `n` ranked candidates, each validated with a single candle
    /// fetch so instruments with no price feed never reach the executor.
    pub async fn top_candidates(&self, n: usize) -> Vec<Instrument> {
        let mut out = Vec::with_capacity(n);
        for instrument in self.ranked() {
            if out.len() == n {
                break;
            }
            if self.validate(&instrument.symbol).await {
                out.push(instrument);
            }
        }
        out
    }

    pub fn get(&self, symbol: &str) -> Option<Instrument> {
        let state = self.inner.read().expect("catalog lock poisoned");
        state.get(symbol).cloned()
    }

    /// The tradable OTC variant of an instrument, when one is listed. `None`
    /// for listings already carrying the suffix.
    pub fn otc_fallback(&self, instrument: &Instrument) -> Option<Instrument> {
        if instrument.is_otc() {
            return None;
        }
        self.get(&otc_variant(&instrument.symbol))
    }

    /// One most-recent-candle fetch. A symbol that cannot serve history is
    /// dropped from consideration for this cycle.
    async fn validate(&self, symbol: &str) -> bool {
        match self
            .venue
            .recent_candles(symbol, self.candle_period_secs, 1)
            .await
        {
            Ok(candles) if !candles.is_empty() => true,
            Ok(_) => {
                warn!("AssetCatalog: {symbol} returned no history, skipping");
                false
            }
            Err(e) => {
                warn!("AssetCatalog: {symbol} failed validation: {e}");
                false
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn seed(&self, instruments: Vec<Instrument>) {
        let mut state = self.inner.write().unwrap();
        *state = instruments
            .into_iter()
            .map(|i| (i.symbol.clone(), i))
            .collect();
    }
}
