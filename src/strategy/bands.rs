// src/strategy/bands.rs
//
// Bollinger-band signal engine. One engine instance per instrument; it is
// fed closed candles in order and emits a directional signal whenever the
// candle body clears the configured band. The last emitted direction is kept
// as the bias so the executor can continue a sequence between signals.

use crate::models::{Candle, Direction};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Middle-band values kept for the doji tie-break slope.
const SLOPE_WINDOW: usize = 5;

/// Which band the candle body has to clear before a signal fires.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryRule {
    /// Body entirely above or below the middle band.
    #[default]
    MiddleTouch,
    /// Close beyond the upper or lower band.
    OuterCross,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandConfig {
    /// Number of closes in the moving window.
    pub period: usize,
    /// Band width in standard deviations.
    pub std_dev: f64,
    pub entry_rule: EntryRule,
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            period: 7,
            std_dev: 3.0,
            entry_rule: EntryRule::MiddleTouch,
        }
    }
}

/// Band values for one evaluation. Middle is the simple moving average of
/// the window; the deviation is the population standard deviation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bands {
    pub middle: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Signal {
    pub direction: Direction,
    pub bands: Bands,
}

pub struct BandEngine {
    cfg: BandConfig,
    closes: VecDeque<f64>,
    middles: VecDeque<f64>,
    bias: Option<Direction>,
}

impl BandEngine {
    pub fn new(cfg: BandConfig) -> Self {
        Self {
            closes: VecDeque::with_capacity(cfg.period),
            middles: VecDeque::with_capacity(SLOPE_WINDOW),
            bias: None,
            cfg,
        }
    }

    /// Seeds the window from historical candles without emitting signals.
    pub fn warm_up(&mut self, candles: &[Candle]) {
        for candle in candles {
            self.push(candle.close);
        }
    }

    /// True once the window is full and evaluations can fire.
    pub fn is_warm(&self) -> bool {
        self.closes.len() >= self.cfg.period
    }

    /// Direction of the last emitted signal, if any.
    pub fn bias(&self) -> Option<Direction> {
        self.bias
    }

    /// Feeds one closed candle and evaluates the entry rule. `None` during
    /// warm-up, when the body touches the band, or on a doji with no usable
    /// slope.
    pub fn on_candle(&mut self, candle: &Candle) -> Option<Signal> {
        self.push(candle.close);
        if !self.is_warm() {
            return None;
        }
        let bands = self.bands();

        let clears = match self.cfg.entry_rule {
            // Strict inequalities: a body edge exactly on the band counts as
            // touching, which also covers the zero-variance window where all
            // three bands collapse onto the same value.
            EntryRule::MiddleTouch => {
                candle.body_low() > bands.middle || candle.body_high() < bands.middle
            }
            EntryRule::OuterCross => candle.close > bands.upper || candle.close < bands.lower,
        };
        if !clears {
            return None;
        }

        let direction = if candle.is_green() {
            Direction::Call
        } else if candle.is_red() {
            Direction::Put
        } else {
            self.slope_direction()?
        };

        self.bias = Some(direction);
        Some(Signal { direction, bands })
    }

    fn push(&mut self, close: f64) {
        if self.closes.len() == self.cfg.period {
            self.closes.pop_front();
        }
        self.closes.push_back(close);

        if self.closes.len() >= self.cfg.period {
            let middle = mean(self.closes.iter());
            if self.middles.len() == SLOPE_WINDOW {
                self.middles.pop_front();
            }
            self.middles.push_back(middle);
        }
    }

    fn bands(&self) -> Bands {
        let middle = mean(self.closes.iter());
        let variance = mean(self.closes.iter().map(|c| (c - middle) * (c - middle)));
        let dev = variance.sqrt() * self.cfg.std_dev;
        Bands {
            middle,
            upper: middle + dev,
            lower: middle - dev,
        }
    }

    /// Tie-break for doji candles: the middle-band trend over the slope
    /// window. A flat trend yields no direction.
    fn slope_direction(&self) -> Option<Direction> {
        let first = self.middles.front()?;
        let last = self.middles.back()?;
        if last > first {
            Some(Direction::Call)
        } else if last < first {
            Some(Direction::Put)
        } else {
            None
        }
    }
}

fn mean(values: impl Iterator<Item = impl std::borrow::Borrow<f64>>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        sum += *v.borrow();
        n += 1;
    }
    sum / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, close: f64) -> Candle {
        Candle {
            ts: 0,
            open,
            high: open.max(close) + 0.01,
            low: open.min(close) - 0.01,
            close,
        }
    }

    fn engine(period: usize, rule: EntryRule) -> BandEngine {
        BandEngine::new(BandConfig {
            period,
            std_dev: 3.0,
            entry_rule: rule,
        })
    }

    #[test]
    fn test_no_signal_during_warm_up() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        assert!(e.on_candle(&candle(1.0, 5.0)).is_none());
        assert!(e.on_candle(&candle(1.0, 5.0)).is_none());
        assert!(!e.is_warm());
        // Third candle fills the window; evaluation can fire now.
        assert!(e.is_warm() || e.on_candle(&candle(4.0, 5.0)).is_some());
    }

    #[test]
    fn test_zero_variance_yields_no_signal() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        for _ in 0..5 {
            assert!(e.on_candle(&candle(1.0, 1.0)).is_none());
        }
        assert!(e.bias().is_none());
    }

    #[test]
    fn test_green_body_above_middle_fires_call() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0)]);
        // Window closes: [1.0, 1.0, 1.3] -> middle 1.1; body [1.2, 1.3].
        let signal = e.on_candle(&candle(1.2, 1.3)).expect("signal");
        assert_eq!(signal.direction, Direction::Call);
        assert!((signal.bands.middle - 1.1).abs() < 1e-9);
        assert_eq!(e.bias(), Some(Direction::Call));
    }

    #[test]
    fn test_flip_to_put() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0)]);
        assert_eq!(
            e.on_candle(&candle(1.2, 1.3)).map(|s| s.direction),
            Some(Direction::Call)
        );
        // Red body entirely below the new middle (~1.033): flips the bias.
        let signal = e.on_candle(&candle(0.9, 0.8)).expect("signal");
        assert_eq!(signal.direction, Direction::Put);
        assert_eq!(e.bias(), Some(Direction::Put));
    }

    #[test]
    fn test_body_straddling_middle_is_no_signal() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0)]);
        // Middle of [1.0, 1.0, 1.2] is ~1.067; body [0.9, 1.2] straddles it.
        assert!(e.on_candle(&candle(0.9, 1.2)).is_none());
        assert!(e.bias().is_none());
    }

    #[test]
    fn test_bias_persists_through_touching_candles() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0)]);
        assert_eq!(
            e.on_candle(&candle(1.2, 1.3)).map(|s| s.direction),
            Some(Direction::Call)
        );
        // Body [1.0, 1.2] straddles the new middle (~1.167): no signal, but
        // the Call bias carries so a running sequence can continue.
        assert!(e.on_candle(&candle(1.0, 1.2)).is_none());
        assert_eq!(e.bias(), Some(Direction::Call));
        // A later qualifying red candle still flips it.
        let signal = e.on_candle(&candle(0.9, 0.8)).expect("signal");
        assert_eq!(signal.direction, Direction::Put);
        assert_eq!(e.bias(), Some(Direction::Put));
    }

    #[test]
    fn test_doji_uses_middle_band_slope() {
        let mut e = engine(2, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0)]);
        e.on_candle(&candle(1.5, 2.0));
        e.on_candle(&candle(2.5, 3.0));
        // Doji at 4.0, body above middle (3.5); rising middles break the tie.
        let signal = e.on_candle(&candle(4.0, 4.0)).expect("signal");
        assert_eq!(signal.direction, Direction::Call);
    }

    #[test]
    fn test_outer_cross_rule() {
        let mut e = BandEngine::new(BandConfig {
            period: 3,
            std_dev: 1.0,
            entry_rule: EntryRule::OuterCross,
        });
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0)]);
        // Window [1.0, 1.0, 4.0]: middle 2, sigma ~1.414, upper ~3.414.
        let signal = e.on_candle(&candle(3.5, 4.0)).expect("signal");
        assert_eq!(signal.direction, Direction::Call);

        // A close inside the band is quiet.
        let mut e2 = BandEngine::new(BandConfig {
            period: 3,
            std_dev: 1.0,
            entry_rule: EntryRule::OuterCross,
        });
        e2.warm_up(&[candle(1.0, 1.0), candle(1.0, 2.0)]);
        assert!(e2.on_candle(&candle(2.0, 2.5)).is_none());
    }

    #[test]
    fn test_warm_up_does_not_emit() {
        let mut e = engine(3, EntryRule::MiddleTouch);
        e.warm_up(&[candle(1.0, 1.0), candle(1.0, 1.0), candle(1.2, 1.3)]);
        // The warm-up candles never produced a signal, so no bias either.
        assert!(e.bias().is_none());
        assert!(e.is_warm());
    }
}
