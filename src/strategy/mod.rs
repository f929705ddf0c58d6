// src/strategy/mod.rs
//
// Signal generation and stake sizing. `bands` turns a stream of closed
// candles into directional signals; `stake` sizes each placement from the
// instrument's win/loss history.

pub mod bands;
pub mod stake;

pub use bands::{BandConfig, BandEngine, Bands, EntryRule, Signal};
pub use stake::StakeState;
