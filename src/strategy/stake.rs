// src/strategy/stake.rs
//
// Martingale stake sizing, one state per instrument. A loss raises the
// level, a win resets it, a tie leaves it alone. The level is capped so a
// losing streak cannot grow the stake without bound.

use crate::models::Outcome;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StakeState {
    base: f64,
    factor: f64,
    max_level: u32,
    level: u32,
}

impl StakeState {
    pub fn new(base: f64, factor: f64, max_level: u32) -> Self {
        Self {
            base,
            factor,
            max_level,
            level: 0,
        }
    }

    /// Stake for the next placement: base * factor^level.
    pub fn current(&self) -> f64 {
        self.base * self.factor.powi(self.level as i32)
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    /// Ends a losing sequence: back to the base stake.
    pub fn reset(&mut self) {
        self.level = 0;
    }

    pub fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Win => self.level = 0,
            Outcome::Loss => self.level = (self.level + 1).min(self.max_level),
            Outcome::Tied => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_escalates_and_win_resets() {
        let mut s = StakeState::new(1.0, 2.5, 2);
        assert_eq!(s.current(), 1.0);

        s.apply(Outcome::Loss);
        assert_eq!(s.current(), 2.5);
        s.apply(Outcome::Loss);
        assert_eq!(s.current(), 6.25);

        s.apply(Outcome::Win);
        assert_eq!(s.level(), 0);
        assert_eq!(s.current(), 1.0);
    }

    #[test]
    fn test_level_is_capped() {
        let mut s = StakeState::new(1.0, 2.5, 2);
        for _ in 0..10 {
            s.apply(Outcome::Loss);
        }
        assert_eq!(s.level(), 2);
        assert_eq!(s.current(), 6.25);
    }

    #[test]
    fn test_tie_leaves_stake_unchanged() {
        let mut s = StakeState::new(1.0, 2.5, 2);
        s.apply(Outcome::Loss);
        let before = s.current();
        s.apply(Outcome::Tied);
        assert_eq!(s.current(), before);
        assert_eq!(s.level(), 1);
    }
}
