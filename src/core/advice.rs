//! Trend-crossover advice.
//!
//! A signal fires only on the sample where the short-term average crosses
//! the long-term one; while the trend merely stays above or below, the
//! advice is `Hold`.

use crate::core::stats::moving_average;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub const SHORT_WINDOW: usize = 5;
pub const LONG_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn description(&self) -> &'static str {
        match self {
            Signal::Buy => "Buy - Short-term trend is rising above long-term trend.",
            Signal::Sell => "Sell - Short-term trend is falling below long-term trend.",
            Signal::Hold => "Hold - The market is stable now.",
        }
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Signal::Buy => "Buy",
                Signal::Sell => "Sell",
                Signal::Hold => "Hold",
            }
        )
    }
}

/// Derives advice from a history whose last element is the current price.
///
/// Histories with fewer than two samples have no previous price to compare
/// against and always yield `Hold`.
pub fn advise(history: &[f64]) -> Signal {
    if history.len() < 2 {
        return Signal::Hold;
    }
    let (Ok(short_term), Ok(long_term)) = (
        moving_average(history, SHORT_WINDOW),
        moving_average(history, LONG_WINDOW),
    ) else {
        return Signal::Hold;
    };
    let prev = history[history.len() - 2];

    if short_term > long_term && prev <= long_term {
        Signal::Buy
    } else if short_term < long_term && prev >= long_term {
        Signal::Sell
    } else {
        Signal::Hold
    }
}
