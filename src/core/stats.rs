//! Summary statistics over a price history.
//!
//! All functions reject empty input with [`TrackerError::EmptySeries`]
//! instead of producing NaN.

use crate::core::error::TrackerError;

/// Average and volatility of a price history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    pub average: f64,
    pub volatility: f64,
}

impl Statistics {
    pub fn from_history(prices: &[f64]) -> Result<Self, TrackerError> {
        Ok(Self {
            average: average(prices)?,
            volatility: volatility(prices)?,
        })
    }
}

/// Arithmetic mean of all samples.
pub fn average(samples: &[f64]) -> Result<f64, TrackerError> {
    if samples.is_empty() {
        return Err(TrackerError::EmptySeries);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Mean of the last `window` samples, or of all samples when fewer exist.
pub fn moving_average(samples: &[f64], window: usize) -> Result<f64, TrackerError> {
    if window == 0 {
        return Err(TrackerError::EmptySeries);
    }
    let start = samples.len().saturating_sub(window);
    average(&samples[start..])
}

/// Population standard deviation, rounded to 2 decimals.
pub fn volatility(samples: &[f64]) -> Result<f64, TrackerError> {
    let mean = average(samples)?;
    let variance = samples.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    Ok(round2(variance.sqrt()))
}

/// Percentage change from `old` to `new`, rounded to 2 decimals.
///
/// `None` when `old` is not a positive price.
pub fn percentage_change(old: f64, new: f64) -> Option<f64> {
    if old > 0.0 {
        Some(round2((new - old) / old * 100.0))
    } else {
        None
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
