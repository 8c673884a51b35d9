//! Pricing abstractions and core types

use crate::core::error::TrackerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Quote currency for every tracked price.
pub const QUOTE_CURRENCY: &str = "usd";

/// A tracked asset, identified by its price-source id (e.g. `bitcoin`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub symbol: String,
}

impl Asset {
    pub fn new(id: &str, symbol: &str) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Storage key of the persisted price history.
    pub fn history_key(&self) -> String {
        format!("{}-prices", self.id)
    }

    pub fn chart_id(&self) -> String {
        format!("{}-chart", self.id)
    }

    /// Id of a per-asset display element, e.g. `bitcoin-price`.
    pub fn element_id(&self, element: &str) -> String {
        format!("{}-{}", self.id, element)
    }

    /// Capitalized name for display, e.g. `Bitcoin`.
    pub fn display_name(&self) -> String {
        let mut chars = self.id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// A spot price observation in USD.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSample {
    pub asset: String,
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

impl PriceSample {
    pub fn new(asset: &str, price: f64) -> Self {
        Self {
            asset: asset.to_string(),
            price,
            observed_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Current spot price of `asset` in USD.
    async fn fetch_price(&self, asset: &Asset) -> Result<PriceSample, TrackerError>;

    /// Recent prices of `asset` over the last `days` days, oldest first.
    async fn fetch_history(&self, asset: &Asset, days: u32) -> Result<Vec<f64>, TrackerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_ids() {
        let asset = Asset::new("bitcoin", "BTC");
        assert_eq!(asset.history_key(), "bitcoin-prices");
        assert_eq!(asset.chart_id(), "bitcoin-chart");
        assert_eq!(asset.element_id("avg-price"), "bitcoin-avg-price");
        assert_eq!(asset.display_name(), "Bitcoin");
        assert_eq!(asset.to_string(), "bitcoin");
    }
}
