use crate::core::config::CoinGeckoConfig;
use crate::core::error::TrackerError;
use crate::core::price::{Asset, PriceProvider, PriceSample, QUOTE_CURRENCY};
use crate::providers::util::with_retry;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

/// Spot and market-chart prices from the CoinGecko public API.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl CoinGeckoProvider {
    pub fn new(config: &CoinGeckoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("coinwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }

    /// Fetches `url` and parses the body as JSON.
    ///
    /// Transport errors, non-2xx statuses and non-JSON bodies are all
    /// `FetchFailed`.
    async fn get_json(&self, asset: &Asset, url: &str) -> Result<Value, TrackerError> {
        debug!("Requesting {}", url);
        let response = with_retry(
            || async { self.client.get(url).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .map_err(|e| TrackerError::fetch_failed(&asset.id, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::fetch_failed(
                &asset.id,
                format!("HTTP error: {status}"),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TrackerError::fetch_failed(&asset.id, e))?;
        serde_json::from_str(&text).map_err(|e| {
            TrackerError::fetch_failed(&asset.id, format!("malformed payload: {e}"))
        })
    }
}

/// Reads `<asset>.usd` from a simple-price response.
///
/// Anything but a positive number is an invalid response.
fn extract_spot_price(data: &Value, asset: &Asset) -> Result<f64, TrackerError> {
    data.get(&asset.id)
        .and_then(|quote| quote.get(QUOTE_CURRENCY))
        .and_then(Value::as_f64)
        .filter(|price| price.is_finite() && *price > 0.0)
        .ok_or_else(|| TrackerError::invalid_response(&asset.id))
}

#[derive(Deserialize, Debug)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoPriceFetch", skip_all, fields(asset = %asset))]
    async fn fetch_price(&self, asset: &Asset) -> Result<PriceSample, TrackerError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.base_url, asset.id, QUOTE_CURRENCY
        );
        let data = self.get_json(asset, &url).await?;
        let price = extract_spot_price(&data, asset)?;
        debug!(price, "Received spot price");
        Ok(PriceSample::new(&asset.id, price))
    }

    #[instrument(name = "CoinGeckoHistoryFetch", skip_all, fields(asset = %asset, days = days))]
    async fn fetch_history(&self, asset: &Asset, days: u32) -> Result<Vec<f64>, TrackerError> {
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}",
            self.base_url, asset.id, QUOTE_CURRENCY, days
        );
        let data = self.get_json(asset, &url).await?;
        let chart: MarketChart =
            serde_json::from_value(data).map_err(|_| TrackerError::invalid_response(&asset.id))?;
        debug!(points = chart.prices.len(), "Received market chart");
        Ok(chart.prices.into_iter().map(|(_, price)| price).collect())
    }
}
