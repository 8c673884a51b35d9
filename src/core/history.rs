//! Bounded, persisted price history per asset.

use crate::core::cache::KeyValueCollection;
use crate::core::error::TrackerError;
use crate::core::price::Asset;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maximum number of samples kept per asset. Oldest samples are evicted first.
pub const MAX_HISTORY_LEN: usize = 20;

#[derive(Clone)]
pub struct PriceHistoryStore {
    collection: Arc<dyn KeyValueCollection>,
}

impl PriceHistoryStore {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    /// Returns the persisted history of `asset`, oldest first.
    ///
    /// Missing or unreadable data yields an empty history.
    pub async fn get_history(&self, asset: &Asset) -> Vec<f64> {
        match self.load(asset).await {
            Ok(prices) => prices,
            Err(e) => {
                warn!(error = %e, "Could not read stored history");
                Vec::new()
            }
        }
    }

    /// Reads the stored history. Corrupt data reads as empty; a failed read
    /// is an error.
    async fn load(&self, asset: &Asset) -> Result<Vec<f64>, TrackerError> {
        let key = asset.history_key();
        let raw = self
            .collection
            .get(key.as_bytes())
            .await
            .map_err(|e| TrackerError::Storage {
                key: key.clone(),
                reason: format!("{e:#}"),
            })?;
        let Some(raw) = raw else {
            return Ok(Vec::new());
        };

        match decode(&key, &raw) {
            Ok(prices) => Ok(prices),
            Err(e) => {
                warn!(error = %e, "Discarding stored history");
                Ok(Vec::new())
            }
        }
    }

    /// Appends `price` to the history of `asset` and persists it.
    ///
    /// Returns the updated history, which never exceeds `MAX_HISTORY_LEN`.
    /// If the stored history cannot be read, nothing is written.
    pub async fn append(&self, asset: &Asset, price: f64) -> Result<Vec<f64>, TrackerError> {
        let key = asset.history_key();
        let mut prices = self.load(asset).await?;
        prices.push(price);
        if prices.len() > MAX_HISTORY_LEN {
            let excess = prices.len() - MAX_HISTORY_LEN;
            prices.drain(..excess);
        }

        let encoded = serde_json::to_vec(&prices).map_err(|e| TrackerError::Storage {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.collection
            .put(key.as_bytes(), &encoded)
            .await
            .map_err(|e| TrackerError::Storage {
                key: key.clone(),
                reason: format!("{e:#}"),
            })?;

        debug!(asset = %asset, len = prices.len(), "Stored price history");
        Ok(prices)
    }
}

fn decode(key: &str, raw: &[u8]) -> Result<Vec<f64>, TrackerError> {
    serde_json::from_slice(raw).map_err(|e| TrackerError::StorageCorrupt {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A backend whose reads always fail.
    #[derive(Default)]
    struct UnreadableCollection {
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueCollection for UnreadableCollection {
        async fn get(&self, _key: &[u8]) -> anyhow::Result<Option<Vec<u8>>> {
            anyhow::bail!("journal is unreadable")
        }

        async fn put(&self, _key: &[u8], _value: &[u8]) -> anyhow::Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn store() -> (PriceHistoryStore, Arc<MemoryCollection>) {
        let collection = Arc::new(MemoryCollection::new());
        (PriceHistoryStore::new(collection.clone()), collection)
    }

    fn bitcoin() -> Asset {
        Asset::new("bitcoin", "BTC")
    }

    #[tokio::test]
    async fn test_empty_history() {
        let (store, _) = store();
        assert!(store.get_history(&bitcoin()).await.is_empty());
    }

    #[tokio::test]
    async fn test_append_keeps_last_twenty_in_order() {
        let (store, _) = store();
        let asset = bitcoin();

        for i in 1..=25 {
            let history = store.append(&asset, i as f64).await.unwrap();
            assert!(history.len() <= MAX_HISTORY_LEN);
        }

        let expected: Vec<f64> = (6..=25).map(|i| i as f64).collect();
        assert_eq!(store.get_history(&asset).await, expected);
    }

    #[tokio::test]
    async fn test_histories_are_per_asset() {
        let (store, _) = store();
        let eth = Asset::new("ethereum", "ETH");

        store.append(&bitcoin(), 100.0).await.unwrap();
        store.append(&eth, 5.0).await.unwrap();

        assert_eq!(store.get_history(&bitcoin()).await, vec![100.0]);
        assert_eq!(store.get_history(&eth).await, vec![5.0]);
    }

    #[tokio::test]
    async fn test_round_trip_full_history() {
        let (store, collection) = store();
        let asset = bitcoin();
        let prices: Vec<f64> = (0..MAX_HISTORY_LEN).map(|i| 100.0 + i as f64 * 0.25).collect();
        for p in &prices {
            store.append(&asset, *p).await.unwrap();
        }

        // A fresh store over the same collection reads the same sequence
        let reloaded = PriceHistoryStore::new(collection);
        assert_eq!(reloaded.get_history(&asset).await, prices);
    }

    #[tokio::test]
    async fn test_corrupt_data_reads_as_empty() {
        let (store, collection) = store();
        collection
            .put(b"bitcoin-prices", b"{not json")
            .await
            .unwrap();
        assert!(store.get_history(&bitcoin()).await.is_empty());

        collection
            .put(b"bitcoin-prices", br#"["a", "b"]"#)
            .await
            .unwrap();
        assert!(store.get_history(&bitcoin()).await.is_empty());

        // Appending over corrupt data starts a new history
        let history = store.append(&bitcoin(), 42.0).await.unwrap();
        assert_eq!(history, vec![42.0]);
    }

    #[tokio::test]
    async fn test_unreadable_history_is_not_overwritten() {
        let collection = Arc::new(UnreadableCollection::default());
        let store = PriceHistoryStore::new(collection.clone());

        assert!(store.get_history(&bitcoin()).await.is_empty());

        let err = store.append(&bitcoin(), 42.0).await.unwrap_err();
        assert!(matches!(err, TrackerError::Storage { ref key, .. } if key == "bitcoin-prices"));
        assert_eq!(collection.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_decode_reports_corruption() {
        let err = decode("bitcoin-prices", b"[1.0, null]").unwrap_err();
        assert!(matches!(err, TrackerError::StorageCorrupt { ref key, .. } if key == "bitcoin-prices"));
    }

    proptest! {
        #[test]
        fn prop_history_never_exceeds_cap(prices in proptest::collection::vec(0.01f64..1e6, 0..60)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let (store, _) = store();
                for p in &prices {
                    let history = store.append(&bitcoin(), *p).await.unwrap();
                    prop_assert!(history.len() <= MAX_HISTORY_LEN);
                }
                let stored = store.get_history(&bitcoin()).await;
                let start = prices.len().saturating_sub(MAX_HISTORY_LEN);
                prop_assert_eq!(stored, prices[start..].to_vec());
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
