use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection backed by a HashMap behind a Mutex
#[derive(Default)]
pub struct MemoryCollection {
    inner: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let map = self.inner.lock().await;
        let value = map.get(key).cloned();
        if value.is_some() {
            debug!("Store HIT for key: {}", String::from_utf8_lossy(key));
        } else {
            debug!("Store MISS for key: {}", String::from_utf8_lossy(key));
        }
        Ok(value)
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut map = self.inner.lock().await;
        debug!("Store PUT for key: {}", String::from_utf8_lossy(key));
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }
}
