use crate::core::cache::KeyValueCollection;
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::sync::Arc;
use tracing::{debug, warn};

/// A collection stored in one fjall partition.
///
/// Every write is persisted to the journal before returning so that
/// histories survive an abrupt exit of the dashboard.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn persist(&self) -> Result<()> {
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist keyspace")
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.partition.get(key) {
            Ok(Some(value)) => {
                debug!("Store HIT for key: {}", String::from_utf8_lossy(key));
                Ok(Some(value.to_vec()))
            }
            Ok(None) => {
                debug!("Store MISS for key: {}", String::from_utf8_lossy(key));
                Ok(None)
            }
            Err(e) => {
                warn!("Store read failed for key {}: {}", String::from_utf8_lossy(key), e);
                Err(e).with_context(|| {
                    format!("Failed to read key: {}", String::from_utf8_lossy(key))
                })
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.partition
            .insert(key, value)
            .with_context(|| format!("Failed to write key: {}", String::from_utf8_lossy(key)))?;
        self.persist()?;
        debug!("Store PUT for key: {}", String::from_utf8_lossy(key));
        Ok(())
    }
}
