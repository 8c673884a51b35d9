use anyhow::Result;
use async_trait::async_trait;

/// A named collection of raw key-value pairs.
///
/// Values are opaque bytes; callers decide the encoding.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    /// Reads a value. A missing key is `Ok(None)`; an error means the
    /// backend could not be read.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    async fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
}
