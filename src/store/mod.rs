pub mod disk;
pub mod memory;

use crate::core::cache::KeyValueCollection;
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

/// Collection holding the per-asset price histories.
pub const PRICES_COLLECTION: &str = "prices";
/// Collection holding application settings such as the last seen version.
pub const SETTINGS_COLLECTION: &str = "settings";

/// Hands out named key-value collections.
///
/// Collections live in a fjall keyspace when one could be opened, and in
/// memory otherwise.
pub struct KeyValueStore {
    collections: Mutex<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    /// Opens (or creates) the keyspace under `data_path/store`.
    pub fn open(data_path: &Path) -> Self {
        let store_dir = data_path.join("store");
        let keyspace = match fjall::Config::new(&store_dir).open() {
            Ok(ks) => {
                debug!("Opened keyspace at {}", store_dir.display());
                Some(Arc::new(ks))
            }
            Err(e) => {
                warn!(
                    "Could not open keyspace at {}: {}. Falling back to memory",
                    store_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: Mutex::new(HashMap::new()),
            keyspace,
        }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            keyspace: None,
        }
    }

    /// Returns the named collection, creating it on first use.
    pub fn collection(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        let mut collections = self
            .collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = collections.get(name) {
            return Arc::clone(existing);
        }

        let created: Arc<dyn KeyValueCollection> = match self.keyspace.as_ref().map(|ks| {
            ks.open_partition(name, PartitionCreateOptions::default())
                .map(|partition| DiskCollection::new(Arc::clone(ks), partition))
        }) {
            Some(Ok(disk)) => Arc::new(disk),
            Some(Err(e)) => {
                warn!("Could not open partition {}: {}. Using memory", name, e);
                Arc::new(MemoryCollection::new())
            }
            None => Arc::new(MemoryCollection::new()),
        };

        collections.insert(name.to_string(), Arc::clone(&created));
        created
    }
}
