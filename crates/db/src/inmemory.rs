//! In-memory implementation of the master key store.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::trace;

use crate::{
    errors::DbResult,
    master_keys::{MasterHdKeys, MasterKeyStore},
};

/// In-memory store for the encrypted master HD keys.
///
/// Clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct MasterKeyStoreInMemory {
    keys: Arc<RwLock<MasterHdKeys>>,
}

impl MasterKeyStoreInMemory {
    /// Creates a store pre-populated with `keys`.
    pub fn with_keys(keys: MasterHdKeys) -> Self {
        Self {
            keys: Arc::new(RwLock::new(keys)),
        }
    }
}

#[async_trait]
impl MasterKeyStore for MasterKeyStoreInMemory {
    async fn fetch_master_hd_keys(&self) -> DbResult<MasterHdKeys> {
        Ok(self.keys.read().await.clone())
    }

    async fn put_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<()> {
        trace!(action = "trying to acquire wlock on master hd keys");
        let mut stored = self.keys.write().await;
        trace!(event = "wlock acquired on master hd keys");

        if let Some(private) = keys.private {
            stored.private = Some(private);
        }
        if let Some(public) = keys.public {
            stored.public = Some(public);
        }

        Ok(())
    }

    async fn insert_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<bool> {
        trace!(action = "trying to acquire wlock on master hd keys");
        let mut stored = self.keys.write().await;
        trace!(event = "wlock acquired on master hd keys");

        if !stored.is_empty() {
            return Ok(false);
        }
        *stored = keys;

        Ok(true)
    }
}
