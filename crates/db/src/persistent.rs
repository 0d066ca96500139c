//! Sled-backed implementation of the master key store.

use async_trait::async_trait;
use sled::{
    transaction::{TransactionError, TransactionResult},
    Batch, Db, Tree,
};
use tracing::debug;

use crate::{
    errors::DbResult,
    master_keys::{MasterHdKeys, MasterKeyStore},
};

/// Name of the sled tree holding the master HD key records.
pub const MASTER_HD_KEYS_TREE: &str = "master_hd_keys";

/// Key of the encrypted master private key record.
const MASTER_PRIV_KEY: &[u8] = b"priv";

/// Key of the encrypted master public key record.
const MASTER_PUB_KEY: &[u8] = b"pub";

/// Master key store persisted in a [`sled`] tree.
#[derive(Debug, Clone)]
pub struct SledMasterKeyStore {
    tree: Tree,
}

impl SledMasterKeyStore {
    /// Opens (creating if needed) the master key tree inside `db`.
    pub fn open(db: &Db) -> DbResult<Self> {
        let tree = db.open_tree(MASTER_HD_KEYS_TREE)?;
        Ok(Self { tree })
    }
}

#[async_trait]
impl MasterKeyStore for SledMasterKeyStore {
    async fn fetch_master_hd_keys(&self) -> DbResult<MasterHdKeys> {
        let private = self.tree.get(MASTER_PRIV_KEY)?.map(|v| v.to_vec());
        let public = self.tree.get(MASTER_PUB_KEY)?.map(|v| v.to_vec());

        Ok(MasterHdKeys { private, public })
    }

    async fn put_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<()> {
        let mut batch = Batch::default();
        if let Some(private) = keys.private {
            batch.insert(MASTER_PRIV_KEY, private);
        }
        if let Some(public) = keys.public {
            batch.insert(MASTER_PUB_KEY, public);
        }

        self.tree.apply_batch(batch)?;
        let flushed = self.tree.flush_async().await?;
        debug!(%flushed, "persisted master hd keys");

        Ok(())
    }

    async fn insert_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<bool> {
        let inserted: TransactionResult<bool, ()> = self.tree.transaction(|tx| {
            if tx.get(MASTER_PRIV_KEY)?.is_some() || tx.get(MASTER_PUB_KEY)?.is_some() {
                return Ok(false);
            }
            if let Some(private) = &keys.private {
                tx.insert(MASTER_PRIV_KEY, private.as_slice())?;
            }
            if let Some(public) = &keys.public {
                tx.insert(MASTER_PUB_KEY, public.as_slice())?;
            }
            Ok(true)
        });

        let inserted = match inserted {
            Ok(inserted) => inserted,
            Err(TransactionError::Abort(())) => false,
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        };

        if inserted {
            let flushed = self.tree.flush_async().await?;
            debug!(%flushed, "persisted master hd keys");
        }

        Ok(inserted)
    }
}
