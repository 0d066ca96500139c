//! Interface to the namespace holding the encrypted master HD keys.

use async_trait::async_trait;

use crate::errors::DbResult;

/// The encrypted master extended keys of a wallet.
///
/// Both records are opaque ciphertext; the store never sees plaintext key material. A wallet that
/// was created watching-only has a `public` record but no `private` one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MasterHdKeys {
    /// Encrypted serialization of the master extended private key.
    pub private: Option<Vec<u8>>,

    /// Encrypted serialization of the master extended public key.
    pub public: Option<Vec<u8>>,
}

impl MasterHdKeys {
    /// Returns `true` if neither record has been written.
    pub const fn is_empty(&self) -> bool {
        self.private.is_none() && self.public.is_none()
    }
}

/// Namespace of the wallet database that persists the encrypted master HD keys.
///
/// The records are written once during wallet creation and only read afterwards.
#[async_trait]
pub trait MasterKeyStore: Send + Sync {
    /// Gets whichever of the encrypted master key records are present.
    async fn fetch_master_hd_keys(&self) -> DbResult<MasterHdKeys>;

    /// Writes the records that are set in `keys`, atomically.
    ///
    /// Records that are `None` in `keys` are left untouched.
    async fn put_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<()>;

    /// Writes the records that are set in `keys` only if neither record exists yet.
    ///
    /// The existence check and the write are one atomic step. Returns `false`, writing nothing,
    /// if a record was already present.
    async fn insert_master_hd_keys(&self, keys: MasterHdKeys) -> DbResult<bool>;
}
