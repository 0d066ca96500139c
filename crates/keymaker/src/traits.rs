//! The capability every key maker provides to the address manager.

use async_trait::async_trait;
use keymaker_db::MasterKeyStore;

use crate::{crypto::Decryptor, errors::KeyMakerResult, keys::ExtendedKeyPair, scope::KeyScope};

/// Creates master keys and derives the scoped coin-type and account keys of a wallet.
///
/// Implemented by [`LocalKeyMaker`](crate::LocalKeyMaker), which computes keys from a seed or a
/// stored master key, and by [`RemoteKeyMaker`](crate::RemoteKeyMaker), which asks a signing
/// device. Callers do not need to know which one they hold.
///
/// Every implementation checks the coin type and account bounds before doing any other work,
/// derives deterministically, and returns pairs whose public half is the neutered private half.
/// The `store` and `decryptor` are only borrowed for the duration of a call.
#[async_trait]
pub trait KeyMaker: Send + Sync {
    /// Creates a new master key pair and keeps its private half as the root of future
    /// derivations.
    async fn create_master_key(&self) -> KeyMakerResult<ExtendedKeyPair>;

    /// Derives the coin-type key pair for `scope`.
    ///
    /// In particular this is the hierarchical deterministic extended key path:
    /// `m/<purpose>'/<coin type>'`.
    async fn derive_coin_type_key(
        &self,
        scope: KeyScope,
        store: &dyn MasterKeyStore,
        decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair>;

    /// Derives the key pair of `account` within `scope`.
    ///
    /// In particular this is the hierarchical deterministic extended key path:
    /// `m/<purpose>'/<coin type>'/<account>'`.
    async fn derive_account_key(
        &self,
        scope: KeyScope,
        account: u32,
        store: &dyn MasterKeyStore,
        decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair>;
}
