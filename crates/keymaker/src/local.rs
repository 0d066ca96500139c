//! Seed-based key maker that keeps its root private key in memory.

use std::str::FromStr;

use async_trait::async_trait;
use bitcoin::{
    bip32::{self, Xpriv},
    NetworkKind,
};
use keymaker_db::{MasterHdKeys, MasterKeyStore};
use secp256k1::SECP256K1;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::{
    crypto::Decryptor,
    errors::{DerivationError, KeyMakerError, KeyMakerResult},
    keys::{ExtendedKeyPair, RootKey},
    paths::{hardened, MAX_ACCOUNT_NUM, MAX_COIN_TYPE, MAX_SEED_BYTES, MIN_SEED_BYTES},
    scope::KeyScope,
    traits::KeyMaker,
};

/// Where a [`LocalKeyMaker`] stands with respect to its root private key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKeyState {
    /// Neither a seed nor a root key is known; the root key is loaded from the store on first
    /// use.
    Uninitialized,

    /// Only a seed is known; the root key is created by
    /// [`create_master_key`](KeyMaker::create_master_key) or loaded from the store on first use.
    SeedOnly,

    /// The root private key is cached and reused for every derivation.
    CachedPrivate,
}

/// Seed a master key can be created from.
struct Seed {
    bytes: Zeroizing<Vec<u8>>,
    network: NetworkKind,
}

/// Key maker deriving keys locally from a software seed or master key.
///
/// The root private key is either given up front, created from the seed by
/// [`create_master_key`](KeyMaker::create_master_key), or lazily decrypted from the
/// [`MasterKeyStore`] the first time a derivation needs it. Once cached it is reused for the
/// lifetime of the instance and wiped when the instance is dropped.
///
/// Only this instance ever mutates the cache. Concurrent derivations are serialized on it, so at
/// most one decryption of the stored root key is in flight and callers either see the cached key
/// or wait for it.
pub struct LocalKeyMaker {
    seed: Option<Seed>,
    root: Mutex<Option<RootKey>>,
}

impl LocalKeyMaker {
    /// Creates a key maker for an existing wallet whose root key lives encrypted in the store.
    pub fn new() -> Self {
        Self {
            seed: None,
            root: Mutex::new(None),
        }
    }

    /// Creates a key maker that derives from an already known master private key.
    pub fn from_root_key(root: Xpriv) -> Self {
        Self {
            seed: None,
            root: Mutex::new(Some(RootKey::new(root))),
        }
    }

    /// Creates a key maker that can create a master key from `seed` for `network`.
    pub fn from_seed(seed: impl Into<Vec<u8>>, network: impl Into<NetworkKind>) -> Self {
        Self {
            seed: Some(Seed {
                bytes: Zeroizing::new(seed.into()),
                network: network.into(),
            }),
            root: Mutex::new(None),
        }
    }

    /// Reports whether the root private key is cached yet.
    pub async fn state(&self) -> RootKeyState {
        if self.root.lock().await.is_some() {
            RootKeyState::CachedPrivate
        } else if self.seed.is_some() {
            RootKeyState::SeedOnly
        } else {
            RootKeyState::Uninitialized
        }
    }

    /// Derives the coin-type private key, loading the root key first if needed.
    async fn coin_type_xpriv(
        &self,
        scope: KeyScope,
        store: &dyn MasterKeyStore,
        decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<Xpriv> {
        // Enforce maximum coin type.
        if scope.coin > MAX_COIN_TYPE {
            return Err(KeyMakerError::CoinTypeTooHigh { coin: scope.coin });
        }

        trace!(action = "trying to acquire lock on root key", %scope);
        let mut cached = self.root.lock().await;
        trace!(event = "lock acquired on root key", %scope);

        let root = match cached.take() {
            Some(root) => root,
            None => load_root_key(store, decryptor).await?,
        };
        let root = cached.insert(root);

        // Derive the purpose key as a child of the master node, then the coin type key as a child
        // of the purpose key.
        let purpose = hardened_child(root.xpriv(), scope.purpose)?;
        Ok(hardened_child(&purpose, scope.coin)?)
    }
}

impl Default for LocalKeyMaker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocalKeyMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalKeyMaker")
            .field("network", &self.seed.as_ref().map(|seed| seed.network))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KeyMaker for LocalKeyMaker {
    async fn create_master_key(&self) -> KeyMakerResult<ExtendedKeyPair> {
        let seed = self.seed.as_ref().ok_or(DerivationError::MissingSeed)?;
        if !(MIN_SEED_BYTES..=MAX_SEED_BYTES).contains(&seed.bytes.len()) {
            return Err(DerivationError::SeedLength(seed.bytes.len()).into());
        }

        let root = Xpriv::new_master(seed.network, &seed.bytes)?;
        let pair = ExtendedKeyPair::from_xpriv(root);

        *self.root.lock().await = Some(RootKey::new(root));
        debug!(fingerprint = %pair.public.fingerprint(), "created master extended key");

        Ok(pair)
    }

    async fn derive_coin_type_key(
        &self,
        scope: KeyScope,
        store: &dyn MasterKeyStore,
        decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair> {
        let coin_type = self.coin_type_xpriv(scope, store, decryptor).await?;
        Ok(ExtendedKeyPair::from_xpriv(coin_type))
    }

    async fn derive_account_key(
        &self,
        scope: KeyScope,
        account: u32,
        store: &dyn MasterKeyStore,
        decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair> {
        // Enforce maximum account number.
        if account > MAX_ACCOUNT_NUM {
            return Err(KeyMakerError::AccountNumTooHigh { account });
        }

        let coin_type = self.coin_type_xpriv(scope, store, decryptor).await?;
        let account_key = hardened_child(&coin_type, account)?;

        Ok(ExtendedKeyPair::from_xpriv(account_key))
    }
}

/// Fetches, decrypts and parses the master root private key.
///
/// The decrypted serialization is wiped before returning, whatever the outcome.
async fn load_root_key(
    store: &dyn MasterKeyStore,
    decryptor: &dyn Decryptor,
) -> KeyMakerResult<RootKey> {
    let MasterHdKeys { private, .. } = store.fetch_master_hd_keys().await?;

    // Without the master root private key in the database no private key can be derived.
    let Some(encrypted) = private else {
        return Err(KeyMakerError::WatchingOnly);
    };

    let serialized = decryptor
        .decrypt(&encrypted)
        .map_err(KeyMakerError::Locked)?;
    let root = parse_root_key(&serialized)?;
    drop(serialized);

    debug!(fingerprint = %root.fingerprint(SECP256K1), "loaded master root private key");
    Ok(RootKey::new(root))
}

/// Parses the base58check serialization of the master root private key.
fn parse_root_key(serialized: &[u8]) -> KeyMakerResult<Xpriv> {
    let encoded = std::str::from_utf8(serialized).map_err(|_| {
        KeyMakerError::KeyChainCorrupt("master root private key is not valid utf-8".to_owned())
    })?;

    Xpriv::from_str(encoded).map_err(|e| {
        KeyMakerError::KeyChainCorrupt(format!(
            "failed to create master extended private key: {e}"
        ))
    })
}

fn hardened_child(parent: &Xpriv, index: u32) -> Result<Xpriv, bip32::Error> {
    parent.derive_priv(SECP256K1, &[hardened(index)?])
}
