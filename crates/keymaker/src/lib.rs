//! Hierarchical deterministic key makers for a wallet address manager.
//!
//! A [`KeyMaker`] creates a wallet's master extended key and derives the scoped coin-type and
//! account keys below it. [`LocalKeyMaker`] computes keys in software from a seed or from the
//! encrypted master key kept in a [`MasterKeyStore`](keymaker_db::MasterKeyStore);
//! [`RemoteKeyMaker`] asks a signing device for public keys and hands out handles for the private
//! halves it never exports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use bitcoin::Network;
//! use keymaker::{provision_master_keys, CryptoKey, KeyMaker, KeyScope, LocalKeyMaker};
//! use keymaker_db::MasterKeyStoreInMemory;
//!
//! let store = MasterKeyStoreInMemory::default();
//! let key = CryptoKey::generate();
//!
//! // Create a wallet from a seed.
//! let maker = LocalKeyMaker::from_seed(seed, Network::Signet);
//! let master_xpub = provision_master_keys(&maker, &store, &key).await?;
//!
//! // Reopen it later; the root key is decrypted on first use.
//! let maker = LocalKeyMaker::new();
//! let account = maker
//!     .derive_account_key(KeyScope::BIP0084, 0, &store, &key)
//!     .await?;
//! ```

pub mod crypto;
pub mod errors;
mod keys;
mod local;
pub mod paths;
mod provision;
pub mod remote;
mod scope;
mod traits;

pub use crypto::{CryptoError, CryptoKey, Decryptor, Encryptor};
pub use errors::{DerivationError, KeyMakerError, KeyMakerResult};
pub use keys::{DeviceKeyHandle, ExtendedKeyPair, PrivateKey};
pub use local::{LocalKeyMaker, RootKeyState};
pub use paths::{
    HARDENED_START, MAX_ACCOUNT_NUM, MAX_COIN_TYPE, MAX_SEED_BYTES, MIN_SEED_BYTES,
    RECOMMENDED_SEED_BYTES,
};
pub use provision::provision_master_keys;
pub use remote::{DeviceError, DeviceSession, HwConfig, RemoteKeyMaker};
pub use scope::{KeyScope, ParseScopeError};
pub use traits::KeyMaker;
