//! Error taxonomy shared by every key maker.

use std::time::Duration;

use bitcoin::bip32;
use keymaker_db::DbError;
use thiserror::Error;

use crate::{crypto::CryptoError, remote::DeviceError};

/// Why a BIP32 step could not produce a key.
#[derive(Debug, Error)]
pub enum DerivationError {
    /// BIP32 derivation failed.
    #[error("BIP32 derivation error: {0}")]
    Bip32(#[from] bip32::Error),

    /// The key maker was not given a seed to create a master key from.
    #[error("no seed available to create a master key")]
    MissingSeed,

    /// The seed length is outside the accepted range.
    #[error("seed length of {0} bytes is out of range")]
    SeedLength(usize),
}

/// Errors returned by [`KeyMaker`](crate::KeyMaker) operations.
#[derive(Debug, Error)]
pub enum KeyMakerError {
    /// The requested coin type exceeds [`MAX_COIN_TYPE`](crate::MAX_COIN_TYPE).
    #[error("coin type {coin} is too high")]
    CoinTypeTooHigh {
        /// The rejected coin type.
        coin: u32,
    },

    /// The requested account exceeds [`MAX_ACCOUNT_NUM`](crate::MAX_ACCOUNT_NUM).
    #[error("account number {account} is too high")]
    AccountNumTooHigh {
        /// The rejected account number.
        account: u32,
    },

    /// No private key material exists for this wallet.
    #[error("wallet is watching-only")]
    WatchingOnly,

    /// The stored master private key could not be decrypted.
    #[error("failed to decrypt master root private key: {0}")]
    Locked(#[source] CryptoError),

    /// The decrypted master private key is not a valid extended private key.
    #[error("key chain is corrupt: {0}")]
    KeyChainCorrupt(String),

    /// A master-key or child-key derivation step failed.
    #[error("key derivation failed: {0}")]
    KeyDerivationFailed(#[from] DerivationError),

    /// The key-material store could not be read or written.
    #[error("storage: {0}")]
    Storage(#[from] DbError),

    /// Master keys were already written for this wallet.
    #[error("master keys are already provisioned")]
    AlreadyProvisioned,

    /// A master key record could not be encrypted.
    #[error("failed to encrypt master key record: {0}")]
    Encrypt(#[source] CryptoError),

    /// The key maker cannot perform this operation.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// The signing device did not answer in time.
    #[error("signing device did not respond within {0:?}")]
    DeviceTimeout(Duration),

    /// The signing device failed the request.
    #[error("signing device: {0}")]
    Device(#[source] DeviceError),
}

impl KeyMakerError {
    /// Whether retrying the same request can succeed once the caller has acted (e.g. unlocked the
    /// wallet or reconnected the device).
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Locked(_) | Self::DeviceTimeout(_))
    }
}

impl From<bip32::Error> for KeyMakerError {
    fn from(err: bip32::Error) -> Self {
        Self::KeyDerivationFailed(err.into())
    }
}

/// Result type for key maker operations.
pub type KeyMakerResult<T> = Result<T, KeyMakerError>;
