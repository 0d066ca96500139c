//! BIP32 policy constants and the paths of the scoped key hierarchy.
//!
//! # Key Hierarchy Overview
//!
//! ```text
//! Master Seed (16..=64 bytes)
//! └── m ─────────────────────────── master extended key (root)
//!     └── m/<purpose>' ─────────── purpose key (BIP-43)
//!         └── m/<purpose>'/<coin>' ── coin-type key, one per [`KeyScope`]
//!             └── m/<purpose>'/<coin>'/<account>' ── account key (BIP-44)
//! ```
//!
//! Every step below the master is a hardened derivation, so none of these keys can be computed
//! from a parent public key alone.
//!
//! [`KeyScope`]: crate::KeyScope

use bitcoin::bip32::{self, ChildNumber, DerivationPath};

/// Child index offset marking a hardened derivation.
pub const HARDENED_START: u32 = 0x8000_0000;

/// Largest coin type a [`KeyScope`](crate::KeyScope) may select.
pub const MAX_COIN_TYPE: u32 = HARDENED_START - 1;

/// Largest account number that can be derived.
///
/// One below [`MAX_COIN_TYPE`] so that the last hardened index stays free for the imported-keys
/// pseudo account.
pub const MAX_ACCOUNT_NUM: u32 = HARDENED_START - 2;

/// Shortest seed accepted when creating a master key (128 bits).
pub const MIN_SEED_BYTES: usize = 16;

/// Longest seed accepted when creating a master key (512 bits).
pub const MAX_SEED_BYTES: usize = 64;

/// Seed length used when a new seed is generated (256 bits).
pub const RECOMMENDED_SEED_BYTES: usize = 32;

/// Hardened child number for `index`, i.e. `index + HARDENED_START`.
///
/// Fails if `index` is already at or above [`HARDENED_START`].
pub fn hardened(index: u32) -> Result<ChildNumber, bip32::Error> {
    ChildNumber::from_hardened_idx(index)
}

/// Path of the coin-type key: `m/<purpose>'/<coin>'`.
pub fn coin_type_path(purpose: u32, coin: u32) -> Result<DerivationPath, bip32::Error> {
    Ok(DerivationPath::master().extend([hardened(purpose)?, hardened(coin)?]))
}

/// Path of the account key: `m/<purpose>'/<coin>'/<account>'`.
pub fn account_path(purpose: u32, coin: u32, account: u32) -> Result<DerivationPath, bip32::Error> {
    Ok(coin_type_path(purpose, coin)?.extend([hardened(account)?]))
}
