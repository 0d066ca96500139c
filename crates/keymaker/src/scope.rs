//! Key scopes: the `(purpose, coin type)` pair selecting a derivation sub-tree.

use std::{fmt, str::FromStr};

use bitcoin::bip32::{self, DerivationPath};
use thiserror::Error;

use crate::paths::{account_path, coin_type_path};

/// Selects the `m/<purpose>'/<coin>'` sub-tree keys are derived in.
///
/// Scopes are supplied by the caller and never validated on construction; the key makers check
/// [`MAX_COIN_TYPE`](crate::MAX_COIN_TYPE) when a scope is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyScope {
    /// BIP-43 purpose field.
    pub purpose: u32,

    /// BIP-44 coin type.
    pub coin: u32,
}

impl KeyScope {
    /// Legacy pay-to-pubkey-hash keys (BIP-44).
    pub const BIP0044: Self = Self::new(44, 0);

    /// Nested segwit keys with native segwit change (BIP-49 plus).
    pub const BIP0049_PLUS: Self = Self::new(49, 0);

    /// Native segwit keys (BIP-84).
    pub const BIP0084: Self = Self::new(84, 0);

    /// Taproot keys (BIP-86).
    pub const BIP0086: Self = Self::new(86, 0);

    /// The scopes a freshly created wallet sets up.
    pub const DEFAULT_SCOPES: [Self; 4] = [
        Self::BIP0044,
        Self::BIP0049_PLUS,
        Self::BIP0084,
        Self::BIP0086,
    ];

    /// Creates a scope from its purpose and coin type.
    pub const fn new(purpose: u32, coin: u32) -> Self {
        Self { purpose, coin }
    }

    /// Derivation path of this scope's coin-type key.
    pub fn coin_type_path(&self) -> Result<DerivationPath, bip32::Error> {
        coin_type_path(self.purpose, self.coin)
    }

    /// Derivation path of `account` within this scope.
    pub fn account_path(&self, account: u32) -> Result<DerivationPath, bip32::Error> {
        account_path(self.purpose, self.coin, account)
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m/{}'/{}'", self.purpose, self.coin)
    }
}

/// A string could not be parsed into a [`KeyScope`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid key scope {0:?}: expected bip44, bip49, bip84, bip86 or <purpose>/<coin>")]
pub struct ParseScopeError(String);

impl FromStr for KeyScope {
    type Err = ParseScopeError;

    /// Accepts the well-known scope names (`bip44`, `bip49`, `bip84`, `bip86`) or an explicit
    /// `<purpose>/<coin>` pair.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bip44" => return Ok(Self::BIP0044),
            "bip49" => return Ok(Self::BIP0049_PLUS),
            "bip84" => return Ok(Self::BIP0084),
            "bip86" => return Ok(Self::BIP0086),
            _ => {}
        }

        let err = || ParseScopeError(s.to_owned());
        let (purpose, coin) = s.split_once('/').ok_or_else(err)?;
        let purpose = purpose.trim().parse().map_err(|_| err())?;
        let coin = coin.trim().parse().map_err(|_| err())?;

        Ok(Self::new(purpose, coin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_str() {
        assert_eq!("bip44".parse::<KeyScope>(), Ok(KeyScope::BIP0044));
        assert_eq!("BIP84".parse::<KeyScope>(), Ok(KeyScope::BIP0084));
        assert_eq!("1017/1".parse::<KeyScope>(), Ok(KeyScope::new(1017, 1)));
        assert_eq!(" 86 / 0 ".trim().parse::<KeyScope>(), Ok(KeyScope::BIP0086));

        for bad in ["", "bip32", "44", "44/", "/0", "44/0/0", "-1/0"] {
            assert!(
                bad.parse::<KeyScope>().is_err(),
                "{bad:?} must not parse as a scope"
            );
        }
    }

    #[test]
    fn test_scope_display() {
        assert_eq!(KeyScope::BIP0049_PLUS.to_string(), "m/49'/0'");
        assert_eq!(
            KeyScope::BIP0086.account_path(3).unwrap(),
            DerivationPath::from_str("m/86'/0'/3'").unwrap()
        );
    }
}
