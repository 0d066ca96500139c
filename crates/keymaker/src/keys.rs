use bitcoin::bip32::{ChildNumber, DerivationPath, Fingerprint, Xpriv, Xpub};
use secp256k1::SECP256K1;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Reference to a private key that never leaves a signing device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceKeyHandle {
    /// Fingerprint of the device's master key.
    pub master_fingerprint: Fingerprint,

    /// Path of the key below the device's master key.
    pub path: DerivationPath,
}

/// Private half of an [`ExtendedKeyPair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivateKey {
    /// Raw extended private key computed locally.
    Xpriv(Xpriv),

    /// Non-exportable key held by a signing device.
    Device(DeviceKeyHandle),
}

impl PrivateKey {
    /// The raw extended private key, if this is a local key.
    pub const fn as_xpriv(&self) -> Option<&Xpriv> {
        match self {
            Self::Xpriv(xpriv) => Some(xpriv),
            Self::Device(_) => None,
        }
    }
}

/// A private key together with its public counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedKeyPair {
    /// Private half.
    pub private: PrivateKey,

    /// Public half.
    pub public: Xpub,
}

impl ExtendedKeyPair {
    /// Pairs a locally computed private key with its neutered form.
    pub fn from_xpriv(xpriv: Xpriv) -> Self {
        let public = Xpub::from_priv(SECP256K1, &xpriv);
        Self {
            private: PrivateKey::Xpriv(xpriv),
            public,
        }
    }

    /// Neuters the private half, if it is a local key.
    ///
    /// For every pair returned by a key maker this equals [`Self::public`].
    pub fn neutered_private(&self) -> Option<Xpub> {
        self.private
            .as_xpriv()
            .map(|xpriv| Xpub::from_priv(SECP256K1, xpriv))
    }
}

/// Master extended private key cached by a local key maker.
///
/// Wiped when dropped.
pub(crate) struct RootKey(Xpriv);

impl RootKey {
    pub(crate) const fn new(xpriv: Xpriv) -> Self {
        Self(xpriv)
    }

    pub(crate) const fn xpriv(&self) -> &Xpriv {
        &self.0
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RootKey")
            .field(&self.0.fingerprint(SECP256K1))
            .finish()
    }
}

// Manual Drop implementation to zeroize the key on drop.
impl Drop for RootKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for RootKey {
    #[inline]
    fn zeroize(&mut self) {
        let Self(root) = self;

        // The network kind is a public parameter and is left as is.
        //
        // NOTE: `SecretKey::non_secure_erase` writes `1`s to the memory.
        root.depth.zeroize();
        {
            let fingerprint: &mut [u8; 4] = root.parent_fingerprint.as_mut();
            fingerprint.zeroize();
        }
        root.private_key.non_secure_erase();
        {
            let chaincode: &mut [u8; 32] = root.chain_code.as_mut();
            chaincode.zeroize();
        }
        root.child_number = if root.child_number.is_normal() {
            ChildNumber::Normal { index: 0 }
        } else {
            ChildNumber::Hardened { index: 0 }
        };
    }
}

impl ZeroizeOnDrop for RootKey {}

#[cfg(test)]
mod tests {
    use bitcoin::NetworkKind;

    use super::*;

    #[test]
    fn test_zeroize() {
        let master = Xpriv::new_master(NetworkKind::Test, &[2u8; 32]).unwrap();
        let child = master
            .derive_priv(SECP256K1, &[ChildNumber::from_hardened_idx(1).unwrap()])
            .unwrap();
        let mut root = RootKey::new(child);

        assert_ne!(*root.xpriv().chain_code.as_bytes(), [0u8; 32]);
        assert_ne!(*root.xpriv().parent_fingerprint.as_bytes(), [0u8; 4]);

        root.zeroize();

        // NOTE: SecretKey::non_secure_erase writes `1`s to the memory.
        assert_eq!(root.xpriv().private_key.secret_bytes(), [1u8; 32]);
        assert_eq!(*root.xpriv().chain_code.as_bytes(), [0u8; 32]);
        assert_eq!(*root.xpriv().parent_fingerprint.as_bytes(), [0u8; 4]);
        assert_eq!(root.xpriv().depth, 0);
        assert_eq!(
            root.xpriv().child_number,
            ChildNumber::Hardened { index: 0 },
            "child number must be zeroed while keeping its hardened status"
        );
    }

    #[test]
    fn test_pair_is_consistent() {
        let master = Xpriv::new_master(NetworkKind::Main, &[9u8; 32]).unwrap();
        let pair = ExtendedKeyPair::from_xpriv(master);

        assert_eq!(pair.neutered_private(), Some(pair.public));
        assert_eq!(pair.private.as_xpriv(), Some(&master));
    }
}
