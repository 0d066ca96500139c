//! Wallet creation: writing a freshly created master key pair to the store.

use bitcoin::bip32::Xpub;
use keymaker_db::{MasterHdKeys, MasterKeyStore};
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::{
    crypto::Encryptor,
    errors::{KeyMakerError, KeyMakerResult},
    keys::PrivateKey,
    traits::KeyMaker,
};

/// Creates the master key pair with `maker` and stores it encrypted with `encryptor`.
///
/// Both halves are written in their base58check serialization. A private half held by a signing
/// device is never written; only the public record is stored for it. Fails with
/// [`KeyMakerError::AlreadyProvisioned`] if the store holds any master key record, including one
/// written by a concurrent call while this one was creating its key.
///
/// Returns the master extended public key.
pub async fn provision_master_keys(
    maker: &dyn KeyMaker,
    store: &dyn MasterKeyStore,
    encryptor: &dyn Encryptor,
) -> KeyMakerResult<Xpub> {
    if !store.fetch_master_hd_keys().await?.is_empty() {
        return Err(KeyMakerError::AlreadyProvisioned);
    }

    let pair = maker.create_master_key().await?;

    let private = match &pair.private {
        PrivateKey::Xpriv(xpriv) => {
            let serialized = Zeroizing::new(xpriv.to_string());
            Some(
                encryptor
                    .encrypt(serialized.as_bytes())
                    .map_err(KeyMakerError::Encrypt)?,
            )
        }
        PrivateKey::Device(handle) => {
            trace!(fingerprint = %handle.master_fingerprint, "master private key stays on device");
            None
        }
    };
    let public = encryptor
        .encrypt(pair.public.to_string().as_bytes())
        .map_err(KeyMakerError::Encrypt)?;

    let inserted = store
        .insert_master_hd_keys(MasterHdKeys {
            private,
            public: Some(public),
        })
        .await?;
    if !inserted {
        return Err(KeyMakerError::AlreadyProvisioned);
    }
    debug!(fingerprint = %pair.public.fingerprint(), "provisioned master keys");

    Ok(pair.public)
}
