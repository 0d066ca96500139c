//! Handlers of the CLI commands.
//!
//! Every handler works on an already opened sled database and returns the extended public key it
//! was asked for.

use std::{io, path::Path};

use anyhow::{bail, Context, Result};
use bitcoin::bip32::Xpub;
use keymaker::{
    provision_master_keys, CryptoKey, KeyMaker, KeyScope, LocalKeyMaker, MAX_SEED_BYTES,
    MIN_SEED_BYTES, RECOMMENDED_SEED_BYTES,
};
use keymaker_db::SledMasterKeyStore;
use rand::Rng;
use sled::Db;
use tokio::fs;
use tracing::info;
use zeroize::Zeroizing;

use crate::config::Config;

/// Creates the master keys from the configured seed and stores them encrypted.
pub(crate) async fn init(db: &Db, config: &Config) -> Result<Xpub> {
    let seed = load_or_generate_seed(&config.seed).await?;
    let crypto_key = load_or_generate_crypto_key(&config.crypto_key).await?;
    let store = SledMasterKeyStore::open(db)?;

    let maker = LocalKeyMaker::from_seed(seed.to_vec(), config.network);
    let xpub = provision_master_keys(&maker, &store, &crypto_key)
        .await
        .context("failed to provision master keys")?;

    info!(fingerprint = %xpub.fingerprint(), network = %config.network, "wallet initialized");
    Ok(xpub)
}

/// Derives the coin-type extended public key of `scope` from the stored master key.
pub(crate) async fn coin_type(db: &Db, config: &Config, scope: KeyScope) -> Result<Xpub> {
    let crypto_key = load_crypto_key(&config.crypto_key).await?;
    let store = SledMasterKeyStore::open(db)?;

    let pair = LocalKeyMaker::new()
        .derive_coin_type_key(scope, &store, &crypto_key)
        .await
        .with_context(|| format!("failed to derive coin-type key of {scope}"))?;

    Ok(pair.public)
}

/// Derives the extended public key of `account` within `scope` from the stored master key.
pub(crate) async fn account(
    db: &Db,
    config: &Config,
    scope: KeyScope,
    account: u32,
) -> Result<Xpub> {
    let crypto_key = load_crypto_key(&config.crypto_key).await?;
    let store = SledMasterKeyStore::open(db)?;

    let pair = LocalKeyMaker::new()
        .derive_account_key(scope, account, &store, &crypto_key)
        .await
        .with_context(|| format!("failed to derive account {account} of {scope}"))?;

    Ok(pair.public)
}

async fn load_or_generate_seed(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    match fs::read(path).await {
        Ok(seed) => {
            let seed = Zeroizing::new(seed);
            if !(MIN_SEED_BYTES..=MAX_SEED_BYTES).contains(&seed.len()) {
                bail!(
                    "seed at {} is {} bytes long, expected {MIN_SEED_BYTES} to {MAX_SEED_BYTES}",
                    path.display(),
                    seed.len()
                );
            }
            info!("Loaded seed from {}", path.display());
            Ok(seed)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let mut seed = Zeroizing::new(vec![0u8; RECOMMENDED_SEED_BYTES]);
            rand::thread_rng().fill(&mut seed[..]);
            write_secret(path, &seed).await?;
            info!("Generated new seed at {}", path.display());
            Ok(seed)
        }
        Err(e) => Err(e).with_context(|| format!("failed to read seed at {}", path.display())),
    }
}

async fn load_or_generate_crypto_key(path: &Path) -> Result<CryptoKey> {
    match fs::metadata(path).await {
        Ok(_) => load_crypto_key(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            let key = CryptoKey::generate();
            write_secret(path, key.as_bytes()).await?;
            info!("Generated new crypto key at {}", path.display());
            Ok(key)
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to read crypto key at {}", path.display()))
        }
    }
}

async fn load_crypto_key(path: &Path) -> Result<CryptoKey> {
    let raw = Zeroizing::new(
        fs::read(path)
            .await
            .with_context(|| format!("failed to read crypto key at {}", path.display()))?,
    );
    let bytes: [u8; 32] = raw.as_slice().try_into().with_context(|| {
        format!(
            "crypto key at {} is {} bytes long, expected 32",
            path.display(),
            raw.len()
        )
    })?;

    Ok(CryptoKey::from_bytes(bytes))
}

async fn write_secret(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bitcoin::{
        bip32::{DerivationPath, Xpriv},
        Network,
    };
    use keymaker::KeyMakerError;
    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir) -> Config {
        Config {
            network: Network::Regtest,
            seed: dir.path().join("secrets/seed"),
            crypto_key: dir.path().join("secrets/crypto.key"),
            db: dir.path().join("keys.sled"),
        }
    }

    #[tokio::test]
    async fn test_init_then_derive() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let db = sled::open(&config.db).unwrap();

        let master = init(&db, &config).await.unwrap();

        let seed = std::fs::read(&config.seed).unwrap();
        assert_eq!(seed.len(), RECOMMENDED_SEED_BYTES);
        assert_eq!(std::fs::read(&config.crypto_key).unwrap().len(), 32);

        let root = Xpriv::new_master(Network::Regtest, &seed).unwrap();
        let secp = bitcoin::secp256k1::Secp256k1::new();
        assert_eq!(master, Xpub::from_priv(&secp, &root));

        let coin = coin_type(&db, &config, KeyScope::BIP0084).await.unwrap();
        let expected = root
            .derive_priv(&secp, &DerivationPath::from_str("m/84'/0'").unwrap())
            .unwrap();
        assert_eq!(coin, Xpub::from_priv(&secp, &expected));

        let acct = account(&db, &config, KeyScope::BIP0044, 2).await.unwrap();
        let expected = root
            .derive_priv(&secp, &DerivationPath::from_str("m/44'/0'/2'").unwrap())
            .unwrap();
        assert_eq!(acct, Xpub::from_priv(&secp, &expected));
    }

    #[tokio::test]
    async fn test_init_twice_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let db = sled::open(&config.db).unwrap();

        init(&db, &config).await.unwrap();
        let err = init(&db, &config).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeyMakerError>(),
            Some(KeyMakerError::AlreadyProvisioned)
        ));
    }

    #[tokio::test]
    async fn test_existing_seed_is_used() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let db = sled::open(&config.db).unwrap();

        std::fs::create_dir_all(config.seed.parent().unwrap()).unwrap();
        std::fs::write(&config.seed, [0x11u8; 16]).unwrap();

        let master = init(&db, &config).await.unwrap();
        let root = Xpriv::new_master(Network::Regtest, &[0x11u8; 16]).unwrap();
        let secp = bitcoin::secp256k1::Secp256k1::new();
        assert_eq!(master, Xpub::from_priv(&secp, &root));
    }

    #[tokio::test]
    async fn test_bad_secrets_rejected() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let db = sled::open(&config.db).unwrap();

        std::fs::create_dir_all(config.seed.parent().unwrap()).unwrap();
        std::fs::write(&config.seed, [0x11u8; 8]).unwrap();
        assert!(init(&db, &config).await.is_err(), "short seed must be rejected");

        // deriving before init has no key to decrypt with
        assert!(coin_type(&db, &config, KeyScope::BIP0044).await.is_err());

        std::fs::write(&config.crypto_key, [0u8; 31]).unwrap();
        assert!(load_crypto_key(&config.crypto_key).await.is_err());
    }

    #[tokio::test]
    async fn test_wrong_crypto_key_is_locked() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let db = sled::open(&config.db).unwrap();

        init(&db, &config).await.unwrap();
        std::fs::write(&config.crypto_key, [0x22u8; 32]).unwrap();

        let err = account(&db, &config, KeyScope::BIP0086, 0)
            .await
            .unwrap_err();
        let err = err.downcast_ref::<KeyMakerError>().unwrap();
        assert!(matches!(err, KeyMakerError::Locked(_)));
        assert!(err.is_recoverable());
    }
}
