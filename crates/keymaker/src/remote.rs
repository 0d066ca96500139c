//! Key maker backed by an external signing device.
//!
//! The device keeps every private key; this key maker only ever sees extended public keys and
//! hands out [`DeviceKeyHandle`]s in place of private halves. The transport to the device is
//! behind [`DeviceSession`]; a key maker without a session fails every operation with
//! [`KeyMakerError::NotImplemented`].

use std::{future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use bitcoin::{
    bip32::{DerivationPath, Fingerprint, Xpub},
    NetworkKind,
};
use keymaker_db::MasterKeyStore;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::{
    crypto::Decryptor,
    errors::{KeyMakerError, KeyMakerResult},
    keys::{DeviceKeyHandle, ExtendedKeyPair, PrivateKey},
    paths::{MAX_ACCOUNT_NUM, MAX_COIN_TYPE},
    scope::KeyScope,
    traits::KeyMaker,
};

/// Default time a single device request may take.
pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration of a hardware signing session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwConfig {
    /// Identifier of the device, as reported by its transport.
    pub device: String,

    /// Network the device's extended keys must be encoded for.
    pub network: NetworkKind,

    /// The timeout for a single device request.
    pub timeout: Duration,
}

impl HwConfig {
    /// Creates a configuration for `device` with the default request timeout.
    pub fn new(device: impl Into<String>, network: impl Into<NetworkKind>) -> Self {
        Self {
            device: device.into(),
            network: network.into(),
            timeout: DEFAULT_DEVICE_TIMEOUT,
        }
    }
}

/// Errors reported by a [`DeviceSession`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device does not support the requested operation.
    #[error("device does not support {0}")]
    Unsupported(&'static str),

    /// The device refused the request, e.g. because the user declined it.
    #[error("device rejected the request: {0}")]
    Rejected(String),

    /// The device answered with a key for a different network.
    #[error("device returned a key for {got:?}, expected {expected:?}")]
    NetworkMismatch {
        /// Network the session is configured for.
        expected: NetworkKind,
        /// Network of the returned key.
        got: NetworkKind,
    },

    /// The connection to the device failed.
    #[error("transport: {0}")]
    Transport(String),
}

/// Session with a signing device that exports extended public keys.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Fingerprint of the device's master key.
    async fn master_fingerprint(&self) -> Result<Fingerprint, DeviceError>;

    /// Extended public key at `path` below the device's master key.
    async fn xpub(&self, path: &DerivationPath) -> Result<Xpub, DeviceError>;
}

/// Key maker delegating to a signing device.
///
/// Bounds are checked before the device is contacted, and every device request is bounded by
/// [`HwConfig::timeout`]. Dropping a pending call cancels it. The store and decryptor arguments
/// of the [`KeyMaker`] operations are not used: the device holds the keys.
#[derive(Clone)]
pub struct RemoteKeyMaker {
    config: Arc<HwConfig>,
    session: Option<Arc<dyn DeviceSession>>,
}

impl RemoteKeyMaker {
    /// Creates a key maker for `config` with no device session attached.
    ///
    /// Every operation fails with [`KeyMakerError::NotImplemented`] until a session is attached
    /// with [`Self::with_session`].
    pub fn new(config: HwConfig) -> Self {
        Self {
            config: Arc::new(config),
            session: None,
        }
    }

    /// Creates a key maker talking to the device through `session`.
    pub fn with_session(config: HwConfig, session: Arc<dyn DeviceSession>) -> Self {
        Self {
            config: Arc::new(config),
            session: Some(session),
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &HwConfig {
        &self.config
    }

    fn session(&self, operation: &'static str) -> KeyMakerResult<&dyn DeviceSession> {
        self.session
            .as_deref()
            .ok_or(KeyMakerError::NotImplemented(operation))
    }

    /// Runs one device request under the configured timeout.
    async fn request<T>(
        &self,
        fut: impl Future<Output = Result<T, DeviceError>> + Send,
    ) -> KeyMakerResult<T> {
        match timeout(self.config.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(DeviceError::Unsupported(what))) => Err(KeyMakerError::NotImplemented(what)),
            Ok(Err(e)) => Err(KeyMakerError::Device(e)),
            Err(_) => Err(KeyMakerError::DeviceTimeout(self.config.timeout)),
        }
    }

    /// Fetches the key pair at `path` from the device.
    async fn pair_at(
        &self,
        operation: &'static str,
        path: DerivationPath,
    ) -> KeyMakerResult<ExtendedKeyPair> {
        let session = self.session(operation)?;

        trace!(device = %self.config.device, %path, "requesting xpub from device");
        let master_fingerprint = self.request(session.master_fingerprint()).await?;
        let public = self.request(session.xpub(&path)).await?;

        if public.network != self.config.network {
            return Err(KeyMakerError::Device(DeviceError::NetworkMismatch {
                expected: self.config.network,
                got: public.network,
            }));
        }

        Ok(ExtendedKeyPair {
            private: PrivateKey::Device(DeviceKeyHandle {
                master_fingerprint,
                path,
            }),
            public,
        })
    }
}

impl std::fmt::Debug for RemoteKeyMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteKeyMaker")
            .field("config", &self.config)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

#[async_trait]
impl KeyMaker for RemoteKeyMaker {
    async fn create_master_key(&self) -> KeyMakerResult<ExtendedKeyPair> {
        let pair = self
            .pair_at("create_master_key", DerivationPath::master())
            .await?;
        debug!(device = %self.config.device, fingerprint = %pair.public.fingerprint(), "using device master key");

        Ok(pair)
    }

    async fn derive_coin_type_key(
        &self,
        scope: KeyScope,
        _store: &dyn MasterKeyStore,
        _decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair> {
        if scope.coin > MAX_COIN_TYPE {
            return Err(KeyMakerError::CoinTypeTooHigh { coin: scope.coin });
        }

        self.pair_at("derive_coin_type_key", scope.coin_type_path()?)
            .await
    }

    async fn derive_account_key(
        &self,
        scope: KeyScope,
        account: u32,
        _store: &dyn MasterKeyStore,
        _decryptor: &dyn Decryptor,
    ) -> KeyMakerResult<ExtendedKeyPair> {
        if account > MAX_ACCOUNT_NUM {
            return Err(KeyMakerError::AccountNumTooHigh { account });
        }
        if scope.coin > MAX_COIN_TYPE {
            return Err(KeyMakerError::CoinTypeTooHigh { coin: scope.coin });
        }

        self.pair_at("derive_account_key", scope.account_path(account)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        str::FromStr,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use bitcoin::{bip32::Xpriv, Network};
    use keymaker_db::MasterKeyStoreInMemory;
    use secp256k1::SECP256K1;

    use super::*;
    use crate::{crypto::CryptoKey, local::LocalKeyMaker};

    /// Signing device emulated in software.
    struct SoftwareDevice {
        master: Xpriv,
        delay: Option<Duration>,
        unsupported: bool,
        requests: AtomicUsize,
    }

    impl SoftwareDevice {
        fn new(master: Xpriv) -> Self {
            Self {
                master,
                delay: None,
                unsupported: false,
                requests: AtomicUsize::new(0),
            }
        }

        fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        async fn serve(&self) -> Result<(), DeviceError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.unsupported {
                return Err(DeviceError::Unsupported("xpub export"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DeviceSession for SoftwareDevice {
        async fn master_fingerprint(&self) -> Result<Fingerprint, DeviceError> {
            self.serve().await?;
            Ok(self.master.fingerprint(SECP256K1))
        }

        async fn xpub(&self, path: &DerivationPath) -> Result<Xpub, DeviceError> {
            self.serve().await?;
            let xpriv = self
                .master
                .derive_priv(SECP256K1, path)
                .map_err(|e| DeviceError::Rejected(e.to_string()))?;
            Ok(Xpub::from_priv(SECP256K1, &xpriv))
        }
    }

    fn master() -> Xpriv {
        Xpriv::new_master(Network::Signet, &[0x42; 32]).unwrap()
    }

    fn config() -> HwConfig {
        HwConfig::new("test-device", Network::Signet)
    }

    #[tokio::test]
    async fn test_without_session_not_implemented() {
        let maker = RemoteKeyMaker::new(config());
        let store = MasterKeyStoreInMemory::default();
        let key = CryptoKey::generate();

        assert!(matches!(
            maker.create_master_key().await,
            Err(KeyMakerError::NotImplemented("create_master_key"))
        ));
        assert!(matches!(
            maker
                .derive_coin_type_key(KeyScope::BIP0084, &store, &key)
                .await,
            Err(KeyMakerError::NotImplemented(_))
        ));
        assert!(matches!(
            maker
                .derive_account_key(KeyScope::BIP0084, 0, &store, &key)
                .await,
            Err(KeyMakerError::NotImplemented(_))
        ));

        // bounds are still checked first
        assert!(matches!(
            maker
                .derive_account_key(KeyScope::BIP0084, MAX_ACCOUNT_NUM + 1, &store, &key)
                .await,
            Err(KeyMakerError::AccountNumTooHigh { .. })
        ));
    }

    #[tokio::test]
    async fn test_matches_local_public_keys() {
        let device = Arc::new(SoftwareDevice::new(master()));
        let remote = RemoteKeyMaker::with_session(config(), device.clone());
        let local = LocalKeyMaker::from_root_key(master());
        let store = MasterKeyStoreInMemory::default();
        let key = CryptoKey::generate();

        let master_pair = remote.create_master_key().await.unwrap();
        assert_eq!(
            master_pair.public,
            Xpub::from_priv(SECP256K1, &master()),
            "device master key must be reported"
        );

        for scope in KeyScope::DEFAULT_SCOPES {
            let remote_pair = remote
                .derive_account_key(scope, 5, &store, &key)
                .await
                .unwrap();
            let local_pair = local
                .derive_account_key(scope, 5, &store, &key)
                .await
                .unwrap();

            assert_eq!(remote_pair.public, local_pair.public);
            assert_eq!(remote_pair.neutered_private(), None);
            assert_eq!(
                remote_pair.private,
                PrivateKey::Device(DeviceKeyHandle {
                    master_fingerprint: master().fingerprint(SECP256K1),
                    path: scope.account_path(5).unwrap(),
                })
            );

            let remote_coin = remote
                .derive_coin_type_key(scope, &store, &key)
                .await
                .unwrap();
            let local_coin = local
                .derive_coin_type_key(scope, &store, &key)
                .await
                .unwrap();
            assert_eq!(remote_coin.public, local_coin.public);
        }
    }

    #[tokio::test]
    async fn test_bounds_checked_before_device() {
        let device = Arc::new(SoftwareDevice::new(master()));
        let maker = RemoteKeyMaker::with_session(config(), device.clone());
        let store = MasterKeyStoreInMemory::default();
        let key = CryptoKey::generate();

        assert!(matches!(
            maker
                .derive_coin_type_key(KeyScope::new(84, 1 << 31), &store, &key)
                .await,
            Err(KeyMakerError::CoinTypeTooHigh { .. })
        ));
        assert!(matches!(
            maker
                .derive_account_key(KeyScope::new(84, 1 << 31), 0, &store, &key)
                .await,
            Err(KeyMakerError::CoinTypeTooHigh { .. })
        ));
        assert!(matches!(
            maker
                .derive_account_key(KeyScope::BIP0084, u32::MAX, &store, &key)
                .await,
            Err(KeyMakerError::AccountNumTooHigh { .. })
        ));
        assert_eq!(device.requests(), 0, "device must not be contacted");
    }

    #[tokio::test]
    async fn test_device_timeout() {
        let mut device = SoftwareDevice::new(master());
        device.delay = Some(Duration::from_millis(500));
        let mut config = config();
        config.timeout = Duration::from_millis(20);
        let maker = RemoteKeyMaker::with_session(config, Arc::new(device));

        let err = maker
            .create_master_key()
            .await
            .expect_err("slow device must time out");
        assert!(matches!(err, KeyMakerError::DeviceTimeout(d) if d == Duration::from_millis(20)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_device_errors() {
        let mut device = SoftwareDevice::new(master());
        device.unsupported = true;
        let maker = RemoteKeyMaker::with_session(config(), Arc::new(device));
        assert!(matches!(
            maker.create_master_key().await,
            Err(KeyMakerError::NotImplemented("xpub export"))
        ));

        let mainnet = Xpriv::new_master(Network::Bitcoin, &[0x42; 32]).unwrap();
        let maker = RemoteKeyMaker::with_session(config(), Arc::new(SoftwareDevice::new(mainnet)));
        let store = MasterKeyStoreInMemory::default();
        let key = CryptoKey::generate();
        assert!(matches!(
            maker
                .derive_coin_type_key(KeyScope::BIP0044, &store, &key)
                .await,
            Err(KeyMakerError::Device(DeviceError::NetworkMismatch { .. }))
        ));

        assert_eq!(
            maker.config().device,
            "test-device",
            "config must be kept as given"
        );
        let path = DerivationPath::from_str("m/44'/0'").unwrap();
        assert_eq!(KeyScope::BIP0044.coin_type_path().unwrap(), path);
    }
}
