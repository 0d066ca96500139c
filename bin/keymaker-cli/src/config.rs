use std::path::{Path, PathBuf};

use anyhow::Context;
use bitcoin::Network;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// The configuration of the key maker CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Config {
    /// The network master keys are created for.
    #[serde(default = "default_network")]
    pub(crate) network: Network,

    /// The file holding the wallet seed. Generated by `init` if missing.
    #[serde(default = "default_seed")]
    pub(crate) seed: PathBuf,

    /// The file holding the AES-256-GCM key the master key records are encrypted with.
    pub(crate) crypto_key: PathBuf,

    /// The directory of the sled database holding the master key records.
    pub(crate) db: PathBuf,
}

const fn default_network() -> Network {
    Network::Signet
}

fn default_seed() -> PathBuf {
    PathBuf::from("seed")
}

impl Config {
    /// Reads and parses the TOML config at `path`.
    pub(crate) async fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config at {}", path.display()))?;

        toml::from_str(&raw).with_context(|| format!("invalid config at {}", path.display()))
    }
}
