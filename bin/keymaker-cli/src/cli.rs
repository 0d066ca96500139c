use std::path::PathBuf;

use clap::{Parser, Subcommand};
use keymaker::KeyScope;

#[derive(Parser)]
#[command(
    name = "keymaker-cli",
    about = "Create HD master keys and derive scoped wallet keys",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long,
        env = "KEYMAKER_CONFIG",
        default_value = "keymaker.toml",
        help = "the path to the config file"
    )]
    pub(crate) config: PathBuf,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Commands {
    /// Create the master keys from the seed and store them encrypted.
    Init,

    CoinType(CoinTypeArgs),

    Account(AccountArgs),
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Print the coin-type extended public key of a scope", version)]
pub(crate) struct CoinTypeArgs {
    #[arg(
        long,
        default_value = "bip84",
        help = "the key scope, e.g. bip44, bip49, bip84, bip86 or <purpose>/<coin>"
    )]
    pub(crate) scope: KeyScope,
}

#[derive(Parser, Debug, Clone)]
#[command(about = "Print the extended public key of an account", version)]
pub(crate) struct AccountArgs {
    #[arg(
        long,
        default_value = "bip84",
        help = "the key scope, e.g. bip44, bip49, bip84, bip86 or <purpose>/<coin>"
    )]
    pub(crate) scope: KeyScope,

    #[arg(long, default_value_t = 0, help = "the account number")]
    pub(crate) account: u32,
}
