//! CLI for creating a wallet's master keys and deriving its scoped keys.

mod cli;
mod config;
mod handlers;

use anyhow::{Context, Error, Result};
use clap::Parser;
use keymaker_common::logging::{self, LoggerConfig};

use crate::{cli::Commands, config::Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init(LoggerConfig::with_base_name("keymaker-cli"));

    let cli = cli::Cli::parse();
    let config = Config::load(&cli.config).await?;

    let db = sled::open(&config.db)
        .with_context(|| format!("failed to open database at {}", config.db.display()))?;

    let xpub = match cli.command {
        Commands::Init => handlers::init(&db, &config).await?,
        Commands::CoinType(args) => handlers::coin_type(&db, &config, args.scope).await?,
        Commands::Account(args) => {
            handlers::account(&db, &config, args.scope, args.account).await?
        }
    };

    println!("{xpub}");
    Ok(())
}
