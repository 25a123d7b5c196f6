//! `star-notary` binary: serve the ledger over HTTP, or manage a local wallet key.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use star_notary::clock::SystemClock;
use star_notary::config::ServeConfig;
use star_notary::crypto::{
    address_of, generate_signing_key, load_key, save_key, sign_message, Ed25519Verifier,
};
use star_notary::storage::{JsonDirStore, MemoryStore, RecordStore};
use star_notary::AppState;

/// Star notary: register signed star ownership claims on a hash-linked ledger.
#[derive(Parser, Debug)]
#[command(name = "star-notary", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API.
    Serve(ServeConfig),
    /// Wallet key helpers for signing challenges.
    #[command(subcommand)]
    Wallet(WalletCommand),
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    /// Generate a new key and print its address.
    New {
        #[arg(long)]
        key: PathBuf,
        /// Replace an existing key file.
        #[arg(long)]
        force: bool,
    },
    /// Print the address of a saved key.
    Address {
        #[arg(long)]
        key: PathBuf,
    },
    /// Sign a challenge message and print the hex signature.
    Sign {
        #[arg(long)]
        key: PathBuf,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Serve(config) => serve(config).await,
        Commands::Wallet(cmd) => wallet(cmd),
    }
}

async fn serve(config: ServeConfig) -> anyhow::Result<()> {
    let store: Arc<dyn RecordStore> = match &config.data_dir {
        Some(dir) => {
            info!(dir = %dir.display(), "persisting records to disk");
            Arc::new(JsonDirStore::open(dir).context("open data dir")?)
        }
        None => {
            info!("no data dir configured; ledger is volatile");
            Arc::new(MemoryStore::default())
        }
    };

    let state = AppState::load(
        store,
        Arc::new(SystemClock),
        Arc::new(Ed25519Verifier),
        config.validation_window_secs,
    )
    .context("load ledger")?;

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    info!(addr = %config.bind, "listening");
    axum::serve(listener, star_notary::app(state)).await?;
    Ok(())
}

fn wallet(cmd: WalletCommand) -> anyhow::Result<()> {
    match cmd {
        WalletCommand::New { key, force } => {
            if key.exists() && !force {
                bail!("{} already exists (use --force to replace)", key.display());
            }
            let signing = generate_signing_key();
            save_key(&key, &signing).context("save key")?;
            println!("{}", address_of(&signing));
        }
        WalletCommand::Address { key } => {
            let signing = read_key(&key)?;
            println!("{}", address_of(&signing));
        }
        WalletCommand::Sign { key, message } => {
            let signing = read_key(&key)?;
            println!("{}", sign_message(&signing, &message));
        }
    }
    Ok(())
}

fn read_key(path: &std::path::Path) -> anyhow::Result<ed25519_dalek::SigningKey> {
    load_key(path)
        .context("load key file")?
        .with_context(|| format!("no valid 32-byte key at {}", path.display()))
}
