//! Profstore CLI - manage connection profiles from the command line
//!
//! Provides `profstore list`, `profstore create`, `profstore active`, and
//! the other profile commands.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use profstore_core::storage::{AesGcmCipher, SqliteBackend};
use profstore_core::{ProfileStore, StoreError};
use tracing_subscriber::EnvFilter;

use commands::ProfileCommands;

const DATA_DIR_ENV: &str = "PROFSTORE_DATA_DIR";
const KEY_ENV: &str = "PROFSTORE_KEY";
const LOG_ENV: &str = "PROFSTORE_LOG";
const DB_FILE: &str = "profiles.db";

#[derive(Parser)]
#[command(name = "profstore")]
#[command(about = "Profstore - connection profile manager")]
#[command(version)]
struct Cli {
    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: ProfileCommands,
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        match e.downcast_ref::<StoreError>() {
            Some(store_err) => {
                tracing::debug!(code = store_err.code(), error = %store_err, "Command failed");
                eprintln!("Error: {}", store_err.user_message());
            }
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let store = open_store()?;
    commands::execute(&store, cli.command, cli.json)
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn data_dir() -> anyhow::Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Cannot find a home directory; set PROFSTORE_DATA_DIR")?;
    Ok(home.join(".profstore"))
}

fn open_store() -> anyhow::Result<ProfileStore> {
    let dir = data_dir()?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory {}", dir.display()))?;

    let db_path = dir.join(DB_FILE);
    tracing::debug!(path = %db_path.display(), "Opening profile database");
    let backend = SqliteBackend::open(&db_path)
        .with_context(|| format!("Failed to open {}", db_path.display()))?;
    let store = ProfileStore::new(Arc::new(backend));

    match std::env::var(KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            let cipher = AesGcmCipher::from_hex_key(key.trim())
                .with_context(|| format!("{KEY_ENV} must be 64 hex characters"))?;
            Ok(store.with_cipher(Arc::new(cipher)))
        }
        _ => Ok(store),
    }
}
