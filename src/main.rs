mod app;
mod commands;
mod config;
mod error;
mod event;
mod listing;
mod model;
mod overlay;
mod query;
mod remote;
mod sync;
mod telemetry;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing::info;

use crate::overlay::{Reconciler, SqliteStore};
use crate::remote::RemoteClient;
use crate::sync::SyncedClient;

#[derive(Parser, Debug)]
#[command(name = "usertab")]
#[command(about = "A terminal user table over a REST collection, with local-first overrides")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./usertab.yaml, then $XDG_CONFIG_HOME/usertab/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Collection URL, overrides resource.url and USERTAB_URL
  #[arg(short, long)]
  url: Option<String>,

  /// Rows per page
  #[arg(short, long)]
  page_size: Option<usize>,

  /// Keep local changes in memory only; nothing is written to disk
  #[arg(long)]
  ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over file and environment
  if let Some(url) = args.url {
    config.resource.url = url;
  }
  if let Some(page_size) = args.page_size {
    config.page_size = page_size;
  }
  config.validate()?;

  let _log_guard = telemetry::init(&config.logging)?;

  let store = if args.ephemeral {
    SqliteStore::in_memory()
  } else {
    let path = config.storage.database_path()?;
    info!(path = %path.display(), "Opening overlay store");
    SqliteStore::open(&path)
  }
  .map_err(|e| eyre!("Failed to open overlay store: {}", e))?;

  let slot = config.storage.slot_for(&config.resource.url)?;
  let remote = RemoteClient::new(&config.resource)?;
  let client = SyncedClient::new(
    remote,
    Reconciler::new(store, slot),
    config.resource.fields.clone(),
  );

  // Initialize and run the app
  let mut app = app::App::new(config, client);
  app.run().await?;

  Ok(())
}
