//! `vellum` — command-line front end for the Vellum content store.
//!
//! # Usage
//!
//! ```
//! vellum create --file article.json
//! vellum publish 4 1
//! vellum --config /etc/vellum.toml versions 4
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use commands::Command;
use settings::AppConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use vellum_core::ContentHandler;
use vellum_store_sqlite::SqliteStore;

#[derive(Parser)]
#[command(author, version, about = "Versioned content store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "vellum.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = AppConfig::load(&cli.config)?;

  let store = SqliteStore::open_with(&config.store)
    .await
    .with_context(|| format!("failed to open store at {}", config.store.path.display()))?;
  let handler = ContentHandler::with_config(store, &config.events);

  let output = cli.command.run(&handler).await?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
