//! Layered configuration: optional TOML file, then `VELLUM_*` environment.

use std::path::Path;

use anyhow::Context as _;
use serde::Deserialize;
use vellum_core::event::EventConfig;
use vellum_store_sqlite::StoreConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  #[serde(default)]
  pub store:  StoreConfig,
  #[serde(default)]
  pub events: EventConfig,
}

impl AppConfig {
  /// Read `path` if it exists and overlay the environment, e.g.
  /// `VELLUM_STORE__PATH=/var/lib/vellum.db`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("VELLUM")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }
}
