//! [`SqliteStore`] — the SQLite implementation of [`Repository`].

use std::{
  future::Future,
  path::{Path, PathBuf},
  time::Duration,
};

use rusqlite::TransactionBehavior;
use serde::Deserialize;
use vellum_core::gateway::{Repository, Storage};

use crate::{Error, Result, gateway::SqliteGateway, schema::SCHEMA};

// ─── Config ──────────────────────────────────────────────────────────────────

/// Where and how to open the database.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
  #[serde(default = "default_path")]
  pub path:            PathBuf,
  /// How long a writer waits for a competing write transaction.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_path() -> PathBuf { PathBuf::from("vellum.db") }

fn default_busy_timeout_ms() -> u64 { 5_000 }

impl Default for StoreConfig {
  fn default() -> Self {
    Self {
      path:            default_path(),
      busy_timeout_ms: default_busy_timeout_ms(),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A content repository backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default settings.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(&StoreConfig {
      path: path.as_ref().to_path_buf(),
      ..StoreConfig::default()
    })
    .await
  }

  pub async fn open_with(config: &StoreConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(&config.path).await?;
    let store = Self { conn };
    store.init_schema(config.busy_timeout_ms).await?;
    tracing::debug!(path = %config.path.display(), "opened sqlite store");
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema(default_busy_timeout_ms()).await?;
    Ok(store)
  }

  async fn init_schema(&self, busy_timeout_ms: u64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` in a transaction opened with `behavior`, committing on success
  /// when `commit` is set.
  async fn run<T, F>(
    &self,
    behavior: TransactionBehavior,
    commit: bool,
    f: F,
  ) -> vellum_core::Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> vellum_core::Result<T> + Send + 'static,
  {
    let out = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(behavior)?;
        let gateway = SqliteGateway::new(&tx);
        let out = f(&gateway as &dyn Storage);
        // Dropping an uncommitted transaction rolls it back.
        if commit && out.is_ok() {
          tx.commit()?;
        }
        Ok(out)
      })
      .await
      .map_err(Error::from)?;

    if let Err(err) = &out {
      tracing::debug!(error = %err, "transaction rolled back");
    }
    out
  }
}

impl Repository for SqliteStore {
  fn transaction<T, F>(&self, f: F) -> impl Future<Output = vellum_core::Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> vellum_core::Result<T> + Send + 'static,
  {
    self.run(TransactionBehavior::Immediate, true, f)
  }

  fn read<T, F>(&self, f: F) -> impl Future<Output = vellum_core::Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> vellum_core::Result<T> + Send + 'static,
  {
    self.run(TransactionBehavior::Deferred, false, f)
  }
}
