//! Error type for `vellum-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] vellum_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A column held a value outside its encoding.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core errors raised inside the backend pass through unchanged; everything
/// else is a storage failure.
impl From<Error> for vellum_core::Error {
  fn from(err: Error) -> Self {
    match err {
      Error::Core(core) => core,
      other => vellum_core::Error::Storage(Box::new(other)),
    }
  }
}
