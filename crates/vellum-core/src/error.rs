//! Error types for `vellum-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The requested row set is empty. Callers treat this as "does not
  /// exist", never as a transient failure.
  #[error("{kind} not found: {id}")]
  NotFound { kind: &'static str, id: String },

  /// A required attribute of an input struct is missing or inconsistent.
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The entity exists but is in a state that forbids the operation.
  #[error("bad state: {0}")]
  BadState(String),

  #[error("not implemented: {0}")]
  NotImplemented(&'static str),

  /// Any I/O or transaction failure raised by a backend.
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
    Self::NotFound { kind, id: id.to_string() }
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound { .. }) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
