//! SQLite backend for the Vellum content store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every handler transaction executes as
//! a single SQLite transaction on that thread.

mod encode;
mod gateway;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteStore, StoreConfig};

#[cfg(test)]
mod tests;
