//! Core types and contracts for the Vellum versioned content store.
//!
//! This crate has no database dependencies. Storage backends (e.g.
//! `vellum-store-sqlite`) implement the collaborator traits in [`gateway`];
//! the [`handler::ContentHandler`] composes them into the content lifecycle.

pub mod content;
pub mod error;
pub mod event;
pub mod gateway;
pub mod handler;
pub mod location;
pub mod mapper;
pub mod relation;

pub use error::{Error, Result};
pub use handler::ContentHandler;

/// Identifier of a content item.
pub type ContentId = i64;
/// Identifier of a single version row.
pub type VersionId = i64;
/// Per-content version number, starting at 1.
pub type VersionNo = i64;
/// Identifier of a persisted field row.
pub type FieldId = i64;
/// Identifier of a materialised location (tree node).
pub type LocationId = i64;
/// Identifier of a relation edge.
pub type RelationId = i64;
/// Identifier of a user (owner, creator).
pub type UserId = i64;
