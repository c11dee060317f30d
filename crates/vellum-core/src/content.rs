//! Content, version and field types.
//!
//! A content item owns an ordered history of versions. Each version owns its
//! own field rows and per-language names; nothing is shared between versions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ContentId, FieldId, LocationId, UserId, VersionId, VersionNo,
  location::{LocationCreateStruct, NodeAssignment},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a single version.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VersionStatus {
  Draft,
  Published,
  Archived,
}

/// Aggregate status of a content item, derived from its versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
  /// No version has ever been published.
  Draft,
  /// Exactly one version is published.
  Published,
  /// Versions exist but none is currently published.
  Archived,
}

impl ContentStatus {
  pub fn derive(has_published: bool, has_archived: bool) -> Self {
    match (has_published, has_archived) {
      (true, _) => Self::Published,
      (false, true) => Self::Archived,
      (false, false) => Self::Draft,
    }
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Identity and aggregate metadata of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentInfo {
  pub id:                 ContentId,
  pub content_type_id:    i64,
  pub section_id:         i64,
  pub owner_id:           UserId,
  pub current_version_no: VersionNo,
  /// Name of the content in its main language.
  pub name:               String,
  pub always_available:   bool,
  pub remote_id:          String,
  pub main_language_code: String,
  pub main_location_id:   Option<LocationId>,
  pub modification_date:  DateTime<Utc>,
  pub publication_date:   Option<DateTime<Utc>>,
  pub status:             ContentStatus,
}

/// One numbered snapshot of a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
  /// Row identity; `0` until the version has been inserted.
  pub id:                    VersionId,
  pub content_id:            ContentId,
  pub version_no:            VersionNo,
  pub status:                VersionStatus,
  pub creator_id:            UserId,
  pub creation_date:         DateTime<Utc>,
  pub modification_date:     DateTime<Utc>,
  pub initial_language_code: String,
  /// Languages present in this version's fields.
  pub language_codes:        Vec<String>,
  /// Display name per language code.
  pub names:                 BTreeMap<String, String>,
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// The typed payload of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
  /// Payload stored in the field row itself.
  #[serde(default)]
  pub data:          serde_json::Value,
  /// Payload stored out of row by the field store.
  #[serde(default)]
  pub external_data: Option<serde_json::Value>,
  #[serde(default)]
  pub sort_key:      Option<String>,
}

/// A field value of one version in one language.
///
/// A field carries only scalar keys to its owner: the version number here and
/// the content id of the [`Content`] holding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
  /// Row identity; `None` until persisted.
  #[serde(default)]
  pub id:                  Option<FieldId>,
  pub field_definition_id: i64,
  pub field_type:          String,
  pub value:               FieldValue,
  pub language_code:       String,
  #[serde(default)]
  pub version_no:          VersionNo,
}

impl Field {
  /// Clone this field for another version: the row identity is dropped and
  /// the version number replaced.
  pub fn detached(&self, version_no: VersionNo) -> Self {
    Self { id: None, version_no, ..self.clone() }
  }
}

/// Distinct language codes of `fields`, in first-seen order.
pub fn field_languages(fields: &[Field]) -> Vec<String> {
  let mut languages: Vec<String> = Vec::new();
  for field in fields {
    if !languages.contains(&field.language_code) {
      languages.push(field.language_code.clone());
    }
  }
  languages
}

// ─── Aggregate ───────────────────────────────────────────────────────────────

/// A content item hydrated in one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
  pub info:         ContentInfo,
  pub version_info: VersionInfo,
  pub fields:       Vec<Field>,
  /// Placement assignments recorded for this version.
  pub assignments:  Vec<NodeAssignment>,
}

// ─── Input structs ───────────────────────────────────────────────────────────

/// Input to [`crate::ContentHandler::create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStruct {
  /// Display name per language code; must contain `initial_language_code`.
  pub names:                 BTreeMap<String, String>,
  pub content_type_id:       i64,
  #[serde(default = "default_section")]
  pub section_id:            i64,
  pub owner_id:              UserId,
  #[serde(default)]
  pub locations:             Vec<LocationCreateStruct>,
  #[serde(default)]
  pub always_available:      bool,
  /// Generated by the handler when absent.
  #[serde(default)]
  pub remote_id:             Option<String>,
  /// Also used as the main language of the new content.
  pub initial_language_code: String,
  #[serde(default = "Utc::now")]
  pub modified:              DateTime<Utc>,
  #[serde(default)]
  pub fields:                Vec<Field>,
}

fn default_section() -> i64 { 1 }

/// Input to [`crate::ContentHandler::update_content`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStruct {
  #[serde(default)]
  pub names:                 BTreeMap<String, String>,
  pub creator_id:            Option<UserId>,
  #[serde(default)]
  pub fields:                Vec<Field>,
  pub modification_date:     Option<DateTime<Utc>>,
  pub initial_language_code: Option<String>,
}

/// Input to [`crate::ContentHandler::update_metadata`] and
/// [`crate::ContentHandler::publish`]. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataUpdateStruct {
  pub owner_id:           Option<UserId>,
  pub name:               Option<String>,
  pub publication_date:   Option<DateTime<Utc>>,
  pub modification_date:  Option<DateTime<Utc>>,
  pub main_language_code: Option<String>,
  pub always_available:   Option<bool>,
  pub remote_id:          Option<String>,
}
