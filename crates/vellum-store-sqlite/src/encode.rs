//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Enumerations are stored as
//! their snake_case names. Field payloads and language lists are stored as
//! compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use vellum_core::{
  content::VersionStatus,
  gateway::{ContentInfoRow, FieldRow, NameRow, VersionInfoRow},
  location::{AssignmentOp, Location, NodeAssignment, Placement},
  relation::{Relation, RelationType},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

fn decode_enum<T: FromStr>(what: &str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown {what}: {s:?}")))
}

pub fn decode_status(s: &str) -> Result<VersionStatus> { decode_enum("version status", s) }

pub fn decode_op(s: &str) -> Result<AssignmentOp> { decode_enum("assignment op", s) }

pub fn decode_relation_type(s: &str) -> Result<RelationType> {
  decode_enum("relation type", s)
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_languages(languages: &[String]) -> Result<String> {
  Ok(serde_json::to_string(languages)?)
}

pub fn decode_languages(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

pub fn encode_json(value: &serde_json::Value) -> String { value.to_string() }

pub fn decode_json(s: &str) -> Result<serde_json::Value> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by [`crate::gateway::CONTENT_INFO_SELECT`].
pub struct RawContentInfo {
  pub id:                 i64,
  pub content_type_id:    i64,
  pub section_id:         i64,
  pub owner_id:           i64,
  pub current_version_no: i64,
  pub name:               String,
  pub always_available:   bool,
  pub remote_id:          String,
  pub main_language_code: String,
  pub main_location_id:   Option<i64>,
  pub modification_date:  String,
  pub publication_date:   Option<String>,
  pub has_published:      bool,
  pub has_archived:       bool,
}

impl RawContentInfo {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      content_type_id:    row.get(1)?,
      section_id:         row.get(2)?,
      owner_id:           row.get(3)?,
      current_version_no: row.get(4)?,
      name:               row.get(5)?,
      always_available:   row.get(6)?,
      remote_id:          row.get(7)?,
      main_language_code: row.get(8)?,
      main_location_id:   row.get(9)?,
      modification_date:  row.get(10)?,
      publication_date:   row.get(11)?,
      has_published:      row.get(12)?,
      has_archived:       row.get(13)?,
    })
  }

  pub fn into_row(self) -> Result<ContentInfoRow> {
    Ok(ContentInfoRow {
      id:                 self.id,
      content_type_id:    self.content_type_id,
      section_id:         self.section_id,
      owner_id:           self.owner_id,
      current_version_no: self.current_version_no,
      name:               self.name,
      always_available:   self.always_available,
      remote_id:          self.remote_id,
      main_language_code: self.main_language_code,
      main_location_id:   self.main_location_id,
      modification_date:  decode_dt(&self.modification_date)?,
      publication_date:   self.publication_date.as_deref().map(decode_dt).transpose()?,
      has_published:      self.has_published,
      has_archived:       self.has_archived,
    })
  }
}

/// Columns selected by [`crate::gateway::VERSION_SELECT`].
pub struct RawVersionInfo {
  pub id:                    i64,
  pub content_id:            i64,
  pub version_no:            i64,
  pub status:                String,
  pub creator_id:            i64,
  pub creation_date:         String,
  pub modification_date:     String,
  pub initial_language_code: String,
  pub language_codes:        String,
}

impl RawVersionInfo {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                    row.get(0)?,
      content_id:            row.get(1)?,
      version_no:            row.get(2)?,
      status:                row.get(3)?,
      creator_id:            row.get(4)?,
      creation_date:         row.get(5)?,
      modification_date:     row.get(6)?,
      initial_language_code: row.get(7)?,
      language_codes:        row.get(8)?,
    })
  }

  /// Decode, attaching the version's name rows.
  pub fn into_row(self, names: Vec<NameRow>) -> Result<VersionInfoRow> {
    Ok(VersionInfoRow {
      id: self.id,
      content_id: self.content_id,
      version_no: self.version_no,
      status: decode_status(&self.status)?,
      creator_id: self.creator_id,
      creation_date: decode_dt(&self.creation_date)?,
      modification_date: decode_dt(&self.modification_date)?,
      initial_language_code: self.initial_language_code,
      language_codes: decode_languages(&self.language_codes)?,
      names,
    })
  }
}

/// Columns selected by [`crate::gateway::FIELD_SELECT`].
pub struct RawField {
  pub id:                  i64,
  pub field_definition_id: i64,
  pub field_type:          String,
  pub language_code:       String,
  pub version_no:          i64,
  pub data_json:           String,
  pub sort_key:            Option<String>,
}

impl RawField {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(0)?,
      field_definition_id: row.get(1)?,
      field_type:          row.get(2)?,
      language_code:       row.get(3)?,
      version_no:          row.get(4)?,
      data_json:           row.get(5)?,
      sort_key:            row.get(6)?,
    })
  }

  pub fn into_row(self) -> Result<FieldRow> {
    Ok(FieldRow {
      id:                  self.id,
      field_definition_id: self.field_definition_id,
      field_type:          self.field_type,
      language_code:       self.language_code,
      version_no:          self.version_no,
      data:                decode_json(&self.data_json)?,
      sort_key:            self.sort_key,
    })
  }
}

/// Columns selected by [`crate::gateway::ASSIGNMENT_SELECT`].
pub struct RawNodeAssignment {
  pub id:                 i64,
  pub content_id:         i64,
  pub version_no:         i64,
  pub parent_location_id: i64,
  pub op_code:            String,
  pub location_id:        Option<i64>,
  pub priority:           i32,
  pub hidden:             bool,
  pub remote_id:          Option<String>,
}

impl RawNodeAssignment {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                 row.get(0)?,
      content_id:         row.get(1)?,
      version_no:         row.get(2)?,
      parent_location_id: row.get(3)?,
      op_code:            row.get(4)?,
      location_id:        row.get(5)?,
      priority:           row.get(6)?,
      hidden:             row.get(7)?,
      remote_id:          row.get(8)?,
    })
  }

  pub fn into_assignment(self) -> Result<NodeAssignment> {
    let placement = match self.location_id {
      Some(location_id) => Placement::Materialized(location_id),
      None => Placement::Pending(decode_op(&self.op_code)?),
    };
    Ok(NodeAssignment {
      id: self.id,
      content_id: self.content_id,
      version_no: self.version_no,
      parent_location_id: self.parent_location_id,
      priority: self.priority,
      hidden: self.hidden,
      remote_id: self.remote_id,
      placement,
    })
  }
}

/// Columns selected by [`crate::gateway::LOCATION_SELECT`]. Every column is
/// natively typed, so this maps straight to [`Location`].
pub fn location_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Location> {
  Ok(Location {
    id:               row.get(0)?,
    parent_id:        row.get(1)?,
    content_id:       row.get(2)?,
    path_string:      row.get(3)?,
    depth:            row.get(4)?,
    priority:         row.get(5)?,
    hidden:           row.get(6)?,
    invisible:        row.get(7)?,
    remote_id:        row.get(8)?,
    main_location_id: row.get(9)?,
  })
}

/// Columns selected by [`crate::gateway::RELATION_SELECT`].
pub struct RawRelation {
  pub id:                         i64,
  pub source_content_id:          i64,
  pub source_version_no:          i64,
  pub source_field_definition_id: Option<i64>,
  pub destination_content_id:     i64,
  pub relation_type:              String,
}

impl RawRelation {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                         row.get(0)?,
      source_content_id:          row.get(1)?,
      source_version_no:          row.get(2)?,
      source_field_definition_id: row.get(3)?,
      destination_content_id:     row.get(4)?,
      relation_type:              row.get(5)?,
    })
  }

  pub fn into_relation(self) -> Result<Relation> {
    Ok(Relation {
      id:                         self.id,
      source_content_id:          self.source_content_id,
      source_version_no:          self.source_version_no,
      source_field_definition_id: self.source_field_definition_id,
      destination_content_id:     self.destination_content_id,
      relation_type:              decode_relation_type(&self.relation_type)?,
    })
  }
}
