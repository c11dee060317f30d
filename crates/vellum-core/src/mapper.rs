//! Pure transformations between gateway rows, input structs and entities.
//!
//! Nothing here performs I/O; every function is deterministic in its inputs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
  ContentId, UserId, VersionNo,
  content::{
    Content, ContentInfo, ContentStatus, CreateStruct, Field, FieldValue,
    VersionInfo, VersionStatus, field_languages,
  },
  gateway::{ContentInfoRow, ContentRow, FieldRow, NameRow, VersionInfoRow},
};

// ─── Structs → entities ──────────────────────────────────────────────────────

/// Identity metadata for a content about to be created from `create`.
pub fn create_content_info(
  create: &CreateStruct,
  id: ContentId,
  remote_id: String,
  version_no: VersionNo,
) -> ContentInfo {
  ContentInfo {
    id,
    content_type_id: create.content_type_id,
    section_id: create.section_id,
    owner_id: create.owner_id,
    current_version_no: version_no,
    name: create
      .names
      .get(&create.initial_language_code)
      .cloned()
      .unwrap_or_default(),
    always_available: create.always_available,
    remote_id,
    main_language_code: create.initial_language_code.clone(),
    main_location_id: None,
    modification_date: create.modified,
    publication_date: None,
    status: ContentStatus::Draft,
  }
}

/// A new draft version of `info` numbered `version_no`. The row id is left at
/// `0` for the gateway to assign.
pub fn create_version_info_for_content(
  info: &ContentInfo,
  version_no: VersionNo,
  creator_id: UserId,
  fields: &[Field],
  initial_language_code: &str,
  names: BTreeMap<String, String>,
  date: DateTime<Utc>,
) -> VersionInfo {
  VersionInfo {
    id: 0,
    content_id: info.id,
    version_no,
    status: VersionStatus::Draft,
    creator_id,
    creation_date: date,
    modification_date: date,
    initial_language_code: initial_language_code.to_owned(),
    language_codes: field_languages(fields),
    names,
  }
}

/// A create struct reproducing `content` as a brand new item.
///
/// Fields lose their identity; locations and the remote id are not carried
/// over.
pub fn create_create_struct_from_content(
  content: &Content,
  modified: DateTime<Utc>,
) -> CreateStruct {
  let version_no = content.version_info.version_no;
  CreateStruct {
    names: content.version_info.names.clone(),
    content_type_id: content.info.content_type_id,
    section_id: content.info.section_id,
    owner_id: content.info.owner_id,
    locations: Vec::new(),
    always_available: content.info.always_available,
    remote_id: None,
    initial_language_code: content.version_info.initial_language_code.clone(),
    modified,
    fields: content
      .fields
      .iter()
      .map(|field| field.detached(version_no))
      .collect(),
  }
}

// ─── Rows → entities ─────────────────────────────────────────────────────────

pub fn extract_content_info_from_row(row: ContentInfoRow) -> ContentInfo {
  ContentInfo {
    id:                 row.id,
    content_type_id:    row.content_type_id,
    section_id:         row.section_id,
    owner_id:           row.owner_id,
    current_version_no: row.current_version_no,
    name:               row.name,
    always_available:   row.always_available,
    remote_id:          row.remote_id,
    main_language_code: row.main_language_code,
    main_location_id:   row.main_location_id,
    modification_date:  row.modification_date,
    publication_date:   row.publication_date,
    status:             ContentStatus::derive(row.has_published, row.has_archived),
  }
}

pub fn extract_version_info_from_row(row: VersionInfoRow) -> VersionInfo {
  VersionInfo {
    id:                    row.id,
    content_id:            row.content_id,
    version_no:            row.version_no,
    status:                row.status,
    creator_id:            row.creator_id,
    creation_date:         row.creation_date,
    modification_date:     row.modification_date,
    initial_language_code: row.initial_language_code,
    language_codes:        row.language_codes,
    names:                 extract_names(row.names),
  }
}

pub fn extract_version_info_list_from_rows(
  rows: Vec<VersionInfoRow>,
) -> Vec<VersionInfo> {
  rows.into_iter().map(extract_version_info_from_row).collect()
}

pub fn extract_field_from_row(row: FieldRow) -> Field {
  Field {
    id:                  Some(row.id),
    field_definition_id: row.field_definition_id,
    field_type:          row.field_type,
    value:               FieldValue {
      data:          row.data,
      external_data: None,
      sort_key:      row.sort_key,
    },
    language_code:       row.language_code,
    version_no:          row.version_no,
  }
}

fn extract_names(rows: Vec<NameRow>) -> BTreeMap<String, String> {
  rows
    .into_iter()
    .map(|row| (row.language_code, row.name))
    .collect()
}

/// Fold load rows into one [`Content`] per (content, version) pair, in the
/// order the pairs first appear. A field appearing in several rows is kept
/// once.
pub fn extract_content_from_rows(rows: Vec<ContentRow>) -> Vec<Content> {
  let mut contents: Vec<Content> = Vec::new();

  for row in rows {
    let key = (row.content.id, row.version.version_no);
    let index = match contents
      .iter()
      .position(|c| (c.info.id, c.version_info.version_no) == key)
    {
      Some(index) => index,
      None => {
        contents.push(Content {
          info:         extract_content_info_from_row(row.content),
          version_info: extract_version_info_from_row(row.version),
          fields:       Vec::new(),
          assignments:  Vec::new(),
        });
        contents.len() - 1
      }
    };

    if let Some(field_row) = row.field {
      let content = &mut contents[index];
      if !content.fields.iter().any(|f| f.id == Some(field_row.id)) {
        content.fields.push(extract_field_from_row(field_row));
      }
    }
  }

  contents
}
