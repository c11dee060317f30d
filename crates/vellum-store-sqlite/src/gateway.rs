//! [`SqliteGateway`] — every collaborator contract over one open SQLite
//! transaction.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension as _};
use uuid::Uuid;
use vellum_core::{
  ContentId, LocationId, RelationId, VersionId, VersionNo,
  content::{
    Content, CreateStruct, Field, MetadataUpdateStruct, UpdateStruct,
    VersionInfo, VersionStatus, field_languages,
  },
  gateway::{
    ContentGateway, ContentInfoRow, ContentRow, FieldStore, LocationGateway,
    LocationHandler, NameRow, VersionInfoRow,
  },
  location::{
    AssignmentOp, Location, LocationCreateStruct, NodeAssignment,
    ROOT_LOCATION_ID, SubtreeRemoval,
  },
  relation::{Relation, RelationCreateStruct, RelationType},
};

use crate::{
  Error, Result,
  encode::{
    RawContentInfo, RawField, RawNodeAssignment, RawRelation, RawVersionInfo,
    decode_json, encode_dt, encode_json, encode_languages, location_from_row,
  },
};

type CoreResult<T> = vellum_core::Result<T>;

// ─── Column lists ────────────────────────────────────────────────────────────

pub const CONTENT_INFO_SELECT: &str = "
  SELECT c.id, c.content_type_id, c.section_id, c.owner_id,
         c.current_version_no, c.name, c.always_available, c.remote_id,
         c.main_language_code, c.main_location_id, c.modification_date,
         c.publication_date,
         EXISTS (SELECT 1 FROM content_versions v
                 WHERE v.content_id = c.id AND v.status = 'published'),
         EXISTS (SELECT 1 FROM content_versions v
                 WHERE v.content_id = c.id AND v.status = 'archived')
  FROM content c";

pub const VERSION_SELECT: &str = "
  SELECT v.id, v.content_id, v.version_no, v.status, v.creator_id,
         v.creation_date, v.modification_date, v.initial_language_code,
         v.language_codes
  FROM content_versions v";

pub const FIELD_SELECT: &str = "
  SELECT f.id, f.field_definition_id, f.field_type, f.language_code,
         f.version_no, f.data_json, f.sort_key
  FROM content_fields f";

pub const ASSIGNMENT_SELECT: &str = "
  SELECT id, content_id, version_no, parent_location_id, op_code,
         location_id, priority, hidden, remote_id
  FROM node_assignments";

pub const LOCATION_SELECT: &str = "
  SELECT id, parent_id, content_id, path_string, depth, priority, hidden,
         invisible, remote_id, main_location_id
  FROM locations";

pub const RELATION_SELECT: &str = "
  SELECT r.id, r.source_content_id, r.source_version_no,
         r.source_field_definition_id, r.destination_content_id,
         r.relation_type
  FROM content_relations r";

fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Error {
  Error::Core(vellum_core::Error::not_found(kind, id))
}

fn in_translations(language: &str, translations: Option<&[String]>) -> bool {
  translations.is_none_or(|t| t.iter().any(|l| l == language))
}

// ─── Queries ─────────────────────────────────────────────────────────────────

fn query_content_info(conn: &Connection, id: ContentId) -> Result<Option<ContentInfoRow>> {
  let raw = conn
    .query_row(
      &format!("{CONTENT_INFO_SELECT} WHERE c.id = ?1"),
      rusqlite::params![id],
      RawContentInfo::from_row,
    )
    .optional()?;
  raw.map(RawContentInfo::into_row).transpose()
}

fn query_names(
  conn: &Connection,
  content_id: ContentId,
  version_no: VersionNo,
  translations: Option<&[String]>,
) -> Result<Vec<NameRow>> {
  let mut stmt = conn.prepare(
    "SELECT language_code, name FROM content_names
     WHERE content_id = ?1 AND version_no = ?2
     ORDER BY language_code",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![content_id, version_no], |row| {
      Ok(NameRow {
        language_code: row.get(0)?,
        name:          row.get(1)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(
    rows
      .into_iter()
      .filter(|row| in_translations(&row.language_code, translations))
      .collect(),
  )
}

fn query_versions(
  conn: &Connection,
  filter: &str,
  params: impl rusqlite::Params,
) -> Result<Vec<VersionInfoRow>> {
  let raws = {
    let mut stmt = conn.prepare(&format!("{VERSION_SELECT} {filter}"))?;
    stmt
      .query_map(params, RawVersionInfo::from_row)?
      .collect::<rusqlite::Result<Vec<_>>>()?
  };

  raws
    .into_iter()
    .map(|raw| {
      let names = query_names(conn, raw.content_id, raw.version_no, None)?;
      raw.into_row(names)
    })
    .collect()
}

fn query_location(conn: &Connection, id: LocationId) -> Result<Option<Location>> {
  Ok(
    conn
      .query_row(
        &format!("{LOCATION_SELECT} WHERE id = ?1"),
        rusqlite::params![id],
        location_from_row,
      )
      .optional()?,
  )
}

fn insert_field(
  conn: &Connection,
  content_id: ContentId,
  version_no: VersionNo,
  field: &Field,
) -> Result<i64> {
  conn.execute(
    "INSERT INTO content_fields (
       content_id, version_no, field_definition_id, field_type,
       language_code, data_json, sort_key
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      content_id,
      version_no,
      field.field_definition_id,
      field.field_type,
      field.language_code,
      encode_json(&field.value.data),
      field.value.sort_key,
    ],
  )?;
  let id = conn.last_insert_rowid();
  write_external_data(conn, id, field.value.external_data.as_ref())?;
  Ok(id)
}

/// Replace the out-of-row payload of a field.
fn write_external_data(
  conn: &Connection,
  field_id: i64,
  payload: Option<&serde_json::Value>,
) -> Result<()> {
  conn.execute(
    "DELETE FROM external_field_data WHERE field_id = ?1",
    rusqlite::params![field_id],
  )?;
  if let Some(payload) = payload {
    conn.execute(
      "INSERT INTO external_field_data (field_id, payload_json) VALUES (?1, ?2)",
      rusqlite::params![field_id, encode_json(payload)],
    )?;
  }
  Ok(())
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// Collaborator implementations bound to one open transaction.
pub struct SqliteGateway<'c> {
  conn: &'c Connection,
}

impl<'c> SqliteGateway<'c> {
  pub fn new(conn: &'c Connection) -> Self { Self { conn } }

  /// Run `f` on the transaction and surface its error as a core error.
  fn with<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> CoreResult<T> {
    f(self.conn).map_err(Into::into)
  }
}

impl ContentGateway for SqliteGateway<'_> {
  fn insert_content_object(
    &self,
    create: &CreateStruct,
    remote_id: &str,
    version_no: VersionNo,
  ) -> CoreResult<ContentId> {
    let name = create
      .names
      .get(&create.initial_language_code)
      .cloned()
      .unwrap_or_default();

    self.with(|conn| {
      conn.execute(
        "INSERT INTO content (
           content_type_id, section_id, owner_id, current_version_no,
           name, always_available, remote_id, main_language_code,
           modification_date
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
          create.content_type_id,
          create.section_id,
          create.owner_id,
          version_no,
          name,
          create.always_available,
          remote_id,
          create.initial_language_code,
          encode_dt(create.modified),
        ],
      )?;
      Ok(conn.last_insert_rowid())
    })
  }

  fn insert_version(
    &self,
    version: &VersionInfo,
    fields: &[Field],
    always_available: bool,
  ) -> CoreResult<VersionId> {
    self.with(|conn| {
      conn.execute(
        "INSERT INTO content_versions (
           content_id, version_no, status, creator_id, creation_date,
           modification_date, initial_language_code, language_codes,
           always_available
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
          version.content_id,
          version.version_no,
          version.status.to_string(),
          version.creator_id,
          encode_dt(version.creation_date),
          encode_dt(version.modification_date),
          version.initial_language_code,
          encode_languages(&field_languages(fields))?,
          always_available,
        ],
      )?;
      let id = conn.last_insert_rowid();

      conn.execute(
        "UPDATE content SET last_version_no = MAX(last_version_no, ?2) WHERE id = ?1",
        rusqlite::params![version.content_id, version.version_no],
      )?;
      Ok(id)
    })
  }

  fn load(
    &self,
    id: ContentId,
    version_no: VersionNo,
    translations: Option<&[String]>,
  ) -> CoreResult<Vec<ContentRow>> {
    self.with(|conn| {
      let Some(content) = query_content_info(conn, id)? else {
        return Ok(Vec::new());
      };
      let Some(raw_version) = conn
        .query_row(
          &format!("{VERSION_SELECT} WHERE v.content_id = ?1 AND v.version_no = ?2"),
          rusqlite::params![id, version_no],
          RawVersionInfo::from_row,
        )
        .optional()?
      else {
        return Ok(Vec::new());
      };
      let version =
        raw_version.into_row(query_names(conn, id, version_no, translations)?)?;

      let raw_fields = {
        let mut stmt = conn.prepare(&format!(
          "{FIELD_SELECT} WHERE f.content_id = ?1 AND f.version_no = ?2 ORDER BY f.id"
        ))?;
        stmt
          .query_map(rusqlite::params![id, version_no], RawField::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?
      };
      let fields = raw_fields
        .into_iter()
        .filter(|raw| in_translations(&raw.language_code, translations))
        .map(RawField::into_row)
        .collect::<Result<Vec<_>>>()?;

      if fields.is_empty() {
        // A translation filter that matches nothing yields no rows at all.
        if translations.is_some() {
          return Ok(Vec::new());
        }
        return Ok(vec![ContentRow { content, version, field: None }]);
      }
      Ok(
        fields
          .into_iter()
          .map(|field| ContentRow {
            content: content.clone(),
            version: version.clone(),
            field:   Some(field),
          })
          .collect(),
      )
    })
  }

  fn load_content_info(&self, id: ContentId) -> CoreResult<ContentInfoRow> {
    self.with(|conn| query_content_info(conn, id)?.ok_or_else(|| not_found("content", id)))
  }

  fn load_version_info(
    &self,
    id: ContentId,
    version_no: VersionNo,
  ) -> CoreResult<VersionInfoRow> {
    self.with(|conn| {
      query_versions(
        conn,
        "WHERE v.content_id = ?1 AND v.version_no = ?2",
        rusqlite::params![id, version_no],
      )?
      .into_iter()
      .next()
      .ok_or_else(|| not_found("version", format!("contentId: {id}, versionNo: {version_no}")))
    })
  }

  fn list_versions(&self, id: ContentId) -> CoreResult<Vec<VersionInfoRow>> {
    self.with(|conn| {
      query_versions(
        conn,
        "WHERE v.content_id = ?1 ORDER BY v.version_no",
        rusqlite::params![id],
      )
    })
  }

  fn list_versions_for_user(
    &self,
    user_id: vellum_core::UserId,
    status: VersionStatus,
  ) -> CoreResult<Vec<VersionInfoRow>> {
    self.with(|conn| {
      query_versions(
        conn,
        "WHERE v.creator_id = ?1 AND v.status = ?2
         ORDER BY v.content_id, v.version_no",
        rusqlite::params![user_id, status.to_string()],
      )
    })
  }

  fn get_last_version_number(&self, id: ContentId) -> CoreResult<VersionNo> {
    self.with(|conn| {
      conn
        .query_row(
          "SELECT last_version_no FROM content WHERE id = ?1",
          rusqlite::params![id],
          |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| not_found("content", id))
    })
  }

  fn set_name(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    name: &str,
    language_code: &str,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "INSERT INTO content_names (content_id, version_no, language_code, name)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (content_id, version_no, language_code)
         DO UPDATE SET name = excluded.name",
        rusqlite::params![content_id, version_no, language_code, name],
      )?;
      Ok(())
    })
  }

  fn delete_names(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "DELETE FROM content_names
         WHERE content_id = ?1 AND (?2 IS NULL OR version_no = ?2)",
        rusqlite::params![content_id, version_no],
      )?;
      Ok(())
    })
  }

  fn update_content(
    &self,
    content_id: ContentId,
    update: &MetadataUpdateStruct,
  ) -> CoreResult<()> {
    self.with(|conn| {
      let changed = conn.execute(
        "UPDATE content SET
           owner_id           = COALESCE(?2, owner_id),
           name               = COALESCE(?3, name),
           publication_date   = COALESCE(?4, publication_date),
           modification_date  = COALESCE(?5, modification_date),
           main_language_code = COALESCE(?6, main_language_code),
           always_available   = COALESCE(?7, always_available),
           remote_id          = COALESCE(?8, remote_id)
         WHERE id = ?1",
        rusqlite::params![
          content_id,
          update.owner_id,
          update.name,
          update.publication_date.map(encode_dt),
          update.modification_date.map(encode_dt),
          update.main_language_code,
          update.always_available,
          update.remote_id,
        ],
      )?;
      if changed == 0 {
        return Err(not_found("content", content_id));
      }
      Ok(())
    })
  }

  fn update_version(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    update: &UpdateStruct,
  ) -> CoreResult<()> {
    self.with(|conn| {
      let languages = {
        let mut stmt = conn.prepare(
          "SELECT language_code FROM content_fields
           WHERE content_id = ?1 AND version_no = ?2 ORDER BY id",
        )?;
        let all = stmt
          .query_map(rusqlite::params![content_id, version_no], |row| {
            row.get::<_, String>(0)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        let mut distinct: Vec<String> = Vec::new();
        for language in all {
          if !distinct.contains(&language) {
            distinct.push(language);
          }
        }
        distinct
      };

      let changed = conn.execute(
        "UPDATE content_versions SET
           creator_id            = COALESCE(?3, creator_id),
           modification_date     = ?4,
           initial_language_code = COALESCE(?5, initial_language_code),
           language_codes        = ?6
         WHERE content_id = ?1 AND version_no = ?2",
        rusqlite::params![
          content_id,
          version_no,
          update.creator_id,
          encode_dt(update.modification_date.unwrap_or_else(Utc::now)),
          update.initial_language_code,
          encode_languages(&languages)?,
        ],
      )?;
      if changed == 0 {
        return Err(not_found(
          "version",
          format!("contentId: {content_id}, versionNo: {version_no}"),
        ));
      }
      Ok(())
    })
  }

  fn set_status(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    status: VersionStatus,
  ) -> CoreResult<bool> {
    self.with(|conn| {
      let changed = conn.execute(
        "UPDATE content_versions SET status = ?3, modification_date = ?4
         WHERE content_id = ?1 AND version_no = ?2",
        rusqlite::params![
          content_id,
          version_no,
          status.to_string(),
          encode_dt(Utc::now()),
        ],
      )?;

      if changed > 0 && status == VersionStatus::Published {
        conn.execute(
          "UPDATE content SET
             current_version_no = ?2,
             name = COALESCE(
               (SELECT n.name FROM content_names n
                WHERE n.content_id = ?1 AND n.version_no = ?2
                  AND n.language_code = content.main_language_code),
               name)
           WHERE id = ?1",
          rusqlite::params![content_id, version_no],
        )?;
      }
      Ok(changed > 0)
    })
  }

  fn archive_published_versions(
    &self,
    content_id: ContentId,
    except: VersionNo,
  ) -> CoreResult<Vec<VersionNo>> {
    self.with(|conn| {
      let published = {
        let mut stmt = conn.prepare(
          "SELECT version_no FROM content_versions
           WHERE content_id = ?1 AND status = 'published' AND version_no != ?2
           ORDER BY version_no",
        )?;
        stmt
          .query_map(rusqlite::params![content_id, except], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<VersionNo>>>()?
      };

      conn.execute(
        "UPDATE content_versions SET status = 'archived'
         WHERE content_id = ?1 AND status = 'published' AND version_no != ?2",
        rusqlite::params![content_id, except],
      )?;
      Ok(published)
    })
  }

  fn get_all_location_ids(&self, content_id: ContentId) -> CoreResult<Vec<LocationId>> {
    self.with(|conn| {
      let mut stmt =
        conn.prepare("SELECT id FROM locations WHERE content_id = ?1 ORDER BY id")?;
      Ok(
        stmt
          .query_map(rusqlite::params![content_id], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?,
      )
    })
  }

  fn delete_relations(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> CoreResult<()> {
    self.with(|conn| {
      match version_no {
        Some(version_no) => conn.execute(
          "DELETE FROM content_relations
           WHERE source_content_id = ?1 AND source_version_no = ?2",
          rusqlite::params![content_id, version_no],
        )?,
        None => conn.execute(
          "DELETE FROM content_relations
           WHERE source_content_id = ?1 OR destination_content_id = ?1",
          rusqlite::params![content_id],
        )?,
      };
      Ok(())
    })
  }

  fn delete_versions(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "DELETE FROM content_versions
         WHERE content_id = ?1 AND (?2 IS NULL OR version_no = ?2)",
        rusqlite::params![content_id, version_no],
      )?;
      Ok(())
    })
  }

  fn delete_content(&self, content_id: ContentId) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute("DELETE FROM content WHERE id = ?1", rusqlite::params![content_id])?;
      Ok(())
    })
  }

  // ── Relations ─────────────────────────────────────────────────────────────

  fn insert_relation(&self, relation: &RelationCreateStruct) -> CoreResult<RelationId> {
    self.with(|conn| {
      conn.execute(
        "INSERT INTO content_relations (
           source_content_id, source_version_no, source_field_definition_id,
           destination_content_id, relation_type
         ) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
          relation.source_content_id,
          relation.source_version_no,
          relation.source_field_definition_id,
          relation.destination_content_id,
          relation.relation_type.to_string(),
        ],
      )?;
      Ok(conn.last_insert_rowid())
    })
  }

  fn delete_relation(&self, relation_id: RelationId) -> CoreResult<bool> {
    self.with(|conn| {
      let changed = conn.execute(
        "DELETE FROM content_relations WHERE id = ?1",
        rusqlite::params![relation_id],
      )?;
      Ok(changed > 0)
    })
  }

  fn load_relations(
    &self,
    source_content_id: ContentId,
    source_version_no: Option<VersionNo>,
    relation_type: Option<RelationType>,
  ) -> CoreResult<Vec<Relation>> {
    self.with(|conn| {
      let mut stmt = conn.prepare(&format!(
        "{RELATION_SELECT}
         WHERE r.source_content_id = ?1
           AND (?2 IS NULL OR r.source_version_no = ?2)
           AND (?3 IS NULL OR r.relation_type = ?3)
         ORDER BY r.id"
      ))?;
      let raws = stmt
        .query_map(
          rusqlite::params![
            source_content_id,
            source_version_no,
            relation_type.map(|t| t.to_string()),
          ],
          RawRelation::from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawRelation::into_relation).collect()
    })
  }

  fn load_reverse_relations(
    &self,
    destination_content_id: ContentId,
    relation_type: Option<RelationType>,
  ) -> CoreResult<Vec<Relation>> {
    self.with(|conn| {
      let mut stmt = conn.prepare(&format!(
        "{RELATION_SELECT}
         JOIN content_versions v
           ON v.content_id = r.source_content_id
          AND v.version_no = r.source_version_no
         WHERE r.destination_content_id = ?1
           AND v.status = 'published'
           AND (?2 IS NULL OR r.relation_type = ?2)
         ORDER BY r.id"
      ))?;
      let raws = stmt
        .query_map(
          rusqlite::params![destination_content_id, relation_type.map(|t| t.to_string())],
          RawRelation::from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawRelation::into_relation).collect()
    })
  }
}

// ─── Locations ───────────────────────────────────────────────────────────────

impl LocationGateway for SqliteGateway<'_> {
  fn create_node_assignment(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    location: &LocationCreateStruct,
    op: AssignmentOp,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "INSERT INTO node_assignments (
           content_id, version_no, parent_location_id, op_code, priority,
           hidden, remote_id
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
          content_id,
          version_no,
          location.parent_id,
          op.to_string(),
          location.priority,
          location.hidden,
          location.remote_id,
        ],
      )?;
      Ok(())
    })
  }

  fn create_locations_from_node_assignments(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> CoreResult<Vec<Location>> {
    self.with(|conn| {
      let pending = {
        let mut stmt = conn.prepare(&format!(
          "{ASSIGNMENT_SELECT}
           WHERE content_id = ?1 AND version_no = ?2 AND location_id IS NULL
           ORDER BY id"
        ))?;
        stmt
          .query_map(rusqlite::params![content_id, version_no], RawNodeAssignment::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?
      };

      let mut created = Vec::new();
      for assignment in pending {
        let parent = query_location(conn, assignment.parent_location_id)?
          .ok_or_else(|| not_found("location", assignment.parent_location_id))?;

        let existing: Option<LocationId> = conn
          .query_row(
            "SELECT id FROM locations WHERE parent_id = ?1 AND content_id = ?2",
            rusqlite::params![parent.id, content_id],
            |row| row.get(0),
          )
          .optional()?;

        let location_id = match existing {
          Some(location_id) => location_id,
          None => {
            let remote_id = assignment
              .remote_id
              .clone()
              .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            conn.execute(
              "INSERT INTO locations (
                 parent_id, content_id, path_string, depth, priority, hidden,
                 invisible, remote_id
               ) VALUES (?1, ?2, '', ?3, ?4, ?5, ?6, ?7)",
              rusqlite::params![
                parent.id,
                content_id,
                parent.depth + 1,
                assignment.priority,
                assignment.hidden,
                parent.hidden || parent.invisible,
                remote_id,
              ],
            )?;
            let location_id = conn.last_insert_rowid();

            conn.execute(
              "UPDATE content SET main_location_id = COALESCE(main_location_id, ?2)
               WHERE id = ?1",
              rusqlite::params![content_id, location_id],
            )?;
            conn.execute(
              "UPDATE locations SET
                 path_string = ?2,
                 main_location_id = (SELECT main_location_id FROM content WHERE id = ?3)
               WHERE id = ?1",
              rusqlite::params![location_id, parent.child_path(location_id), content_id],
            )?;

            created.push(
              query_location(conn, location_id)?
                .ok_or_else(|| not_found("location", location_id))?,
            );
            location_id
          }
        };

        conn.execute(
          "UPDATE node_assignments SET location_id = ?2 WHERE id = ?1",
          rusqlite::params![assignment.id, location_id],
        )?;
      }
      Ok(created)
    })
  }

  fn load_node_assignments(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> CoreResult<Vec<NodeAssignment>> {
    self.with(|conn| {
      let mut stmt = conn.prepare(&format!(
        "{ASSIGNMENT_SELECT} WHERE content_id = ?1 AND version_no = ?2 ORDER BY id"
      ))?;
      let raws = stmt
        .query_map(rusqlite::params![content_id, version_no], RawNodeAssignment::from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
      raws.into_iter().map(RawNodeAssignment::into_assignment).collect()
    })
  }

  fn delete_node_assignment(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "DELETE FROM node_assignments
         WHERE content_id = ?1 AND (?2 IS NULL OR version_no = ?2)",
        rusqlite::params![content_id, version_no],
      )?;
      Ok(())
    })
  }

  fn load_locations(&self, content_id: ContentId) -> CoreResult<Vec<Location>> {
    self.with(|conn| {
      let mut stmt =
        conn.prepare(&format!("{LOCATION_SELECT} WHERE content_id = ?1 ORDER BY id"))?;
      Ok(
        stmt
          .query_map(rusqlite::params![content_id], location_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?,
      )
    })
  }
}

impl LocationHandler for SqliteGateway<'_> {
  fn remove_subtree(&self, location_id: LocationId) -> CoreResult<SubtreeRemoval> {
    self.with(|conn| {
      if location_id == ROOT_LOCATION_ID {
        return Err(Error::Core(vellum_core::Error::BadState(
          "the root location cannot be removed".into(),
        )));
      }
      let root = query_location(conn, location_id)?
        .ok_or_else(|| not_found("location", location_id))?;
      let pattern = format!("{}%", root.path_string);

      let subtree = {
        let mut stmt = conn.prepare(&format!(
          "{LOCATION_SELECT} WHERE path_string LIKE ?1 ORDER BY depth, id"
        ))?;
        stmt
          .query_map(rusqlite::params![pattern], location_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?
      };

      let mut contents: Vec<ContentId> = Vec::new();
      for location in &subtree {
        conn.execute(
          "DELETE FROM node_assignments WHERE location_id = ?1",
          rusqlite::params![location.id],
        )?;
        if let Some(content_id) = location.content_id
          && !contents.contains(&content_id)
        {
          contents.push(content_id);
        }
      }

      conn.execute(
        "DELETE FROM locations WHERE path_string LIKE ?1",
        rusqlite::params![pattern],
      )?;

      let mut orphaned_content = Vec::new();
      for &content_id in &contents {
        let next_main: Option<LocationId> = conn.query_row(
          "SELECT MIN(id) FROM locations WHERE content_id = ?1",
          rusqlite::params![content_id],
          |row| row.get(0),
        )?;
        conn.execute(
          "UPDATE content SET main_location_id = ?2 WHERE id = ?1",
          rusqlite::params![content_id, next_main],
        )?;
        match next_main {
          Some(main) => {
            conn.execute(
              "UPDATE locations SET main_location_id = ?2 WHERE content_id = ?1",
              rusqlite::params![content_id, main],
            )?;
          }
          None => orphaned_content.push(content_id),
        }
      }

      tracing::debug!(
        location_id,
        removed = subtree.len(),
        orphaned = orphaned_content.len(),
        "removed location subtree"
      );

      Ok(SubtreeRemoval {
        location_ids: subtree.iter().map(|l| l.id).collect(),
        orphaned_content,
      })
    })
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

impl FieldStore for SqliteGateway<'_> {
  fn create_new_fields(&self, content: &mut Content) -> CoreResult<()> {
    let content_id = content.info.id;
    let version_no = content.version_info.version_no;

    self.with(|conn| {
      for field in &mut content.fields {
        field.version_no = version_no;
        field.id = Some(insert_field(conn, content_id, version_no, field)?);
      }
      Ok(())
    })
  }

  fn load_external_field_data(&self, content: &mut Content) -> CoreResult<()> {
    let content_id = content.info.id;
    let version_no = content.version_info.version_no;

    self.with(|conn| {
      let payloads: HashMap<i64, String> = {
        let mut stmt = conn.prepare(
          "SELECT e.field_id, e.payload_json
           FROM external_field_data e
           JOIN content_fields f ON f.id = e.field_id
           WHERE f.content_id = ?1 AND f.version_no = ?2",
        )?;
        stmt
          .query_map(rusqlite::params![content_id, version_no], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<_>>()?
      };

      for field in &mut content.fields {
        if let Some(payload) = field.id.and_then(|id| payloads.get(&id)) {
          field.value.external_data = Some(decode_json(payload)?);
        }
      }
      Ok(())
    })
  }

  fn update_fields(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    update: &UpdateStruct,
  ) -> CoreResult<()> {
    self.with(|conn| {
      for field in &update.fields {
        let target: Option<i64> = match field.id {
          Some(field_id) => Some(
            conn
              .query_row(
                "SELECT id FROM content_fields
                 WHERE id = ?1 AND content_id = ?2 AND version_no = ?3",
                rusqlite::params![field_id, content_id, version_no],
                |row| row.get(0),
              )
              .optional()?
              .ok_or_else(|| not_found("field", field_id))?,
          ),
          None => conn
            .query_row(
              "SELECT id FROM content_fields
               WHERE content_id = ?1 AND version_no = ?2
                 AND field_definition_id = ?3 AND language_code = ?4",
              rusqlite::params![
                content_id,
                version_no,
                field.field_definition_id,
                field.language_code,
              ],
              |row| row.get(0),
            )
            .optional()?,
        };

        match target {
          Some(field_id) => {
            conn.execute(
              "UPDATE content_fields SET field_type = ?2, data_json = ?3, sort_key = ?4
               WHERE id = ?1",
              rusqlite::params![
                field_id,
                field.field_type,
                encode_json(&field.value.data),
                field.value.sort_key,
              ],
            )?;
            write_external_data(conn, field_id, field.value.external_data.as_ref())?;
          }
          None => {
            insert_field(conn, content_id, version_no, field)?;
          }
        }
      }
      Ok(())
    })
  }

  fn delete_fields(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> CoreResult<()> {
    self.with(|conn| {
      conn.execute(
        "DELETE FROM external_field_data WHERE field_id IN (
           SELECT id FROM content_fields
           WHERE content_id = ?1 AND (?2 IS NULL OR version_no = ?2))",
        rusqlite::params![content_id, version_no],
      )?;
      conn.execute(
        "DELETE FROM content_fields
         WHERE content_id = ?1 AND (?2 IS NULL OR version_no = ?2)",
        rusqlite::params![content_id, version_no],
      )?;
      Ok(())
    })
  }
}
