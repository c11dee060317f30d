//! Collaborator contracts consumed by the [`ContentHandler`].
//!
//! Gateways are low-level row access with no business rules. Their methods are
//! synchronous and scoped to one open transaction: a backend hands the handler
//! a [`Storage`] through [`Repository::transaction`], and every call made on it
//! commits or rolls back together.
//!
//! [`ContentHandler`]: crate::ContentHandler

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  ContentId, Error, LocationId, RelationId, Result, UserId, VersionId,
  VersionNo,
  content::{
    Content, CreateStruct, Field, MetadataUpdateStruct, UpdateStruct,
    VersionInfo, VersionStatus,
  },
  location::{AssignmentOp, Location, LocationCreateStruct, NodeAssignment, SubtreeRemoval},
  relation::{Relation, RelationCreateStruct, RelationType},
};

// ─── Row types ───────────────────────────────────────────────────────────────

/// A `content` row plus the version-status flags the aggregate status is
/// derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentInfoRow {
  pub id:                 ContentId,
  pub content_type_id:    i64,
  pub section_id:         i64,
  pub owner_id:           UserId,
  pub current_version_no: VersionNo,
  pub name:               String,
  pub always_available:   bool,
  pub remote_id:          String,
  pub main_language_code: String,
  pub main_location_id:   Option<LocationId>,
  pub modification_date:  DateTime<Utc>,
  pub publication_date:   Option<DateTime<Utc>>,
  pub has_published:      bool,
  pub has_archived:       bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRow {
  pub language_code: String,
  pub name:          String,
}

/// A version row together with its name rows.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfoRow {
  pub id:                    VersionId,
  pub content_id:            ContentId,
  pub version_no:            VersionNo,
  pub status:                VersionStatus,
  pub creator_id:            UserId,
  pub creation_date:         DateTime<Utc>,
  pub modification_date:     DateTime<Utc>,
  pub initial_language_code: String,
  pub language_codes:        Vec<String>,
  pub names:                 Vec<NameRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRow {
  pub id:                  i64,
  pub field_definition_id: i64,
  pub field_type:          String,
  pub language_code:       String,
  pub version_no:          VersionNo,
  pub data:                serde_json::Value,
  pub sort_key:            Option<String>,
}

/// One row of [`ContentGateway::load`]: a content/version pair and at most
/// one of its fields. A version without fields yields a single row with
/// `field: None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRow {
  pub content: ContentInfoRow,
  pub version: VersionInfoRow,
  pub field:   Option<FieldRow>,
}

// ─── Content gateway ─────────────────────────────────────────────────────────

/// Row access for content identity, versions, names and relations.
pub trait ContentGateway {
  /// Insert the identity row for a new content whose current version will be
  /// `version_no`. Returns the new content id.
  fn insert_content_object(
    &self,
    create: &CreateStruct,
    remote_id: &str,
    version_no: VersionNo,
  ) -> Result<ContentId>;

  /// Insert a version row. `fields` determine the version's languages.
  /// Raises the content's version high-water mark to `version.version_no`.
  fn insert_version(
    &self,
    version: &VersionInfo,
    fields: &[Field],
    always_available: bool,
  ) -> Result<VersionId>;

  /// Rows for one version, optionally restricted to `translations`. Returns
  /// an empty set when the content or version does not exist, or when
  /// `translations` matches none of the version's fields.
  fn load(
    &self,
    id: ContentId,
    version_no: VersionNo,
    translations: Option<&[String]>,
  ) -> Result<Vec<ContentRow>>;

  /// Fails with [`Error::NotFound`] when the content does not exist.
  fn load_content_info(&self, id: ContentId) -> Result<ContentInfoRow>;

  /// Fails with [`Error::NotFound`] when the version does not exist.
  fn load_version_info(
    &self,
    id: ContentId,
    version_no: VersionNo,
  ) -> Result<VersionInfoRow>;

  /// All versions of a content ordered by version number.
  fn list_versions(&self, id: ContentId) -> Result<Vec<VersionInfoRow>>;

  fn list_versions_for_user(
    &self,
    user_id: UserId,
    status: VersionStatus,
  ) -> Result<Vec<VersionInfoRow>>;

  /// Highest version number ever allocated for the content; `0` when none.
  fn get_last_version_number(&self, id: ContentId) -> Result<VersionNo>;

  fn set_name(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    name: &str,
    language_code: &str,
  ) -> Result<()>;

  /// Delete names of one version, or of every version when `None`.
  fn delete_names(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<()>;

  /// Apply the set attributes of `update` to the identity row.
  fn update_content(
    &self,
    content_id: ContentId,
    update: &MetadataUpdateStruct,
  ) -> Result<()>;

  /// Apply the version-level attributes of `update`. Fields and names are
  /// handled by their own calls.
  fn update_version(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    update: &UpdateStruct,
  ) -> Result<()>;

  /// Unconditionally write `status`. Setting `Published` also makes
  /// `version_no` the content's current version. Returns whether a version
  /// row was changed.
  fn set_status(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    status: VersionStatus,
  ) -> Result<bool>;

  /// Archive every published version of the content other than `except`.
  /// Returns the archived version numbers.
  fn archive_published_versions(
    &self,
    content_id: ContentId,
    except: VersionNo,
  ) -> Result<Vec<VersionNo>>;

  /// Ids of every materialised location of the content.
  fn get_all_location_ids(&self, content_id: ContentId) -> Result<Vec<LocationId>>;

  /// Delete relations sourced from one version, or every relation touching
  /// the content (as source or destination) when `None`.
  fn delete_relations(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<()>;

  fn delete_versions(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<()>;

  /// Delete the identity row. Every owned row must already be gone.
  fn delete_content(&self, content_id: ContentId) -> Result<()>;

  // ── Relations ─────────────────────────────────────────────────────────

  fn insert_relation(&self, _relation: &RelationCreateStruct) -> Result<RelationId> {
    Err(Error::NotImplemented("insert_relation"))
  }

  /// Returns whether a relation was deleted.
  fn delete_relation(&self, _relation_id: RelationId) -> Result<bool> {
    Err(Error::NotImplemented("delete_relation"))
  }

  fn load_relations(
    &self,
    _source_content_id: ContentId,
    _source_version_no: Option<VersionNo>,
    _relation_type: Option<RelationType>,
  ) -> Result<Vec<Relation>> {
    Err(Error::NotImplemented("load_relations"))
  }

  /// Relations pointing at the content whose source version is published.
  fn load_reverse_relations(
    &self,
    _destination_content_id: ContentId,
    _relation_type: Option<RelationType>,
  ) -> Result<Vec<Relation>> {
    Err(Error::NotImplemented("load_reverse_relations"))
  }
}

// ─── Location gateway ────────────────────────────────────────────────────────

/// Row access for node assignments and the materialised location tree.
pub trait LocationGateway {
  fn create_node_assignment(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    location: &LocationCreateStruct,
    op: AssignmentOp,
  ) -> Result<()>;

  /// Turn every pending assignment of the version into a location and mark
  /// the assignment materialised. Fails with [`Error::NotFound`] when a
  /// parent location does not exist.
  fn create_locations_from_node_assignments(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> Result<Vec<Location>>;

  fn load_node_assignments(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> Result<Vec<NodeAssignment>>;

  /// Delete assignments of one version, or of every version when `None`.
  fn delete_node_assignment(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<()>;

  fn load_locations(&self, content_id: ContentId) -> Result<Vec<Location>>;
}

/// Owner of the location tree's structural operations.
pub trait LocationHandler {
  /// Recursively remove `location_id` and all of its descendants.
  fn remove_subtree(&self, location_id: LocationId) -> Result<SubtreeRemoval>;
}

// ─── Field store ─────────────────────────────────────────────────────────────

/// Persistence of per-version, per-language field values, including payloads
/// stored out of row.
pub trait FieldStore {
  /// Persist every field of `content` for its version, assigning field ids.
  fn create_new_fields(&self, content: &mut Content) -> Result<()>;

  /// Attach externally stored payloads to the fields of `content`.
  fn load_external_field_data(&self, content: &mut Content) -> Result<()>;

  /// Rewrite the fields supplied in `update`; fields not mentioned are kept.
  fn update_fields(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    update: &UpdateStruct,
  ) -> Result<()>;

  /// Delete fields of one version, or of every version when `None`.
  fn delete_fields(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<()>;
}

// ─── Storage ─────────────────────────────────────────────────────────────────

/// Every collaborator, bound to one open transaction.
pub trait Storage: ContentGateway + LocationGateway + LocationHandler + FieldStore {}

impl<T> Storage for T where
  T: ContentGateway + LocationGateway + LocationHandler + FieldStore
{
}

/// A backend able to run closures against a transactional [`Storage`].
///
/// All methods return `Send` futures so the handler can be used in
/// multi-threaded async runtimes.
pub trait Repository: Send + Sync {
  /// Run `f` in a write transaction. `Ok` commits; `Err` rolls back and is
  /// returned unchanged. Concurrent write transactions are serialised.
  fn transaction<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> Result<T> + Send + 'static;

  /// Run `f` against a consistent snapshot. Nothing is committed.
  fn read<T, F>(&self, f: F) -> impl Future<Output = Result<T>> + Send + '_
  where
    T: Send + 'static,
    F: FnOnce(&dyn Storage) -> Result<T> + Send + 'static;
}
