//! [`ContentHandler`] — the content lifecycle on top of a [`Repository`].
//!
//! Every public operation runs as one transaction: the body is a plain
//! function over [`Storage`] executed by [`Repository::transaction`], and
//! domain events are broadcast only once that transaction has committed.

use chrono::Utc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::{
  ContentId, Error, LocationId, RelationId, Result, UserId, VersionNo,
  content::{
    Content, ContentInfo, CreateStruct, Field, MetadataUpdateStruct,
    UpdateStruct, VersionInfo, VersionStatus,
  },
  event::{ContentEvent, EventConfig},
  gateway::{Repository, Storage},
  location::{AssignmentOp, Location, SubtreeRemoval},
  mapper,
  relation::{Relation, RelationCreateStruct, RelationType},
};

// ─── Handler ─────────────────────────────────────────────────────────────────

/// Creates, publishes, drafts, copies and deletes versioned content.
#[derive(Clone)]
pub struct ContentHandler<R> {
  repo:   R,
  events: broadcast::Sender<ContentEvent>,
}

impl<R: Repository> ContentHandler<R> {
  pub fn new(repo: R) -> Self { Self::with_config(repo, &EventConfig::default()) }

  pub fn with_config(repo: R, config: &EventConfig) -> Self {
    let (events, _) = broadcast::channel(config.capacity.max(1));
    Self { repo, events }
  }

  pub fn repository(&self) -> &R { &self.repo }

  /// Subscribe to events of transactions committed from now on.
  pub fn subscribe(&self) -> broadcast::Receiver<ContentEvent> {
    self.events.subscribe()
  }

  fn emit(&self, event: ContentEvent) {
    // An error only means nobody is listening.
    let _ = self.events.send(event);
  }

  // ── Creation ──────────────────────────────────────────────────────────

  /// Create a new content whose only version is number 1.
  pub async fn create(&self, create: CreateStruct) -> Result<Content> {
    self.create_with_version(create, 1).await
  }

  /// Create a new content whose only version is `version_no`.
  pub async fn create_with_version(
    &self,
    create: CreateStruct,
    version_no: VersionNo,
  ) -> Result<Content> {
    let content = self
      .repo
      .transaction(move |tx| create_in(tx, create, version_no))
      .await?;

    tracing::debug!(
      content_id = content.info.id,
      version_no,
      fields = content.fields.len(),
      "created content"
    );
    self.emit(ContentEvent::Created { content_id: content.info.id, version_no });
    Ok(content)
  }

  /// Publish a draft: apply `metadata`, materialise its pending locations,
  /// archive the previously published version and mark this one published.
  pub async fn publish(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    metadata: MetadataUpdateStruct,
  ) -> Result<Content> {
    let (content, archived) = self
      .repo
      .transaction(move |tx| publish_in(tx, content_id, version_no, &metadata))
      .await?;

    tracing::info!(content_id, version_no, ?archived, "published version");
    self.emit(ContentEvent::Published { content_id, version_no, archived });
    Ok(content)
  }

  /// Create a new draft by deep-copying `src_version`. The new version
  /// number is one above the highest number ever allocated for the content.
  pub async fn create_draft_from_version(
    &self,
    content_id: ContentId,
    src_version: VersionNo,
    creator_id: UserId,
  ) -> Result<Content> {
    let content = self
      .repo
      .transaction(move |tx| draft_in(tx, content_id, src_version, creator_id))
      .await?;

    let version_no = content.version_info.version_no;
    tracing::debug!(content_id, src_version, version_no, "created draft");
    self.emit(ContentEvent::DraftCreated { content_id, version_no });
    Ok(content)
  }

  /// Duplicate a content under a new id.
  ///
  /// With `version_no` only that version is copied, keeping its number.
  /// Without it the current version is copied first and then every other
  /// version, each keeping its original number. Relations are not copied.
  pub async fn copy(
    &self,
    content_id: ContentId,
    version_no: Option<VersionNo>,
  ) -> Result<Content> {
    let copy = self
      .repo
      .transaction(move |tx| copy_in(tx, content_id, version_no))
      .await?;

    tracing::info!(source_id = content_id, copy_id = copy.info.id, "copied content");
    self.emit(ContentEvent::Copied { source_id: content_id, copy_id: copy.info.id });
    Ok(copy)
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Load one version, optionally restricted to the given languages.
  pub async fn load(
    &self,
    id: ContentId,
    version_no: VersionNo,
    translations: Option<Vec<String>>,
  ) -> Result<Content> {
    self
      .repo
      .read(move |tx| load_in(tx, id, version_no, translations.as_deref()))
      .await
  }

  pub async fn load_content_info(&self, content_id: ContentId) -> Result<ContentInfo> {
    self
      .repo
      .read(move |tx| {
        Ok(mapper::extract_content_info_from_row(tx.load_content_info(content_id)?))
      })
      .await
  }

  pub async fn load_version_info(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> Result<VersionInfo> {
    self
      .repo
      .read(move |tx| {
        Ok(mapper::extract_version_info_from_row(
          tx.load_version_info(content_id, version_no)?,
        ))
      })
      .await
  }

  /// Draft versions created by `user_id`.
  pub async fn load_drafts_for_user(&self, user_id: UserId) -> Result<Vec<VersionInfo>> {
    self
      .repo
      .read(move |tx| {
        Ok(mapper::extract_version_info_list_from_rows(
          tx.list_versions_for_user(user_id, VersionStatus::Draft)?,
        ))
      })
      .await
  }

  /// Every version of the content ordered by number; empty when unknown.
  pub async fn list_versions(&self, content_id: ContentId) -> Result<Vec<VersionInfo>> {
    self
      .repo
      .read(move |tx| {
        Ok(mapper::extract_version_info_list_from_rows(
          tx.list_versions(content_id)?,
        ))
      })
      .await
  }

  /// Materialised locations of the content.
  pub async fn load_locations(&self, content_id: ContentId) -> Result<Vec<Location>> {
    self.repo.read(move |tx| tx.load_locations(content_id)).await
  }

  // ── Updates ───────────────────────────────────────────────────────────

  /// Unconditionally set the status of one version.
  ///
  /// This does not archive other published versions; use
  /// [`publish`](Self::publish) for that.
  pub async fn set_status(
    &self,
    content_id: ContentId,
    status: VersionStatus,
    version_no: VersionNo,
  ) -> Result<bool> {
    let changed = self
      .repo
      .transaction(move |tx| tx.set_status(content_id, version_no, status))
      .await?;

    if changed {
      self.emit(ContentEvent::ContentUpdated {
        content_id,
        version_no: Some(version_no),
      });
    }
    Ok(changed)
  }

  pub async fn update_metadata(
    &self,
    content_id: ContentId,
    update: MetadataUpdateStruct,
  ) -> Result<ContentInfo> {
    let info = self
      .repo
      .transaction(move |tx| {
        tx.load_content_info(content_id)?;
        tx.update_content(content_id, &update)?;
        Ok(mapper::extract_content_info_from_row(tx.load_content_info(content_id)?))
      })
      .await?;

    self.emit(ContentEvent::ContentUpdated { content_id, version_no: None });
    Ok(info)
  }

  /// Rewrite the fields and names supplied in `update`; everything else in
  /// the version is kept. Status and version number never change.
  pub async fn update_content(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
    update: UpdateStruct,
  ) -> Result<Content> {
    let content = self
      .repo
      .transaction(move |tx| update_content_in(tx, content_id, version_no, &update))
      .await?;

    self.emit(ContentEvent::ContentUpdated {
      content_id,
      version_no: Some(version_no),
    });
    Ok(content)
  }

  // ── Deletion ──────────────────────────────────────────────────────────

  /// Remove every location subtree the content is placed in.
  ///
  /// Descendant contents left without a location are removed entirely; the
  /// content's own rows are left for [`remove_raw_content`](Self::remove_raw_content).
  pub async fn delete_content(&self, content_id: ContentId) -> Result<Vec<LocationId>> {
    let removal = self
      .repo
      .transaction(move |tx| delete_content_in(tx, content_id))
      .await?;

    self.emit_removal(content_id, &removal);
    Ok(removal.location_ids)
  }

  /// Delete fields, relations, versions, names and the identity row.
  pub async fn remove_raw_content(&self, content_id: ContentId) -> Result<()> {
    self
      .repo
      .transaction(move |tx| remove_raw_content_in(tx, content_id))
      .await?;

    tracing::info!(content_id, "removed content");
    self.emit(ContentEvent::ContentDeleted { content_id });
    Ok(())
  }

  /// [`delete_content`](Self::delete_content) and
  /// [`remove_raw_content`](Self::remove_raw_content) as one transaction.
  pub async fn purge(&self, content_id: ContentId) -> Result<()> {
    let removal = self
      .repo
      .transaction(move |tx| {
        let removal = delete_content_in(tx, content_id)?;
        remove_raw_content_in(tx, content_id)?;
        Ok(removal)
      })
      .await?;

    tracing::info!(content_id, "purged content");
    self.emit_removal(content_id, &removal);
    self.emit(ContentEvent::ContentDeleted { content_id });
    Ok(())
  }

  /// Delete one version with its assignment, fields, relations and names.
  /// The content's current version cannot be deleted.
  pub async fn delete_version(
    &self,
    content_id: ContentId,
    version_no: VersionNo,
  ) -> Result<()> {
    self
      .repo
      .transaction(move |tx| delete_version_in(tx, content_id, version_no))
      .await?;

    tracing::debug!(content_id, version_no, "deleted version");
    self.emit(ContentEvent::VersionDeleted { content_id, version_no });
    Ok(())
  }

  fn emit_removal(&self, content_id: ContentId, removal: &SubtreeRemoval) {
    for &location_id in &removal.location_ids {
      self.emit(ContentEvent::LocationDeleted { location_id });
    }
    for &orphan in &removal.orphaned_content {
      if orphan != content_id {
        self.emit(ContentEvent::ContentDeleted { content_id: orphan });
      }
    }
  }

  // ── Relations ─────────────────────────────────────────────────────────

  /// Link a source version to a destination content.
  pub async fn add_relation(&self, relation: RelationCreateStruct) -> Result<Relation> {
    relation.validate()?;
    let relation = self
      .repo
      .transaction(move |tx| {
        tx.load_version_info(relation.source_content_id, relation.source_version_no)?;
        tx.load_content_info(relation.destination_content_id)?;
        let id = tx.insert_relation(&relation)?;
        Ok(relation.into_relation(id))
      })
      .await?;

    self.emit(ContentEvent::RelationAdded { relation_id: relation.id });
    Ok(relation)
  }

  pub async fn remove_relation(&self, relation_id: RelationId) -> Result<()> {
    self
      .repo
      .transaction(move |tx| {
        if tx.delete_relation(relation_id)? {
          Ok(())
        } else {
          Err(Error::not_found("relation", relation_id))
        }
      })
      .await?;

    self.emit(ContentEvent::RelationRemoved { relation_id });
    Ok(())
  }

  pub async fn load_relations(
    &self,
    source_content_id: ContentId,
    source_version_no: Option<VersionNo>,
    relation_type: Option<RelationType>,
  ) -> Result<Vec<Relation>> {
    self
      .repo
      .read(move |tx| {
        tx.load_relations(source_content_id, source_version_no, relation_type)
      })
      .await
  }

  /// Relations pointing at the content from published versions.
  pub async fn load_reverse_relations(
    &self,
    destination_content_id: ContentId,
    relation_type: Option<RelationType>,
  ) -> Result<Vec<Relation>> {
    self
      .repo
      .read(move |tx| tx.load_reverse_relations(destination_content_id, relation_type))
      .await
  }
}

// ─── Transaction bodies ──────────────────────────────────────────────────────

fn create_in(
  tx: &dyn Storage,
  create: CreateStruct,
  version_no: VersionNo,
) -> Result<Content> {
  if !create.names.contains_key(&create.initial_language_code) {
    return Err(Error::InvalidInput(format!(
      "names has no entry for initial language {:?}",
      create.initial_language_code
    )));
  }

  let remote_id = create
    .remote_id
    .clone()
    .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
  let content_id = tx.insert_content_object(&create, &remote_id, version_no)?;
  let info = mapper::create_content_info(&create, content_id, remote_id, version_no);

  let fields: Vec<Field> = create
    .fields
    .iter()
    .map(|field| field.detached(version_no))
    .collect();
  let mut version_info = mapper::create_version_info_for_content(
    &info,
    version_no,
    create.owner_id,
    &fields,
    &create.initial_language_code,
    create.names.clone(),
    create.modified,
  );
  version_info.id = tx.insert_version(&version_info, &fields, info.always_available)?;

  let mut content = Content {
    info,
    version_info,
    fields,
    assignments: Vec::new(),
  };
  tx.create_new_fields(&mut content)?;

  for location in &create.locations {
    tx.create_node_assignment(content_id, version_no, location, AssignmentOp::Create)?;
  }
  for (language, name) in &content.version_info.names {
    tx.set_name(content_id, version_no, name, language)?;
  }

  content.assignments = tx.load_node_assignments(content_id, version_no)?;
  Ok(content)
}

fn load_in(
  tx: &dyn Storage,
  id: ContentId,
  version_no: VersionNo,
  translations: Option<&[String]>,
) -> Result<Content> {
  let rows = tx.load(id, version_no, translations)?;
  let mut content = mapper::extract_content_from_rows(rows)
    .into_iter()
    .next()
    .ok_or_else(|| {
      Error::not_found("content", format!("contentId: {id}, versionNo: {version_no}"))
    })?;

  tx.load_external_field_data(&mut content)?;
  content.assignments = tx.load_node_assignments(id, version_no)?;
  Ok(content)
}

fn publish_in(
  tx: &dyn Storage,
  content_id: ContentId,
  version_no: VersionNo,
  metadata: &MetadataUpdateStruct,
) -> Result<(Content, Vec<VersionNo>)> {
  let version = tx.load_version_info(content_id, version_no)?;
  if version.status != VersionStatus::Draft {
    return Err(Error::BadState(format!(
      "version {version_no} of content {content_id} is {}, not draft",
      version.status
    )));
  }

  tx.create_locations_from_node_assignments(content_id, version_no)?;
  let archived = tx.archive_published_versions(content_id, version_no)?;
  tx.set_status(content_id, version_no, VersionStatus::Published)?;
  // After the status change so an explicit name wins over the version's.
  tx.update_content(content_id, metadata)?;

  Ok((load_in(tx, content_id, version_no, None)?, archived))
}

fn draft_in(
  tx: &dyn Storage,
  content_id: ContentId,
  src_version: VersionNo,
  creator_id: UserId,
) -> Result<Content> {
  let source = load_in(tx, content_id, src_version, None)?;
  let version_no = tx.get_last_version_number(content_id)? + 1;

  let fields: Vec<Field> = source
    .fields
    .iter()
    .map(|field| field.detached(version_no))
    .collect();
  let mut version_info = mapper::create_version_info_for_content(
    &source.info,
    version_no,
    creator_id,
    &fields,
    &source.version_info.initial_language_code,
    source.version_info.names.clone(),
    Utc::now(),
  );
  version_info.id =
    tx.insert_version(&version_info, &fields, source.info.always_available)?;

  let mut content = Content {
    info: source.info,
    version_info,
    fields,
    assignments: Vec::new(),
  };
  tx.create_new_fields(&mut content)?;

  for (language, name) in &content.version_info.names {
    tx.set_name(content_id, version_no, name, language)?;
  }
  Ok(content)
}

fn update_content_in(
  tx: &dyn Storage,
  content_id: ContentId,
  version_no: VersionNo,
  update: &UpdateStruct,
) -> Result<Content> {
  let version = tx.load_version_info(content_id, version_no)?;
  if let Some(language) = &update.initial_language_code {
    let named = update.names.contains_key(language)
      || version.names.iter().any(|n| &n.language_code == language);
    if !named {
      return Err(Error::InvalidInput(format!(
        "no name for initial language {language:?}"
      )));
    }
  }

  tx.update_fields(content_id, version_no, update)?;
  tx.update_version(content_id, version_no, update)?;
  for (language, name) in &update.names {
    tx.set_name(content_id, version_no, name, language)?;
  }

  load_in(tx, content_id, version_no, None)
}

fn copy_in(
  tx: &dyn Storage,
  content_id: ContentId,
  version_no: Option<VersionNo>,
) -> Result<Content> {
  let current = match version_no {
    Some(version_no) => version_no,
    None => tx.load_content_info(content_id)?.current_version_no,
  };

  let source = load_in(tx, content_id, current, None)?;
  let create = mapper::create_create_struct_from_content(&source, Utc::now());
  let modified = create.modified;
  let copy = create_in(tx, create, current)?;

  if version_no.is_none() {
    for version in tx.list_versions(content_id)? {
      if version.version_no == current {
        continue;
      }

      let mut content = load_in(tx, content_id, version.version_no, None)?;
      content.info = copy.info.clone();
      content.version_info.content_id = copy.info.id;
      content.version_info.creation_date = modified;
      content.version_info.modification_date = modified;
      content.fields = content
        .fields
        .iter()
        .map(|field| field.detached(version.version_no))
        .collect();
      content.version_info.id = tx.insert_version(
        &content.version_info,
        &content.fields,
        copy.info.always_available,
      )?;
      tx.create_new_fields(&mut content)?;

      for (language, name) in &content.version_info.names {
        tx.set_name(copy.info.id, version.version_no, name, language)?;
      }
    }
  }

  Ok(copy)
}

fn delete_content_in(tx: &dyn Storage, content_id: ContentId) -> Result<SubtreeRemoval> {
  let mut removed = SubtreeRemoval::default();

  for location_id in tx.get_all_location_ids(content_id)? {
    // Already gone as part of an earlier subtree.
    if removed.location_ids.contains(&location_id) {
      continue;
    }
    let removal = tx.remove_subtree(location_id)?;
    removed.location_ids.extend(removal.location_ids);
    for orphan in removal.orphaned_content {
      if !removed.orphaned_content.contains(&orphan) {
        removed.orphaned_content.push(orphan);
      }
    }
  }

  for &orphan in &removed.orphaned_content {
    if orphan != content_id {
      remove_raw_content_in(tx, orphan)?;
    }
  }
  Ok(removed)
}

fn remove_raw_content_in(tx: &dyn Storage, content_id: ContentId) -> Result<()> {
  tx.load_content_info(content_id)?;

  tx.delete_fields(content_id, None)?;
  tx.delete_relations(content_id, None)?;
  tx.delete_node_assignment(content_id, None)?;
  tx.delete_versions(content_id, None)?;
  tx.delete_names(content_id, None)?;
  tx.delete_content(content_id)
}

fn delete_version_in(
  tx: &dyn Storage,
  content_id: ContentId,
  version_no: VersionNo,
) -> Result<()> {
  tx.load_version_info(content_id, version_no)?;
  if tx.load_content_info(content_id)?.current_version_no == version_no {
    return Err(Error::BadState(format!(
      "version {version_no} is the current version of content {content_id}"
    )));
  }

  tx.delete_node_assignment(content_id, Some(version_no))?;
  tx.delete_fields(content_id, Some(version_no))?;
  tx.delete_relations(content_id, Some(version_no))?;
  tx.delete_versions(content_id, Some(version_no))?;
  tx.delete_names(content_id, Some(version_no))
}
