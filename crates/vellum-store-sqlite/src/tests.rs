//! Integration tests for `SqliteStore` driven through the `ContentHandler`.

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use vellum_core::{
  ContentHandler, Error,
  content::{
    ContentStatus, CreateStruct, Field, FieldValue, MetadataUpdateStruct,
    UpdateStruct, VersionStatus,
  },
  event::ContentEvent,
  gateway::Repository,
  location::{LocationCreateStruct, Placement, ROOT_LOCATION_ID},
  relation::{RelationCreateStruct, RelationType},
};

use crate::SqliteStore;

async fn handler() -> ContentHandler<SqliteStore> {
  ContentHandler::new(SqliteStore::open_in_memory().await.expect("in-memory store"))
}

fn field(definition: i64, language: &str, data: serde_json::Value) -> Field {
  Field {
    id:                  None,
    field_definition_id: definition,
    field_type:          "text_line".into(),
    value:               FieldValue { data, ..Default::default() },
    language_code:       language.into(),
    version_no:          0,
  }
}

fn under(parent_id: i64) -> LocationCreateStruct {
  LocationCreateStruct { parent_id, priority: 0, hidden: false, remote_id: None }
}

fn article(name: &str) -> CreateStruct {
  CreateStruct {
    names:                 BTreeMap::from([("eng-GB".to_string(), name.to_string())]),
    content_type_id:       2,
    section_id:            1,
    owner_id:              14,
    locations:             vec![under(ROOT_LOCATION_ID)],
    always_available:      false,
    remote_id:             None,
    initial_language_code: "eng-GB".into(),
    modified:              Utc::now(),
    fields:                vec![
      field(1, "eng-GB", json!(name)),
      field(2, "eng-GB", json!({"body": "lorem"})),
    ],
  }
}

fn relation(
  source: i64,
  version_no: i64,
  destination: i64,
  relation_type: RelationType,
) -> RelationCreateStruct {
  RelationCreateStruct {
    source_content_id: source,
    source_version_no: version_no,
    source_field_definition_id: None,
    destination_content_id: destination,
    relation_type,
  }
}

// ─── Create / load ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_then_load_round_trips() {
  let h = handler().await;

  let created = h.create(article("Welcome")).await.unwrap();
  assert_eq!(created.version_info.version_no, 1);
  assert_eq!(created.version_info.status, VersionStatus::Draft);
  assert!(created.fields.iter().all(|f| f.id.is_some()));
  assert_eq!(created.info.remote_id.len(), 32);

  let loaded = h.load(created.info.id, 1, None).await.unwrap();
  assert_eq!(loaded.info.status, ContentStatus::Draft);
  assert_eq!(loaded.info.name, "Welcome");
  assert_eq!(loaded.version_info.names["eng-GB"], "Welcome");
  assert_eq!(loaded.version_info.language_codes, vec!["eng-GB"]);
  assert_eq!(loaded.fields.len(), 2);
  assert_eq!(loaded.fields[1].value.data, json!({"body": "lorem"}));
  assert_eq!(loaded.assignments.len(), 1);
  assert!(loaded.assignments[0].placement.is_pending());
}

#[tokio::test]
async fn create_requires_name_in_initial_language() {
  let h = handler().await;
  let mut create = article("Nameless");
  create.initial_language_code = "nor-NO".into();

  let err = h.create(create).await.unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));
}

#[tokio::test]
async fn create_keeps_given_remote_id() {
  let h = handler().await;
  let mut create = article("Remote");
  create.remote_id = Some("abc123".into());

  let content = h.create(create).await.unwrap();
  let info = h.load_content_info(content.info.id).await.unwrap();
  assert_eq!(info.remote_id, "abc123");
}

#[tokio::test]
async fn missing_content_and_versions_are_not_found() {
  let h = handler().await;
  let content = h.create(article("Here")).await.unwrap();

  assert!(h.load(999, 1, None).await.unwrap_err().is_not_found());
  assert!(h.load(content.info.id, 7, None).await.unwrap_err().is_not_found());
  assert!(h.load_content_info(999).await.unwrap_err().is_not_found());
  assert!(
    h.load_version_info(content.info.id, 7)
      .await
      .unwrap_err()
      .is_not_found()
  );
  assert!(h.list_versions(999).await.unwrap().is_empty());
}

#[tokio::test]
async fn translations_filter_fields_and_names() {
  let h = handler().await;
  let mut create = article("Hello");
  create.names.insert("nor-NO".into(), "Hei".into());
  create.fields.push(field(1, "nor-NO", json!("Hei")));

  let content = h.create(create).await.unwrap();
  assert_eq!(content.version_info.language_codes, vec!["eng-GB", "nor-NO"]);

  let norwegian = h
    .load(content.info.id, 1, Some(vec!["nor-NO".into()]))
    .await
    .unwrap();
  assert_eq!(norwegian.fields.len(), 1);
  assert_eq!(norwegian.fields[0].value.data, json!("Hei"));
  assert_eq!(
    norwegian.version_info.names,
    BTreeMap::from([("nor-NO".to_string(), "Hei".to_string())])
  );
}

#[tokio::test]
async fn translations_matching_no_field_are_not_found() {
  let h = handler().await;
  let id = h.create(article("English only")).await.unwrap().info.id;

  let err = h.load(id, 1, Some(vec!["ger-DE".into()])).await.unwrap_err();
  assert!(err.is_not_found());
  let err = h.load(id, 1, Some(vec![])).await.unwrap_err();
  assert!(err.is_not_found());

  let english = h.load(id, 1, Some(vec!["eng-GB".into()])).await.unwrap();
  assert_eq!(english.fields.len(), 2);
}

#[tokio::test]
async fn external_field_data_is_stored_out_of_row() {
  let h = handler().await;
  let mut create = article("Image");
  create.fields[1].value.external_data = Some(json!({"blob": "aGVsbG8="}));

  let content = h.create(create).await.unwrap();
  let loaded = h.load(content.info.id, 1, None).await.unwrap();
  assert_eq!(loaded.fields[0].value.external_data, None);
  assert_eq!(
    loaded.fields[1].value.external_data,
    Some(json!({"blob": "aGVsbG8="}))
  );
}

// ─── Publish ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_materialises_locations() {
  let h = handler().await;
  let content = h.create(article("Placed")).await.unwrap();
  let id = content.info.id;

  let published = h
    .publish(id, 1, MetadataUpdateStruct {
      publication_date: Some(Utc::now()),
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(published.version_info.status, VersionStatus::Published);
  assert_eq!(published.info.status, ContentStatus::Published);
  assert!(published.info.publication_date.is_some());

  let locations = h.load_locations(id).await.unwrap();
  assert_eq!(locations.len(), 1);
  let location = &locations[0];
  assert_eq!(location.parent_id, Some(ROOT_LOCATION_ID));
  assert_eq!(location.depth, 1);
  assert_eq!(location.path_string, format!("/1/{}/", location.id));
  assert_eq!(location.main_location_id, Some(location.id));
  assert_eq!(published.info.main_location_id, Some(location.id));
  assert_eq!(
    published.assignments[0].placement,
    Placement::Materialized(location.id)
  );
}

#[tokio::test]
async fn publishing_a_new_version_archives_the_previous_one() {
  let h = handler().await;
  let id = h.create(article("Twice")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();

  let draft = h.create_draft_from_version(id, 1, 14).await.unwrap();
  assert_eq!(draft.version_info.version_no, 2);
  h.update_content(id, 2, UpdateStruct {
    names: BTreeMap::from([("eng-GB".into(), "Twice, renamed".into())]),
    ..Default::default()
  })
  .await
  .unwrap();

  let mut rx = h.subscribe();
  h.publish(id, 2, MetadataUpdateStruct::default()).await.unwrap();

  let versions = h.list_versions(id).await.unwrap();
  let statuses: Vec<_> = versions.iter().map(|v| v.status).collect();
  assert_eq!(statuses, vec![VersionStatus::Archived, VersionStatus::Published]);

  let info = h.load_content_info(id).await.unwrap();
  assert_eq!(info.current_version_no, 2);
  assert_eq!(info.name, "Twice, renamed");
  // Drafts carry no placements of their own.
  assert_eq!(h.load_locations(id).await.unwrap().len(), 1);

  assert_eq!(rx.try_recv().unwrap(), ContentEvent::Published {
    content_id: id,
    version_no: 2,
    archived:   vec![1],
  });
}

#[tokio::test]
async fn publish_rejects_non_draft_versions() {
  let h = handler().await;
  let id = h.create(article("Once")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();

  let err = h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap_err();
  assert!(matches!(err, Error::BadState(_)));
}

#[tokio::test]
async fn publish_with_missing_parent_rolls_back() {
  let h = handler().await;
  let mut create = article("Lost");
  create.locations = vec![under(4242)];
  let id = h.create(create).await.unwrap().info.id;

  let err = h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap_err();
  assert!(err.is_not_found());

  let version = h.load_version_info(id, 1).await.unwrap();
  assert_eq!(version.status, VersionStatus::Draft);
  assert!(h.load_locations(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn publish_metadata_name_wins() {
  let h = handler().await;
  let id = h.create(article("Draft name")).await.unwrap().info.id;

  let published = h
    .publish(id, 1, MetadataUpdateStruct {
      name: Some("Final name".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(published.info.name, "Final name");
}

// ─── Drafts ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn draft_copies_fields_with_fresh_identity() {
  let h = handler().await;
  let mut create = article("Source");
  create.fields[0].value.external_data = Some(json!([1, 2, 3]));
  let source = h.create(create).await.unwrap();
  let id = source.info.id;

  let draft = h.create_draft_from_version(id, 1, 7).await.unwrap();
  assert_eq!(draft.version_info.status, VersionStatus::Draft);
  assert_eq!(draft.version_info.creator_id, 7);
  assert_eq!(draft.fields.len(), source.fields.len());

  let loaded = h.load(id, 2, None).await.unwrap();
  for (copy, original) in loaded.fields.iter().zip(&source.fields) {
    assert_ne!(copy.id, original.id);
    assert_eq!(copy.version_no, 2);
    assert_eq!(copy.field_definition_id, original.field_definition_id);
    assert_eq!(copy.language_code, original.language_code);
    assert_eq!(copy.value, original.value);
  }
  assert_eq!(loaded.version_info.names, source.version_info.names);
}

#[tokio::test]
async fn version_numbers_are_never_reused() {
  let h = handler().await;
  let id = h.create(article("Counter")).await.unwrap().info.id;

  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.delete_version(id, 3).await.unwrap();

  let next = h.create_draft_from_version(id, 1, 14).await.unwrap();
  assert_eq!(next.version_info.version_no, 4);
}

#[tokio::test]
async fn draft_from_missing_version_is_not_found() {
  let h = handler().await;
  let id = h.create(article("Only one")).await.unwrap().info.id;

  let err = h.create_draft_from_version(id, 5, 14).await.unwrap_err();
  assert!(err.is_not_found());
  assert_eq!(h.list_versions(id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_drafts_get_distinct_numbers() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("vellum.db");

  let first = ContentHandler::new(SqliteStore::open(&path).await.unwrap());
  let second = ContentHandler::new(SqliteStore::open(&path).await.unwrap());
  let id = first.create(article("Contended")).await.unwrap().info.id;

  let mut tasks = Vec::new();
  for i in 0..8 {
    let h = if i % 2 == 0 { first.clone() } else { second.clone() };
    tasks.push(tokio::spawn(async move {
      h.create_draft_from_version(id, 1, 14).await.map(|c| c.version_info.version_no)
    }));
  }

  let mut numbers = Vec::new();
  for task in tasks {
    numbers.push(task.await.unwrap().unwrap());
  }
  numbers.sort_unstable();
  assert_eq!(numbers, (2..=9).collect::<Vec<_>>());
}

#[tokio::test]
async fn drafts_are_listed_per_creator() {
  let h = handler().await;
  let id = h.create(article("Shared")).await.unwrap().info.id;
  h.create_draft_from_version(id, 1, 7).await.unwrap();

  let mine = h.load_drafts_for_user(7).await.unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].version_no, 2);

  let owner = h.load_drafts_for_user(14).await.unwrap();
  assert_eq!(owner.len(), 1);
  assert_eq!(owner[0].version_no, 1);

  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();
  assert!(h.load_drafts_for_user(14).await.unwrap().is_empty());
}

// ─── Updates ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_content_rewrites_only_given_fields() {
  let h = handler().await;
  let content = h.create(article("Before")).await.unwrap();
  let id = content.info.id;

  let mut title = content.fields[0].clone();
  title.value.data = json!("After");

  let updated = h
    .update_content(id, 1, UpdateStruct {
      names: BTreeMap::from([
        ("eng-GB".into(), "After".into()),
        ("nor-NO".into(), "Etter".into()),
      ]),
      fields: vec![title, field(1, "nor-NO", json!("Etter"))],
      ..Default::default()
    })
    .await
    .unwrap();

  assert_eq!(updated.version_info.version_no, 1);
  assert_eq!(updated.version_info.status, VersionStatus::Draft);
  assert_eq!(updated.fields.len(), 3);
  assert_eq!(updated.fields[0].value.data, json!("After"));
  assert_eq!(updated.fields[0].id, content.fields[0].id);
  assert_eq!(updated.fields[1], content.fields[1]);
  assert_eq!(updated.version_info.language_codes, vec!["eng-GB", "nor-NO"]);
  assert_eq!(updated.version_info.names["nor-NO"], "Etter");
}

#[tokio::test]
async fn update_content_with_foreign_field_id_is_not_found() {
  let h = handler().await;
  let id = h.create(article("Guarded")).await.unwrap().info.id;

  let mut stray = field(1, "eng-GB", json!("x"));
  stray.id = Some(9_999);
  let err = h
    .update_content(id, 1, UpdateStruct { fields: vec![stray], ..Default::default() })
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn set_status_touches_only_one_version() {
  let h = handler().await;
  let id = h.create(article("Status")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();
  h.create_draft_from_version(id, 1, 14).await.unwrap();

  assert!(h.set_status(id, VersionStatus::Published, 2).await.unwrap());
  let statuses: Vec<_> = h
    .list_versions(id)
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.status)
    .collect();
  assert_eq!(statuses, vec![VersionStatus::Published, VersionStatus::Published]);
  assert_eq!(h.load_content_info(id).await.unwrap().current_version_no, 2);

  assert!(!h.set_status(id, VersionStatus::Archived, 9).await.unwrap());
}

#[tokio::test]
async fn update_metadata_changes_identity_row() {
  let h = handler().await;
  let id = h.create(article("Meta")).await.unwrap().info.id;

  let info = h
    .update_metadata(id, MetadataUpdateStruct {
      owner_id: Some(99),
      always_available: Some(true),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(info.owner_id, 99);
  assert!(info.always_available);
  assert_eq!(info.name, "Meta");

  let err = h
    .update_metadata(404, MetadataUpdateStruct::default())
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

// ─── Copy ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn copy_preserves_version_history() {
  let h = handler().await;
  let id = h.create(article("Original")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.publish(id, 2, MetadataUpdateStruct::default()).await.unwrap();
  h.create_draft_from_version(id, 2, 14).await.unwrap();

  let copy = h.copy(id, None).await.unwrap();
  assert_ne!(copy.info.id, id);
  assert_ne!(copy.info.remote_id, h.load_content_info(id).await.unwrap().remote_id);
  assert_eq!(copy.version_info.version_no, 2);
  assert_eq!(h.load_content_info(copy.info.id).await.unwrap().current_version_no, 2);
  assert!(h.load_locations(copy.info.id).await.unwrap().is_empty());

  let versions = h.list_versions(copy.info.id).await.unwrap();
  let summary: Vec<_> = versions.iter().map(|v| (v.version_no, v.status)).collect();
  assert_eq!(summary, vec![
    (1, VersionStatus::Archived),
    (2, VersionStatus::Draft),
    (3, VersionStatus::Draft),
  ]);

  let source = h.load(id, 3, None).await.unwrap();
  let copied = h.load(copy.info.id, 3, None).await.unwrap();
  let values = |c: &vellum_core::content::Content| {
    c.fields.iter().map(|f| f.value.clone()).collect::<Vec<_>>()
  };
  assert_eq!(values(&copied), values(&source));

  // A later draft on the copy continues above every copied number.
  let next = h.create_draft_from_version(copy.info.id, 2, 14).await.unwrap();
  assert_eq!(next.version_info.version_no, 4);
}

#[tokio::test]
async fn copy_with_highest_current_version_matches_every_version() {
  let h = handler().await;
  let mut create = article("Layered");
  create.names.insert("nor-NO".into(), "Lagvis".into());
  create.fields.push(field(1, "nor-NO", json!("Lagvis")));
  let id = h.create(create).await.unwrap().info.id;

  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.update_content(id, 2, UpdateStruct {
    names: BTreeMap::from([("eng-GB".into(), "Layered v2".into())]),
    ..Default::default()
  })
  .await
  .unwrap();
  let third = h.create_draft_from_version(id, 2, 14).await.unwrap();
  let mut body = third.fields[1].clone();
  body.value.data = json!({"body": "third"});
  h.update_content(id, 3, UpdateStruct {
    fields: vec![body],
    ..Default::default()
  })
  .await
  .unwrap();
  h.publish(id, 3, MetadataUpdateStruct::default()).await.unwrap();

  let copy = h.copy(id, None).await.unwrap();
  let copy_id = copy.info.id;
  assert_eq!(h.load_content_info(copy_id).await.unwrap().current_version_no, 3);

  let numbers: Vec<_> = h
    .list_versions(copy_id)
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.version_no)
    .collect();
  assert_eq!(numbers, vec![1, 2, 3]);

  for version_no in 1..=3 {
    let source = h.load(id, version_no, None).await.unwrap();
    let copied = h.load(copy_id, version_no, None).await.unwrap();

    assert_eq!(copied.version_info.names, source.version_info.names);
    assert_eq!(
      copied.version_info.language_codes,
      source.version_info.language_codes
    );
    assert_eq!(copied.fields.len(), source.fields.len());
    for (c, s) in copied.fields.iter().zip(&source.fields) {
      assert_ne!(c.id, s.id);
      assert_eq!(c.version_no, version_no);
      assert_eq!(c.field_definition_id, s.field_definition_id);
      assert_eq!(c.language_code, s.language_code);
      assert_eq!(c.value, s.value);
    }
  }
}

#[tokio::test]
async fn copy_of_one_version_keeps_its_number() {
  let h = handler().await;
  let id = h.create(article("Single")).await.unwrap().info.id;
  h.create_draft_from_version(id, 1, 14).await.unwrap();

  let copy = h.copy(id, Some(2)).await.unwrap();
  let numbers: Vec<_> = h
    .list_versions(copy.info.id)
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.version_no)
    .collect();
  assert_eq!(numbers, vec![2]);
}

// ─── Deletion ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_version_leaves_siblings_intact() {
  let h = handler().await;
  let target = h.create(article("Target")).await.unwrap().info.id;
  let id = h.create(article("Versions")).await.unwrap().info.id;
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.add_relation(relation(id, 1, target, RelationType::Common)).await.unwrap();
  h.add_relation(relation(id, 2, target, RelationType::Link)).await.unwrap();

  let before = h.load(id, 1, None).await.unwrap();
  h.delete_version(id, 2).await.unwrap();

  assert_eq!(h.load(id, 1, None).await.unwrap(), before);
  assert!(h.load(id, 2, None).await.unwrap_err().is_not_found());
  let remaining = h.load_relations(id, None, None).await.unwrap();
  assert_eq!(remaining.len(), 1);
  assert_eq!(remaining[0].source_version_no, 1);
}

#[tokio::test]
async fn current_version_cannot_be_deleted() {
  let h = handler().await;
  let id = h.create(article("Anchored")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();
  h.create_draft_from_version(id, 1, 14).await.unwrap();

  let err = h.delete_version(id, 1).await.unwrap_err();
  assert!(matches!(err, Error::BadState(_)));

  let info = h.load_content_info(id).await.unwrap();
  assert_eq!(info.current_version_no, 1);
  assert_eq!(info.status, ContentStatus::Published);
  assert_eq!(h.list_versions(id).await.unwrap().len(), 2);
  h.copy(id, None).await.unwrap();

  // The draft is not current and goes away normally.
  h.delete_version(id, 2).await.unwrap();
}

#[tokio::test]
async fn remove_raw_content_deletes_every_row() {
  let h = handler().await;
  let other = h.create(article("Other")).await.unwrap().info.id;
  let id = h.create(article("Doomed")).await.unwrap().info.id;
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  h.add_relation(relation(other, 1, id, RelationType::Embed)).await.unwrap();

  h.remove_raw_content(id).await.unwrap();

  assert!(h.load_content_info(id).await.unwrap_err().is_not_found());
  assert!(h.list_versions(id).await.unwrap().is_empty());
  assert!(h.load_relations(other, None, None).await.unwrap().is_empty());
  assert!(h.remove_raw_content(id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_content_removes_subtree_and_orphans() {
  let h = handler().await;
  let parent = h.create(article("Parent")).await.unwrap().info.id;
  let parent = h
    .publish(parent, 1, MetadataUpdateStruct::default())
    .await
    .unwrap();
  let parent_location = parent.info.main_location_id.unwrap();

  let mut create = article("Child");
  create.locations = vec![under(parent_location)];
  let child = h.create(create).await.unwrap().info.id;
  let child_location = h
    .publish(child, 1, MetadataUpdateStruct::default())
    .await
    .unwrap()
    .info
    .main_location_id
    .unwrap();

  let mut rx = h.subscribe();
  let removed = h.delete_content(parent.info.id).await.unwrap();
  assert_eq!(removed, vec![parent_location, child_location]);

  assert!(h.load_content_info(child).await.unwrap_err().is_not_found());
  // The content itself keeps its rows until removed explicitly.
  let info = h.load_content_info(parent.info.id).await.unwrap();
  assert_eq!(info.main_location_id, None);
  assert!(h.load_locations(parent.info.id).await.unwrap().is_empty());

  let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
  assert!(events.contains(&ContentEvent::ContentDeleted { content_id: child }));
  assert!(events.contains(&ContentEvent::LocationDeleted {
    location_id: child_location,
  }));
}

#[tokio::test]
async fn purge_removes_locations_and_rows() {
  let h = handler().await;
  let id = h.create(article("Purged")).await.unwrap().info.id;
  h.publish(id, 1, MetadataUpdateStruct::default()).await.unwrap();

  h.purge(id).await.unwrap();
  assert!(h.load_content_info(id).await.unwrap_err().is_not_found());
  assert!(h.load_locations(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn root_location_cannot_be_removed() {
  let h = handler().await;
  let err = h
    .repository()
    .transaction(|tx| tx.remove_subtree(ROOT_LOCATION_ID))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::BadState(_)));
}

// ─── Relations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reverse_relations_come_from_published_sources_only() {
  let h = handler().await;
  let target = h.create(article("Target")).await.unwrap().info.id;
  let source = h.create(article("Source")).await.unwrap().info.id;

  let added = h
    .add_relation(relation(source, 1, target, RelationType::Link))
    .await
    .unwrap();
  assert!(h.load_reverse_relations(target, None).await.unwrap().is_empty());

  h.publish(source, 1, MetadataUpdateStruct::default()).await.unwrap();
  let reverse = h.load_reverse_relations(target, None).await.unwrap();
  assert_eq!(reverse, vec![added.clone()]);
  assert!(
    h.load_reverse_relations(target, Some(RelationType::Embed))
      .await
      .unwrap()
      .is_empty()
  );

  h.remove_relation(added.id).await.unwrap();
  assert!(h.remove_relation(added.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn relation_input_is_validated() {
  let h = handler().await;
  let source = h.create(article("Source")).await.unwrap().info.id;

  let err = h
    .add_relation(relation(source, 1, source, RelationType::Field))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::InvalidInput(_)));

  let err = h
    .add_relation(relation(source, 1, 777, RelationType::Common))
    .await
    .unwrap_err();
  assert!(err.is_not_found());

  let mut field_relation = relation(source, 1, source, RelationType::Field);
  field_relation.source_field_definition_id = Some(2);
  h.add_relation(field_relation).await.unwrap();
  let loaded = h
    .load_relations(source, Some(1), Some(RelationType::Field))
    .await
    .unwrap();
  assert_eq!(loaded.len(), 1);
  assert_eq!(loaded[0].source_field_definition_id, Some(2));
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn events_follow_committed_operations() {
  let h = handler().await;
  let mut rx = h.subscribe();

  let id = h.create(article("Observed")).await.unwrap().info.id;
  h.create_draft_from_version(id, 1, 14).await.unwrap();
  // Fails and therefore emits nothing.
  let _ = h.create_draft_from_version(id, 42, 14).await;

  assert_eq!(rx.try_recv().unwrap(), ContentEvent::Created {
    content_id: id,
    version_no: 1,
  });
  assert_eq!(rx.try_recv().unwrap(), ContentEvent::DraftCreated {
    content_id: id,
    version_no: 2,
  });
  assert!(rx.try_recv().is_err());
}
