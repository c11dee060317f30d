//! Subcommands and their mapping onto [`ContentHandler`] operations.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Subcommand;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use vellum_core::{
  ContentHandler, ContentId, RelationId, UserId, VersionNo,
  content::{CreateStruct, MetadataUpdateStruct, UpdateStruct, VersionStatus},
  gateway::Repository,
  relation::{RelationCreateStruct, RelationType},
};

#[derive(Subcommand)]
pub enum Command {
  /// Create a content from a JSON create struct.
  Create {
    #[arg(long)]
    file: PathBuf,
  },
  /// Publish a draft version.
  Publish {
    id:      ContentId,
    version: VersionNo,
    /// JSON metadata update applied while publishing.
    #[arg(long)]
    file:    Option<PathBuf>,
  },
  /// Create a new draft from an existing version.
  Draft {
    id:      ContentId,
    version: VersionNo,
    #[arg(long)]
    creator: UserId,
  },
  /// Load one version with its fields.
  Show {
    id:      ContentId,
    version: VersionNo,
    /// Restrict to these language codes.
    #[arg(long = "lang")]
    languages: Vec<String>,
  },
  Info {
    id: ContentId,
  },
  Version {
    id:      ContentId,
    version: VersionNo,
  },
  Versions {
    id: ContentId,
  },
  /// Drafts created by a user.
  Drafts {
    user: UserId,
  },
  /// Set a version's status without archiving others.
  Status {
    id:      ContentId,
    version: VersionNo,
    status:  VersionStatus,
  },
  /// Apply a JSON update struct to a version.
  Update {
    id:      ContentId,
    version: VersionNo,
    #[arg(long)]
    file:    PathBuf,
  },
  /// Apply a JSON metadata update to a content.
  Meta {
    id:   ContentId,
    #[arg(long)]
    file: PathBuf,
  },
  Copy {
    id:      ContentId,
    /// Copy only this version.
    #[arg(long)]
    version: Option<VersionNo>,
  },
  /// Remove every location of a content.
  Delete {
    id: ContentId,
  },
  /// Remove locations and every stored row of a content.
  Purge {
    id: ContentId,
  },
  DeleteVersion {
    id:      ContentId,
    version: VersionNo,
  },
  Locations {
    id: ContentId,
  },
  /// Add a relation from a JSON relation create struct.
  Relate {
    #[arg(long)]
    file: PathBuf,
  },
  Unrelate {
    relation: RelationId,
  },
  Relations {
    id:            ContentId,
    #[arg(long)]
    version:       Option<VersionNo>,
    #[arg(long = "type")]
    relation_type: Option<RelationType>,
  },
  ReverseRelations {
    id:            ContentId,
    #[arg(long = "type")]
    relation_type: Option<RelationType>,
  },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading {}", path.display()))?;
  serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn to_json(value: impl Serialize) -> anyhow::Result<Value> { Ok(serde_json::to_value(value)?) }

impl Command {
  pub async fn run<R: Repository>(self, handler: &ContentHandler<R>) -> anyhow::Result<Value> {
    match self {
      Self::Create { file } => {
        let create: CreateStruct = read_json(&file)?;
        to_json(handler.create(create).await?)
      }
      Self::Publish { id, version, file } => {
        let metadata: MetadataUpdateStruct = match file {
          Some(file) => read_json(&file)?,
          None => MetadataUpdateStruct::default(),
        };
        to_json(handler.publish(id, version, metadata).await?)
      }
      Self::Draft { id, version, creator } => {
        to_json(handler.create_draft_from_version(id, version, creator).await?)
      }
      Self::Show { id, version, languages } => {
        let translations = (!languages.is_empty()).then_some(languages);
        to_json(handler.load(id, version, translations).await?)
      }
      Self::Info { id } => to_json(handler.load_content_info(id).await?),
      Self::Version { id, version } => {
        to_json(handler.load_version_info(id, version).await?)
      }
      Self::Versions { id } => to_json(handler.list_versions(id).await?),
      Self::Drafts { user } => to_json(handler.load_drafts_for_user(user).await?),
      Self::Status { id, version, status } => {
        let changed = handler.set_status(id, status, version).await?;
        Ok(json!({ "changed": changed }))
      }
      Self::Update { id, version, file } => {
        let update: UpdateStruct = read_json(&file)?;
        to_json(handler.update_content(id, version, update).await?)
      }
      Self::Meta { id, file } => {
        let update: MetadataUpdateStruct = read_json(&file)?;
        to_json(handler.update_metadata(id, update).await?)
      }
      Self::Copy { id, version } => to_json(handler.copy(id, version).await?),
      Self::Delete { id } => {
        let removed = handler.delete_content(id).await?;
        Ok(json!({ "removed_locations": removed }))
      }
      Self::Purge { id } => {
        handler.purge(id).await?;
        Ok(json!({ "purged": id }))
      }
      Self::DeleteVersion { id, version } => {
        handler.delete_version(id, version).await?;
        Ok(json!({ "deleted": { "content_id": id, "version_no": version } }))
      }
      Self::Locations { id } => to_json(handler.load_locations(id).await?),
      Self::Relate { file } => {
        let relation: RelationCreateStruct = read_json(&file)?;
        to_json(handler.add_relation(relation).await?)
      }
      Self::Unrelate { relation } => {
        handler.remove_relation(relation).await?;
        Ok(json!({ "removed": relation }))
      }
      Self::Relations { id, version, relation_type } => {
        to_json(handler.load_relations(id, version, relation_type).await?)
      }
      Self::ReverseRelations { id, relation_type } => {
        to_json(handler.load_reverse_relations(id, relation_type).await?)
      }
    }
  }
}
