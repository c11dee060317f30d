//! Directed, typed links from a content version to another content.

use serde::{Deserialize, Serialize};

use crate::{ContentId, Error, RelationId, Result, VersionNo};

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
pub enum RelationType {
  Common,
  Embed,
  Link,
  /// Created by a relation field; requires a source field definition.
  Field,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
  pub id:                         RelationId,
  pub source_content_id:          ContentId,
  pub source_version_no:          VersionNo,
  pub source_field_definition_id: Option<i64>,
  pub destination_content_id:     ContentId,
  pub relation_type:              RelationType,
}

/// Input to [`crate::ContentHandler::add_relation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationCreateStruct {
  pub source_content_id:          ContentId,
  pub source_version_no:          VersionNo,
  #[serde(default)]
  pub source_field_definition_id: Option<i64>,
  pub destination_content_id:     ContentId,
  pub relation_type:              RelationType,
}

impl RelationCreateStruct {
  /// Reject structs missing an identifying attribute.
  pub fn validate(&self) -> Result<()> {
    if self.relation_type == RelationType::Field
      && self.source_field_definition_id.is_none()
    {
      return Err(Error::InvalidInput(
        "field relation requires source_field_definition_id".into(),
      ));
    }
    Ok(())
  }

  pub fn into_relation(self, id: RelationId) -> Relation {
    Relation {
      id,
      source_content_id: self.source_content_id,
      source_version_no: self.source_version_no,
      source_field_definition_id: self.source_field_definition_id,
      destination_content_id: self.destination_content_id,
      relation_type: self.relation_type,
    }
  }
}
