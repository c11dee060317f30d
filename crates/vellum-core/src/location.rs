//! Placement of content in the location tree.
//!
//! Placement is two-phase: a version records [`NodeAssignment`]s (intent) and
//! publishing the version materialises them into [`Location`]s (effect).

use serde::{Deserialize, Serialize};

use crate::{ContentId, LocationId, VersionNo};

/// The root of the location tree; created with the schema.
pub const ROOT_LOCATION_ID: LocationId = 1;

/// The operation a pending node assignment records.
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
pub enum AssignmentOp {
  /// Create a new location under the parent when the version is published.
  Create,
}

/// State of a node assignment. Publishing is the only transition from
/// `Pending` to `Materialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Placement {
  Pending(AssignmentOp),
  Materialized(LocationId),
}

impl Placement {
  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending(_)) }
}

/// Requested placement of a new content under `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationCreateStruct {
  pub parent_id: LocationId,
  #[serde(default)]
  pub priority:  i32,
  #[serde(default)]
  pub hidden:    bool,
  #[serde(default)]
  pub remote_id: Option<String>,
}

/// A placement recorded against one version of a content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeAssignment {
  pub id:                 i64,
  pub content_id:         ContentId,
  pub version_no:         VersionNo,
  pub parent_location_id: LocationId,
  pub priority:           i32,
  pub hidden:             bool,
  pub remote_id:          Option<String>,
  pub placement:          Placement,
}

/// A materialised node of the location tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub id:               LocationId,
  /// `None` only for the root.
  pub parent_id:        Option<LocationId>,
  /// `None` only for the root.
  pub content_id:       Option<ContentId>,
  /// Ancestor ids including this one, e.g. `/1/2/5/`.
  pub path_string:      String,
  pub depth:            i64,
  pub priority:         i32,
  pub hidden:           bool,
  /// Hidden through an ancestor.
  pub invisible:        bool,
  pub remote_id:        String,
  pub main_location_id: Option<LocationId>,
}

impl Location {
  /// Path string of a direct child with id `child_id`.
  pub fn child_path(&self, child_id: LocationId) -> String {
    format!("{}{child_id}/", self.path_string)
  }
}

/// Outcome of [`crate::gateway::LocationHandler::remove_subtree`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtreeRemoval {
  /// Every removed location, the subtree root included.
  pub location_ids:     Vec<LocationId>,
  /// Contents placed in the subtree that no longer have any location.
  pub orphaned_content: Vec<ContentId>,
}
