//! Domain events emitted by the [`ContentHandler`](crate::ContentHandler).
//!
//! Events are sent only after the owning transaction has committed. Delivery
//! is best-effort: observers that lag behind lose events, and an event sent
//! while nobody listens is dropped.

use serde::{Deserialize, Serialize};

use crate::{ContentId, LocationId, RelationId, VersionNo};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ContentEvent {
  Created {
    content_id: ContentId,
    version_no: VersionNo,
  },
  Published {
    content_id: ContentId,
    version_no: VersionNo,
    /// Previously published versions archived by this publish.
    archived:   Vec<VersionNo>,
  },
  DraftCreated {
    content_id: ContentId,
    version_no: VersionNo,
  },
  ContentUpdated {
    content_id: ContentId,
    version_no: Option<VersionNo>,
  },
  VersionDeleted {
    content_id: ContentId,
    version_no: VersionNo,
  },
  ContentDeleted {
    content_id: ContentId,
  },
  LocationDeleted {
    location_id: LocationId,
  },
  Copied {
    source_id: ContentId,
    copy_id:   ContentId,
  },
  RelationAdded {
    relation_id: RelationId,
  },
  RelationRemoved {
    relation_id: RelationId,
  },
}

/// Buffer configuration for the handler's event channel.
#[derive(Debug, Clone, Deserialize)]
pub struct EventConfig {
  /// Events retained for slow subscribers before they start lagging.
  #[serde(default = "default_capacity")]
  pub capacity: usize,
}

fn default_capacity() -> usize { 64 }

impl Default for EventConfig {
  fn default() -> Self { Self { capacity: default_capacity() } }
}
