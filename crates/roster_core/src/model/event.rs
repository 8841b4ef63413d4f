//! Change feed events.
//!
//! # Invariants
//! - Every event names exactly one student identity.
//! - `VersionedEvent::version` is monotonic per feed.

use super::student::{Student, StudentId};
use serde::{Deserialize, Serialize};

/// Kind of change carried by a [`ChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Unit of delivery from the external change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ChangeEvent {
    Inserted(Student),
    Updated(Student),
    Deleted(StudentId),
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Inserted(_) => ChangeKind::Insert,
            Self::Updated(_) => ChangeKind::Update,
            Self::Deleted(_) => ChangeKind::Delete,
        }
    }

    pub fn student_id(&self) -> &StudentId {
        match self {
            Self::Inserted(student) | Self::Updated(student) => &student.id,
            Self::Deleted(id) => id,
        }
    }
}

/// Change event stamped with the feed's delivery version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedEvent {
    pub version: u64,
    pub event: ChangeEvent,
}

impl VersionedEvent {
    pub fn new(version: u64, event: ChangeEvent) -> Self {
        Self { version, event }
    }
}
