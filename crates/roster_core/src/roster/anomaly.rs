//! Non-fatal reconciliation anomalies.

use crate::model::course::CourseId;
use crate::model::event::ChangeKind;
use crate::model::student::StudentId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Reported condition that caused an event or command to be skipped.
///
/// Anomalies never abort the reconciler; the affected input is dropped and
/// the roster stays as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// Event payload is missing required fields or cannot be decoded.
    MalformedEvent {
        kind: Option<ChangeKind>,
        id: Option<StudentId>,
        reason: String,
    },
    /// Update or delete names a student the roster does not hold.
    UnknownReference { kind: ChangeKind, id: StudentId },
    /// Versioned event is older than the last one applied to the student.
    StaleVersion {
        id: StudentId,
        version: u64,
        last_applied: u64,
    },
    UnknownCourse(CourseId),
    /// Another course already uses the requested name.
    CourseNameTaken(String),
}

impl Anomaly {
    /// Stable machine-readable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedEvent { .. } => "malformed_event",
            Self::UnknownReference { .. } => "unknown_reference",
            Self::StaleVersion { .. } => "stale_version",
            Self::UnknownCourse(_) => "unknown_course",
            Self::CourseNameTaken(_) => "course_name_taken",
        }
    }

    pub(crate) fn malformed(
        kind: Option<ChangeKind>,
        id: Option<StudentId>,
        reason: impl Display,
    ) -> Self {
        Self::MalformedEvent {
            kind,
            id,
            reason: reason.to_string(),
        }
    }
}

impl Display for Anomaly {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedEvent { kind, id, reason } => {
                write!(f, "malformed")?;
                if let Some(kind) = kind {
                    write!(f, " {}", kind.as_str())?;
                }
                write!(f, " event")?;
                if let Some(id) = id {
                    write!(f, " for student {id}")?;
                }
                write!(f, ": {reason}")
            }
            Self::UnknownReference { kind, id } => {
                write!(f, "{} references unknown student {id}", kind.as_str())
            }
            Self::StaleVersion {
                id,
                version,
                last_applied,
            } => write!(
                f,
                "event version {version} for student {id} is older than applied version {last_applied}"
            ),
            Self::UnknownCourse(id) => write!(f, "course not found: {id}"),
            Self::CourseNameTaken(name) => write!(f, "course name already in use: `{name}`"),
        }
    }
}

impl Error for Anomaly {}
