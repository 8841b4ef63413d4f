//! Course domain model.
//!
//! # Invariants
//! - `name` is unique among loaded courses.
//! - `student_count` is derived by the roster; values supplied by the store
//!   are replaced on load.

use super::id_newtype;
use serde::{Deserialize, Serialize};

id_newtype!(
    /// Opaque course identity assigned by the owning store.
    CourseId
);

/// Course record with a denormalized student count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    /// Serialized as `students` to match the dashboard payloads.
    #[serde(rename = "students", alias = "studentCount", default)]
    pub student_count: u32,
    /// CSS color used by course chips, e.g. `#0EA5E9`.
    pub color: String,
}

impl Course {
    /// Creates a course with a zero count.
    pub fn new(id: impl Into<CourseId>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            student_count: 0,
            color: color.into(),
        }
    }
}
