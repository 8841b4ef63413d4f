//! Student domain model.
//!
//! # Responsibility
//! - Define the student record carried by loads and change events.
//! - Provide the required-field checks used to detect malformed events.
//!
//! # Invariants
//! - `id` is unique within a roster and never blank.
//! - `attendance` is a percentage in `0..=100`.
//! - `course` is free text; it is resolved to a course by name only when the
//!   student enters the roster.

use super::id_newtype;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

id_newtype!(
    /// Opaque student identity assigned by the owning store.
    StudentId
);

/// Upper bound for `attendance`.
pub const MAX_ATTENDANCE: u8 = 100;

/// Validation errors for student records and drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentValidationError {
    BlankId,
    /// A required text field is empty after trimming.
    MissingField(&'static str),
    AttendanceOutOfRange(u8),
}

impl Display for StudentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "student id must not be blank"),
            Self::MissingField(field) => write!(f, "student field `{field}` is required"),
            Self::AttendanceOutOfRange(value) => write!(
                f,
                "attendance ({value}) must be between 0 and {MAX_ATTENDANCE}"
            ),
        }
    }
}

impl Error for StudentValidationError {}

/// Canonical student record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    /// Course display name. Not a foreign key.
    pub course: String,
    /// Calendar date in `YYYY-MM-DD` form.
    pub enrollment_date: String,
    #[serde(default)]
    pub avatar: String,
    pub grade: String,
    pub attendance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Student {
    /// Validates identity and required fields.
    ///
    /// # Errors
    /// - `BlankId` when `id` is blank.
    /// - `MissingField` for the first blank required text field.
    /// - `AttendanceOutOfRange` when `attendance > 100`.
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        if self.id.is_blank() {
            return Err(StudentValidationError::BlankId);
        }
        validate_fields(
            &self.name,
            &self.email,
            &self.course,
            &self.enrollment_date,
            &self.grade,
            self.attendance,
        )
    }
}

/// Student payload without identity, submitted to `insert_student`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDraft {
    pub name: String,
    pub email: String,
    pub course: String,
    pub enrollment_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub grade: String,
    pub attendance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StudentDraft {
    pub fn validate(&self) -> Result<(), StudentValidationError> {
        validate_fields(
            &self.name,
            &self.email,
            &self.course,
            &self.enrollment_date,
            &self.grade,
            self.attendance,
        )
    }

    /// Materializes a student with the store-assigned id.
    ///
    /// `default_avatar` is used when the draft carries no avatar.
    pub fn into_student(self, id: StudentId, default_avatar: &str) -> Student {
        Student {
            id,
            name: self.name,
            email: self.email,
            course: self.course,
            enrollment_date: self.enrollment_date,
            avatar: non_blank(self.avatar).unwrap_or_else(|| default_avatar.to_string()),
            grade: self.grade,
            attendance: self.attendance,
            bio: self.bio,
            phone: self.phone,
            address: self.address,
        }
    }
}

fn validate_fields(
    name: &str,
    email: &str,
    course: &str,
    enrollment_date: &str,
    grade: &str,
    attendance: u8,
) -> Result<(), StudentValidationError> {
    let required = [
        ("name", name),
        ("email", email),
        ("course", course),
        ("enrollment_date", enrollment_date),
        ("grade", grade),
    ];
    if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(StudentValidationError::MissingField(field));
    }
    if attendance > MAX_ATTENDANCE {
        return Err(StudentValidationError::AttendanceOutOfRange(attendance));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::{StudentDraft, StudentId, StudentValidationError};

    fn draft() -> StudentDraft {
        StudentDraft {
            name: "Ada Park".to_string(),
            email: "ada.park@example.com".to_string(),
            course: "Psychology".to_string(),
            enrollment_date: "2024-01-15".to_string(),
            avatar: None,
            grade: "B".to_string(),
            attendance: 80,
            bio: None,
            phone: None,
            address: None,
        }
    }

    #[test]
    fn draft_reports_first_blank_field() {
        let mut value = draft();
        value.email = "  ".to_string();
        value.grade = String::new();
        assert_eq!(
            value.validate(),
            Err(StudentValidationError::MissingField("email"))
        );
    }

    #[test]
    fn into_student_falls_back_to_default_avatar() {
        let mut value = draft();
        value.avatar = Some(" ".to_string());
        let student = value.into_student(StudentId::new("42"), "default.png");
        assert_eq!(student.avatar, "default.png");
        assert_eq!(student.id.as_str(), "42");
    }
}
