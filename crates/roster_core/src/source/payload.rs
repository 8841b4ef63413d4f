//! Realtime wire payload decoding.
//!
//! # Responsibility
//! - Turn a hosted-backend change notification into a [`ChangeEvent`].
//!
//! # Invariants
//! - Row fields are snake_case; `id` may be a string or an integer.
//! - `INSERT` and `UPDATE` read the `new` row, `DELETE` reads only `old.id`.
//! - A missing or blank avatar falls back to the caller's default avatar.
//! - Decoded students pass [`Student::validate`].

use crate::model::event::ChangeEvent;
use crate::model::student::{Student, StudentId, StudentValidationError, MAX_ATTENDANCE};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

type Row = Map<String, Value>;

/// Wire payload decode error.
#[derive(Debug)]
pub enum PayloadError {
    Json(serde_json::Error),
    UnknownEventType(String),
    /// The `new` or `old` record required by the event type is absent.
    MissingRecord(&'static str),
    MissingField(&'static str),
    InvalidField {
        field: &'static str,
        message: String,
    },
    Invalid(StudentValidationError),
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "payload is not valid json: {err}"),
            Self::UnknownEventType(value) => write!(f, "unknown event type `{value}`"),
            Self::MissingRecord(record) => write!(f, "payload has no `{record}` record"),
            Self::MissingField(field) => write!(f, "row field `{field}` is missing"),
            Self::InvalidField { field, message } => {
                write!(f, "row field `{field}` is invalid: {message}")
            }
            Self::Invalid(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PayloadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::Invalid(err) => Some(err),
            Self::UnknownEventType(_)
            | Self::MissingRecord(_)
            | Self::MissingField(_)
            | Self::InvalidField { .. } => None,
        }
    }
}

impl From<serde_json::Error> for PayloadError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<StudentValidationError> for PayloadError {
    fn from(value: StudentValidationError) -> Self {
        Self::Invalid(value)
    }
}

#[derive(Debug, Deserialize)]
struct RawChange {
    #[serde(rename = "eventType")]
    event_type: String,
    #[serde(default)]
    new: Option<Row>,
    #[serde(default)]
    old: Option<Row>,
}

/// Decodes one realtime change payload.
///
/// # Errors
/// - `Json` for undecodable input.
/// - `UnknownEventType` for anything but `INSERT`, `UPDATE` or `DELETE`.
/// - `MissingRecord`, `MissingField` or `InvalidField` for incomplete rows.
/// - `Invalid` when the decoded student fails validation.
pub fn decode_change(raw: &str, default_avatar: &str) -> Result<ChangeEvent, PayloadError> {
    let change: RawChange = serde_json::from_str(raw)?;
    match change.event_type.as_str() {
        "INSERT" => {
            let row = non_empty_record(change.new, "new")?;
            Ok(ChangeEvent::Inserted(decode_student(&row, default_avatar)?))
        }
        "UPDATE" => {
            let row = non_empty_record(change.new, "new")?;
            Ok(ChangeEvent::Updated(decode_student(&row, default_avatar)?))
        }
        "DELETE" => {
            let row = non_empty_record(change.old, "old")?;
            Ok(ChangeEvent::Deleted(decode_id(&row)?))
        }
        other => Err(PayloadError::UnknownEventType(other.to_string())),
    }
}

fn non_empty_record(record: Option<Row>, name: &'static str) -> Result<Row, PayloadError> {
    match record {
        Some(row) if !row.is_empty() => Ok(row),
        _ => Err(PayloadError::MissingRecord(name)),
    }
}

fn decode_student(row: &Row, default_avatar: &str) -> Result<Student, PayloadError> {
    let student = Student {
        id: decode_id(row)?,
        name: required_text(row, "name")?,
        email: required_text(row, "email")?,
        course: required_text(row, "course")?,
        enrollment_date: required_text(row, "enrollment_date")?,
        avatar: optional_text(row, "avatar")?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| default_avatar.to_string()),
        grade: required_text(row, "grade")?,
        attendance: decode_attendance(row)?,
        bio: optional_text(row, "bio")?,
        phone: optional_text(row, "phone")?,
        address: optional_text(row, "address")?,
    };
    student.validate()?;
    Ok(student)
}

fn decode_id(row: &Row) -> Result<StudentId, PayloadError> {
    match row.get("id") {
        None | Some(Value::Null) => Err(PayloadError::MissingField("id")),
        Some(Value::String(text)) => Ok(StudentId::new(text.as_str())),
        Some(Value::Number(number)) if number.is_u64() || number.is_i64() => {
            Ok(StudentId::new(number.to_string()))
        }
        Some(other) => Err(PayloadError::InvalidField {
            field: "id",
            message: format!("expected string or integer, got `{other}`"),
        }),
    }
}

fn required_text(row: &Row, field: &'static str) -> Result<String, PayloadError> {
    optional_text(row, field)?.ok_or(PayloadError::MissingField(field))
}

fn optional_text(row: &Row, field: &'static str) -> Result<Option<String>, PayloadError> {
    match row.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(other) => Err(PayloadError::InvalidField {
            field,
            message: format!("expected string, got `{other}`"),
        }),
    }
}

fn decode_attendance(row: &Row) -> Result<u8, PayloadError> {
    let value = match row.get("attendance") {
        None | Some(Value::Null) => return Err(PayloadError::MissingField("attendance")),
        Some(Value::Number(number)) => number.as_f64(),
        Some(_) => None,
    };
    match value {
        Some(value) if (0.0..=f64::from(MAX_ATTENDANCE)).contains(&value) => {
            Ok(value.round() as u8)
        }
        _ => Err(PayloadError::InvalidField {
            field: "attendance",
            message: format!("expected a number between 0 and {MAX_ATTENDANCE}"),
        }),
    }
}
