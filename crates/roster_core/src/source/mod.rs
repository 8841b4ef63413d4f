//! Data source contracts and implementations.
//!
//! # Responsibility
//! - Define the seam between the roster and the store that owns records.
//! - Provide an in-memory mock store and a SQLite-backed store, both of
//!   which publish every committed student write on a [`ChangeFeed`].
//!
//! # Invariants
//! - Fetch failures surface as [`SourceError`]; they never touch roster state.
//! - Feed versions are assigned in commit order.

use crate::db::DbError;
use crate::model::course::Course;
use crate::model::student::{Student, StudentDraft, StudentId, StudentValidationError};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod feed;
pub mod mock;
pub mod payload;
pub mod sqlite;

pub use feed::{ChangeFeed, ChangeListener, Subscription};
pub use mock::MockDataSource;
pub use payload::{decode_change, PayloadError};
pub use sqlite::SqliteDataSource;

pub type SourceResult<T> = Result<T, SourceError>;

/// Data source error for fetches and writes.
#[derive(Debug)]
pub enum SourceError {
    /// Backend could not be reached.
    Unavailable(String),
    Db(DbError),
    /// Stored record violates the student or course model.
    InvalidData(String),
    /// Draft or record failed validation before the write.
    Rejected(StudentValidationError),
    NotFound(StudentId),
}

impl SourceError {
    /// Returns whether the error is a fetch failure to report to the user.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Db(_))
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "data source unavailable: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid stored roster data: {message}"),
            Self::Rejected(err) => write!(f, "student rejected: {err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Rejected(err) => Some(err),
            Self::Unavailable(_) | Self::InvalidData(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<DbError> for SourceError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SourceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<StudentValidationError> for SourceError {
    fn from(value: StudentValidationError) -> Self {
        Self::Rejected(value)
    }
}

/// Store that owns student and course records.
pub trait DataSource {
    fn fetch_all_students(&self) -> SourceResult<Vec<Student>>;
    /// Fetches one student.
    ///
    /// # Errors
    /// - `NotFound` when no student has `id`.
    fn fetch_student(&self, id: &StudentId) -> SourceResult<Student>;
    fn fetch_all_courses(&self) -> SourceResult<Vec<Course>>;
    /// Persists a draft and returns the stored student with its new id.
    ///
    /// The insert is also published on the change feed.
    fn insert_student(&self, draft: &StudentDraft) -> SourceResult<Student>;
    /// Registers a change listener for as long as the returned handle lives.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn fetch_all_students(&self) -> SourceResult<Vec<Student>> {
        (**self).fetch_all_students()
    }

    fn fetch_student(&self, id: &StudentId) -> SourceResult<Student> {
        (**self).fetch_student(id)
    }

    fn fetch_all_courses(&self) -> SourceResult<Vec<Course>> {
        (**self).fetch_all_courses()
    }

    fn insert_student(&self, draft: &StudentDraft) -> SourceResult<Student> {
        (**self).insert_student(draft)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        (**self).subscribe(listener)
    }
}
