//! SQLite-backed data source.
//!
//! # Responsibility
//! - Persist courses and students in the migrated roster schema.
//! - Publish every committed student write on the source's change feed.
//!
//! # Invariants
//! - Students are fetched in insertion order (`created_at`, then `rowid`).
//! - Inserted students get a UUID v4 id.
//! - A NULL or blank stored avatar is read back as the default avatar.
//! - Rows that violate the student model fail the fetch with
//!   `SourceError::InvalidData`; they are never silently dropped.

use crate::config::DEFAULT_AVATAR_URL;
use crate::db::{open_db, open_db_in_memory};
use crate::model::course::{Course, CourseId};
use crate::model::event::ChangeEvent;
use crate::model::student::{Student, StudentDraft, StudentId};
use crate::source::feed::{ChangeFeed, ChangeListener, Subscription};
use crate::source::{DataSource, SourceError, SourceResult};
use log::info;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use uuid::Uuid;

const STUDENT_SELECT_SQL: &str = "SELECT
    id, name, email, course, enrollment_date, avatar, grade, attendance,
    bio, phone, address
 FROM students
 ORDER BY created_at ASC, rowid ASC;";

const STUDENT_BY_ID_SQL: &str = "SELECT
    id, name, email, course, enrollment_date, avatar, grade, attendance,
    bio, phone, address
 FROM students
 WHERE id = ?1;";

const COURSE_SELECT_SQL: &str = "SELECT id, name, color
 FROM courses
 ORDER BY created_at ASC, rowid ASC;";

/// Data source over one migrated SQLite connection.
#[derive(Debug)]
pub struct SqliteDataSource {
    conn: Connection,
    feed: ChangeFeed,
    default_avatar: String,
}

impl SqliteDataSource {
    /// Wraps a connection that already has roster migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            feed: ChangeFeed::new(),
            default_avatar: DEFAULT_AVATAR_URL.to_string(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> SourceResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Overrides the avatar used for drafts and stored rows that carry none.
    pub fn with_default_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.default_avatar = avatar.into();
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Stores a course definition. Course names are unique.
    pub fn insert_course(&self, course: &Course) -> SourceResult<()> {
        if course.id.is_blank() || course.name.trim().is_empty() {
            return Err(SourceError::InvalidData(
                "course id and name must not be blank".to_string(),
            ));
        }
        self.conn.execute(
            "INSERT INTO courses (id, name, color) VALUES (?1, ?2, ?3);",
            params![course.id.as_str(), course.name, course.color],
        )?;
        Ok(())
    }

    /// Replaces every field of a stored student and publishes `Updated`.
    ///
    /// # Errors
    /// - `NotFound` when no row has the student's id.
    pub fn update_student(&self, student: &Student) -> SourceResult<()> {
        student.validate()?;
        let changed = self.conn.execute(
            "UPDATE students
             SET
                name = ?2,
                email = ?3,
                course = ?4,
                enrollment_date = ?5,
                avatar = ?6,
                grade = ?7,
                attendance = ?8,
                bio = ?9,
                phone = ?10,
                address = ?11,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                student.id.as_str(),
                student.name,
                student.email,
                student.course,
                student.enrollment_date,
                student.avatar,
                student.grade,
                student.attendance,
                student.bio,
                student.phone,
                student.address,
            ],
        )?;
        if changed == 0 {
            return Err(SourceError::NotFound(student.id.clone()));
        }
        self.feed.publish(ChangeEvent::Updated(student.clone()));
        Ok(())
    }

    /// Deletes a stored student and publishes `Deleted`.
    ///
    /// # Errors
    /// - `NotFound` when no row has `id`.
    pub fn delete_student(&self, id: &StudentId) -> SourceResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM students WHERE id = ?1;", params![id.as_str()])?;
        if changed == 0 {
            return Err(SourceError::NotFound(id.clone()));
        }
        self.feed.publish(ChangeEvent::Deleted(id.clone()));
        Ok(())
    }
}

impl DataSource for SqliteDataSource {
    fn fetch_all_students(&self) -> SourceResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(STUDENT_SELECT_SQL)?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row, &self.default_avatar)?);
        }
        Ok(students)
    }

    fn fetch_student(&self, id: &StudentId) -> SourceResult<Student> {
        let mut stmt = self.conn.prepare(STUDENT_BY_ID_SQL)?;
        let mut rows = stmt.query(params![id.as_str()])?;
        match rows.next()? {
            Some(row) => parse_student_row(row, &self.default_avatar),
            None => Err(SourceError::NotFound(id.clone())),
        }
    }

    fn fetch_all_courses(&self) -> SourceResult<Vec<Course>> {
        let mut stmt = self.conn.prepare(COURSE_SELECT_SQL)?;
        let courses = stmt
            .query_map([], |row| {
                let id: String = row.get("id")?;
                let name: String = row.get("name")?;
                let color: String = row.get("color")?;
                Ok(Course::new(CourseId::new(id), name, color))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(courses)
    }

    fn insert_student(&self, draft: &StudentDraft) -> SourceResult<Student> {
        draft.validate()?;
        let id = StudentId::new(Uuid::new_v4().to_string());
        let student = draft.clone().into_student(id, &self.default_avatar);
        self.conn.execute(
            "INSERT INTO students (
                id, name, email, course, enrollment_date, avatar, grade,
                attendance, bio, phone, address
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                student.id.as_str(),
                student.name,
                student.email,
                student.course,
                student.enrollment_date,
                student.avatar,
                student.grade,
                student.attendance,
                student.bio,
                student.phone,
                student.address,
            ],
        )?;
        self.feed.publish(ChangeEvent::Inserted(student.clone()));
        info!(
            "event=student_insert module=source status=ok backend=sqlite student_id={}",
            student.id
        );
        Ok(student)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.feed.subscribe(listener)
    }
}

fn parse_student_row(row: &Row<'_>, default_avatar: &str) -> SourceResult<Student> {
    let id: String = row.get("id")?;
    let attendance_raw: i64 = row.get("attendance")?;
    let attendance = u8::try_from(attendance_raw).map_err(|_| {
        SourceError::InvalidData(format!(
            "invalid attendance `{attendance_raw}` for student `{id}`"
        ))
    })?;

    let student = Student {
        id: StudentId::new(id),
        name: row.get("name")?,
        email: row.get("email")?,
        course: row.get("course")?,
        enrollment_date: row.get("enrollment_date")?,
        avatar: row
            .get::<_, Option<String>>("avatar")?
            .filter(|avatar| !avatar.trim().is_empty())
            .unwrap_or_else(|| default_avatar.to_string()),
        grade: row.get("grade")?,
        attendance,
        bio: row.get("bio")?,
        phone: row.get("phone")?,
        address: row.get("address")?,
    };
    student.validate().map_err(|err| {
        SourceError::InvalidData(format!("student `{}`: {err}", student.id))
    })?;
    Ok(student)
}
