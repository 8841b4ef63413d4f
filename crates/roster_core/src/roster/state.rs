//! Roster state and change reconciliation.
//!
//! # Responsibility
//! - Hold the local student list in delivery order plus derived course counts.
//! - Apply change feed events with idempotent, non-panicking semantics.
//!
//! # Invariants
//! - Student ids are unique within `entries`.
//! - Every course's `student_count` equals the number of entries linked to it.
//! - A student's course link is resolved by name when it enters the roster
//!   and held by `CourseId` afterwards.
//! - Counts saturate at zero; they never underflow.

use crate::model::course::{Course, CourseId};
use crate::model::event::{ChangeEvent, ChangeKind, VersionedEvent};
use crate::model::student::{Student, StudentId};
use crate::roster::anomaly::Anomaly;
use log::{debug, info, warn};
use std::collections::{HashMap, HashSet};

/// Student record with its resolved course link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RosterEntry {
    pub(crate) student: Student,
    pub(crate) course_id: Option<CourseId>,
}

/// Result of applying one change event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Inserted(StudentId),
    /// `course_changed` is true when the student moved to another linked
    /// course (or in/out of the orphaned category).
    Updated {
        id: StudentId,
        course_changed: bool,
    },
    Deleted(StudentId),
    /// Repeated delivery of an already-applied insert or version.
    Duplicate(StudentId),
    /// Update payload identical to the held record.
    Unchanged(StudentId),
    Skipped(Anomaly),
}

impl ApplyOutcome {
    /// Returns whether the roster was mutated.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Self::Inserted(_) | Self::Updated { .. } | Self::Deleted(_)
        )
    }

    pub fn anomaly(&self) -> Option<&Anomaly> {
        match self {
            Self::Skipped(anomaly) => Some(anomaly),
            _ => None,
        }
    }
}

/// Client-local roster cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterState {
    entries: Vec<RosterEntry>,
    courses: Vec<Course>,
    course_by_name: HashMap<String, CourseId>,
    /// Last applied feed version per student, deletes included.
    versions: HashMap<StudentId, u64>,
}

impl RosterState {
    /// Creates an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from a full snapshot.
    ///
    /// Course counts supplied by the store are discarded and recomputed by
    /// grouping students on their `course` name. Students whose course name
    /// matches no course stay in the roster unlinked.
    ///
    /// # Contract
    /// - Repeated student ids keep the first occurrence.
    /// - When two courses share a name, only the first is linked by it.
    pub fn load(students: Vec<Student>, mut courses: Vec<Course>) -> Self {
        let mut course_by_name = HashMap::with_capacity(courses.len());
        for course in &mut courses {
            course.student_count = 0;
            if course_by_name.contains_key(&course.name) {
                warn!(
                    "event=roster_load module=roster status=degraded error_code=duplicate_course_name course_id={}",
                    course.id
                );
                continue;
            }
            course_by_name.insert(course.name.clone(), course.id.clone());
        }

        let mut state = Self {
            entries: Vec::with_capacity(students.len()),
            courses,
            course_by_name,
            versions: HashMap::new(),
        };

        let mut seen = HashSet::with_capacity(students.len());
        let mut orphaned = 0_usize;
        let mut duplicates = 0_usize;
        for student in students {
            if !seen.insert(student.id.clone()) {
                duplicates += 1;
                continue;
            }
            let course_id = state.resolve_course(&student.course);
            match &course_id {
                Some(id) => state.increment(id),
                None => orphaned += 1,
            }
            state.entries.push(RosterEntry { student, course_id });
        }

        info!(
            "event=roster_load module=roster status=ok students={} courses={} orphaned={} duplicates_dropped={}",
            state.entries.len(),
            state.courses.len(),
            orphaned,
            duplicates
        );
        state
    }

    /// Applies one unversioned change event.
    ///
    /// # Contract
    /// - `Inserted` of a present id is absorbed as `Duplicate`.
    /// - `Updated`/`Deleted` of an absent id is skipped as `UnknownReference`.
    /// - Events carrying an invalid student are skipped as `MalformedEvent`.
    pub fn apply(&mut self, event: ChangeEvent) -> ApplyOutcome {
        let kind = event.kind();
        let outcome = match event {
            ChangeEvent::Inserted(student) => self.apply_insert(student),
            ChangeEvent::Updated(student) => self.apply_update(student, false),
            ChangeEvent::Deleted(id) => self.apply_delete(id),
        };
        log_outcome(kind, None, &outcome);
        outcome
    }

    /// Applies one versioned change event with last-writer-wins per student.
    ///
    /// # Contract
    /// - A version equal to the last applied one is a `Duplicate`.
    /// - A lower version is skipped as `StaleVersion`.
    /// - `Updated` for an absent student is applied as an insert.
    /// - Deletes record their version, so older inserts stay dropped.
    pub fn apply_versioned(&mut self, versioned: VersionedEvent) -> ApplyOutcome {
        let VersionedEvent { version, event } = versioned;
        let kind = event.kind();
        let id = event.student_id().clone();

        if let Some(&last_applied) = self.versions.get(&id) {
            let outcome = if version == last_applied {
                Some(ApplyOutcome::Duplicate(id.clone()))
            } else if version < last_applied {
                Some(ApplyOutcome::Skipped(Anomaly::StaleVersion {
                    id: id.clone(),
                    version,
                    last_applied,
                }))
            } else {
                None
            };
            if let Some(outcome) = outcome {
                log_outcome(kind, Some(version), &outcome);
                return outcome;
            }
        }

        let outcome = match event {
            ChangeEvent::Inserted(student) => self.apply_insert(student),
            ChangeEvent::Updated(student) => self.apply_update(student, true),
            ChangeEvent::Deleted(id) => self.apply_delete(id),
        };
        if !matches!(
            outcome,
            ApplyOutcome::Skipped(Anomaly::MalformedEvent { .. })
        ) {
            self.versions.insert(id, version);
        }
        log_outcome(kind, Some(version), &outcome);
        outcome
    }

    /// Renames a course while keeping every linked student attached.
    ///
    /// Linked students get their display `course` text rewritten. Unlinked
    /// students whose text equals the new name become linked. When another
    /// course still carries the old name, it takes over that name and the
    /// unlinked students whose text matches it.
    ///
    /// Returns the number of students newly linked to the renamed course.
    pub fn rename_course(
        &mut self,
        id: &CourseId,
        new_name: impl Into<String>,
    ) -> Result<usize, Anomaly> {
        let new_name = new_name.into();
        let Some(index) = self.courses.iter().position(|course| &course.id == id) else {
            return Err(Anomaly::UnknownCourse(id.clone()));
        };
        if let Some(owner) = self.course_by_name.get(&new_name) {
            if owner != id {
                return Err(Anomaly::CourseNameTaken(new_name));
            }
        }

        let old_name = std::mem::replace(&mut self.courses[index].name, new_name.clone());
        let released_old_name = self.course_by_name.get(&old_name) == Some(id);
        if released_old_name {
            self.course_by_name.remove(&old_name);
        }
        self.course_by_name.insert(new_name.clone(), id.clone());

        let mut relinked = 0_u32;
        for entry in &mut self.entries {
            if entry.course_id.as_ref() == Some(id) {
                entry.student.course = new_name.clone();
            } else if entry.course_id.is_none() && entry.student.course == new_name {
                entry.course_id = Some(id.clone());
                relinked += 1;
            }
        }
        let course = &mut self.courses[index];
        course.student_count = course.student_count.saturating_add(relinked);

        let handed_over = if released_old_name {
            self.reindex_name(&old_name)
        } else {
            0
        };

        info!(
            "event=course_rename module=roster status=ok course_id={} relinked={} handed_over={}",
            id, relinked, handed_over
        );
        Ok(relinked as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates students in roster order.
    pub fn students(&self) -> impl Iterator<Item = &Student> + '_ {
        self.entries.iter().map(|entry| &entry.student)
    }

    pub fn student(&self, id: &StudentId) -> Option<&Student> {
        self.entries
            .iter()
            .find(|entry| &entry.student.id == id)
            .map(|entry| &entry.student)
    }

    /// Returns courses in load order.
    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, id: &CourseId) -> Option<&Course> {
        self.courses.iter().find(|course| &course.id == id)
    }

    pub fn course_by_name(&self, name: &str) -> Option<&Course> {
        let id = self.course_by_name.get(name)?;
        self.course(id)
    }

    /// Returns the course a student is linked to, if any.
    pub fn linked_course(&self, id: &StudentId) -> Option<&CourseId> {
        self.entries
            .iter()
            .find(|entry| &entry.student.id == id)
            .and_then(|entry| entry.course_id.as_ref())
    }

    /// Returns the last feed version applied to a student.
    pub fn last_version(&self, id: &StudentId) -> Option<u64> {
        self.versions.get(id).copied()
    }

    pub(crate) fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    fn apply_insert(&mut self, student: Student) -> ApplyOutcome {
        if let Err(reason) = student.validate() {
            return ApplyOutcome::Skipped(Anomaly::malformed(
                Some(ChangeKind::Insert),
                non_blank_id(&student.id),
                reason,
            ));
        }
        if self.position(&student.id).is_some() {
            return ApplyOutcome::Duplicate(student.id);
        }

        let course_id = self.resolve_course(&student.course);
        if let Some(course_id) = &course_id {
            self.increment(course_id);
        }
        let id = student.id.clone();
        self.entries.push(RosterEntry { student, course_id });
        ApplyOutcome::Inserted(id)
    }

    fn apply_update(&mut self, student: Student, upsert: bool) -> ApplyOutcome {
        if let Err(reason) = student.validate() {
            return ApplyOutcome::Skipped(Anomaly::malformed(
                Some(ChangeKind::Update),
                non_blank_id(&student.id),
                reason,
            ));
        }
        let Some(index) = self.position(&student.id) else {
            if upsert {
                return self.apply_insert(student);
            }
            return ApplyOutcome::Skipped(Anomaly::UnknownReference {
                kind: ChangeKind::Update,
                id: student.id,
            });
        };

        let current = &self.entries[index];
        if current.student == student {
            return ApplyOutcome::Unchanged(student.id);
        }

        let old_course = current.course_id.clone();
        let new_course = if current.student.course == student.course {
            old_course.clone()
        } else {
            self.resolve_course(&student.course)
        };
        let course_changed = old_course != new_course;
        if course_changed {
            if let Some(old) = &old_course {
                self.decrement(old);
            }
            if let Some(new) = &new_course {
                self.increment(new);
            }
        }

        let id = student.id.clone();
        self.entries[index] = RosterEntry {
            student,
            course_id: new_course,
        };
        ApplyOutcome::Updated { id, course_changed }
    }

    fn apply_delete(&mut self, id: StudentId) -> ApplyOutcome {
        let Some(index) = self.position(&id) else {
            return ApplyOutcome::Skipped(Anomaly::UnknownReference {
                kind: ChangeKind::Delete,
                id,
            });
        };

        let entry = self.entries.remove(index);
        if let Some(course_id) = &entry.course_id {
            self.decrement(course_id);
        }
        ApplyOutcome::Deleted(id)
    }

    /// Indexes the first course still named `name` and links the unlinked
    /// students whose text matches it. Returns the number linked.
    fn reindex_name(&mut self, name: &str) -> u32 {
        let Some(successor) = self
            .courses
            .iter()
            .find(|course| course.name == name)
            .map(|course| course.id.clone())
        else {
            return 0;
        };
        self.course_by_name.insert(name.to_string(), successor.clone());

        let mut linked = 0_u32;
        for entry in &mut self.entries {
            if entry.course_id.is_none() && entry.student.course == name {
                entry.course_id = Some(successor.clone());
                linked += 1;
            }
        }
        if let Some(course) = self.courses.iter_mut().find(|course| course.id == successor) {
            course.student_count = course.student_count.saturating_add(linked);
        }
        linked
    }

    fn position(&self, id: &StudentId) -> Option<usize> {
        self.entries.iter().position(|entry| &entry.student.id == id)
    }

    fn resolve_course(&self, name: &str) -> Option<CourseId> {
        self.course_by_name.get(name).cloned()
    }

    fn increment(&mut self, id: &CourseId) {
        if let Some(course) = self.courses.iter_mut().find(|course| &course.id == id) {
            course.student_count = course.student_count.saturating_add(1);
        }
    }

    fn decrement(&mut self, id: &CourseId) {
        if let Some(course) = self.courses.iter_mut().find(|course| &course.id == id) {
            course.student_count = course.student_count.saturating_sub(1);
        }
    }
}

fn non_blank_id(id: &StudentId) -> Option<StudentId> {
    (!id.is_blank()).then(|| id.clone())
}

fn log_outcome(kind: ChangeKind, version: Option<u64>, outcome: &ApplyOutcome) {
    let version = version.map_or_else(|| "none".to_string(), |value| value.to_string());
    match outcome {
        ApplyOutcome::Skipped(anomaly) => warn!(
            "event=roster_apply module=roster status=skipped kind={} version={} error_code={}",
            kind.as_str(),
            version,
            anomaly.code()
        ),
        ApplyOutcome::Duplicate(id) | ApplyOutcome::Unchanged(id) => debug!(
            "event=roster_apply module=roster status=noop kind={} version={} student_id={}",
            kind.as_str(),
            version,
            id
        ),
        ApplyOutcome::Inserted(id)
        | ApplyOutcome::Updated { id, .. }
        | ApplyOutcome::Deleted(id) => debug!(
            "event=roster_apply module=roster status=ok kind={} version={} student_id={}",
            kind.as_str(),
            version,
            id
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::RosterState;
    use crate::model::course::Course;
    use crate::model::event::ChangeEvent;
    use crate::model::student::{Student, StudentId};

    fn student(id: &str, course: &str) -> Student {
        Student {
            id: StudentId::new(id),
            name: format!("Student {id}"),
            email: format!("s{id}@example.com"),
            course: course.to_string(),
            enrollment_date: "2024-02-01".to_string(),
            avatar: String::new(),
            grade: "B".to_string(),
            attendance: 90,
            bio: None,
            phone: None,
            address: None,
        }
    }

    #[test]
    fn load_ignores_store_supplied_counts() {
        let mut course = Course::new("c1", "Chemistry", "#000000");
        course.student_count = 40;
        let state = RosterState::load(vec![student("1", "Chemistry")], vec![course]);
        assert_eq!(state.courses()[0].student_count, 1);
    }

    #[test]
    fn duplicate_course_names_link_to_first_course() {
        let state = RosterState::load(
            vec![student("1", "Art")],
            vec![
                Course::new("a", "Art", "#111111"),
                Course::new("b", "Art", "#222222"),
            ],
        );
        assert_eq!(state.courses()[0].student_count, 1);
        assert_eq!(state.courses()[1].student_count, 0);
    }

    #[test]
    fn update_keeps_link_when_course_text_is_unchanged() {
        let mut state = RosterState::load(
            vec![student("1", "Art")],
            vec![Course::new("a", "Art", "#111111")],
        );
        let mut changed = student("1", "Art");
        changed.grade = "A".to_string();
        state.apply(ChangeEvent::Updated(changed));
        assert_eq!(state.linked_course(&StudentId::new("1")).unwrap().as_str(), "a");
    }
}
