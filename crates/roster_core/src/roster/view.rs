//! Filtered read-only projections of the roster.
//!
//! # Invariants
//! - Projections borrow the roster and never mutate it.
//! - Every iteration recomputes matches from the current entries.
//! - Course and search predicates compose with logical AND; empty values
//!   impose no restriction.

use crate::model::course::CourseId;
use crate::model::student::Student;
use crate::roster::state::{RosterEntry, RosterState};

/// Transient display filter. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewFilter {
    /// Restricts to students linked to this course. An unknown id matches
    /// nothing.
    pub course_id: Option<CourseId>,
    /// Case-insensitive substring matched against name, email and course.
    pub search_text: String,
}

impl ViewFilter {
    /// Filter that keeps every student.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course_id: impl Into<CourseId>) -> Self {
        self.course_id = Some(course_id.into());
        self
    }

    pub fn with_search(mut self, search_text: impl Into<String>) -> Self {
        self.search_text = search_text.into();
        self
    }
}

/// Lazy, restartable projection over a roster.
#[derive(Debug, Clone)]
pub struct RosterView<'a> {
    entries: &'a [RosterEntry],
    course_id: Option<CourseId>,
    /// Lowercased search text; `None` when the filter's text is empty.
    needle: Option<String>,
}

impl<'a> RosterView<'a> {
    fn new(entries: &'a [RosterEntry], filter: &ViewFilter) -> Self {
        let needle = if filter.search_text.is_empty() {
            None
        } else {
            Some(filter.search_text.to_lowercase())
        };
        Self {
            entries,
            course_id: filter.course_id.clone(),
            needle,
        }
    }

    /// Starts a fresh pass over the roster.
    pub fn iter(&self) -> RosterViewIter<'a, '_> {
        RosterViewIter {
            view: self,
            entries: self.entries.iter(),
        }
    }

    /// Counts matching students with a full pass.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn to_vec(&self) -> Vec<&'a Student> {
        self.iter().collect()
    }

    fn matches(&self, entry: &RosterEntry) -> bool {
        if let Some(course_id) = &self.course_id {
            if entry.course_id.as_ref() != Some(course_id) {
                return false;
            }
        }
        match &self.needle {
            Some(needle) => matches_search(&entry.student, needle),
            None => true,
        }
    }
}

impl<'a, 'v> IntoIterator for &'v RosterView<'a> {
    type Item = &'a Student;
    type IntoIter = RosterViewIter<'a, 'v>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`RosterView::iter`].
#[derive(Debug, Clone)]
pub struct RosterViewIter<'a, 'v> {
    view: &'v RosterView<'a>,
    entries: std::slice::Iter<'a, RosterEntry>,
}

impl<'a> Iterator for RosterViewIter<'a, '_> {
    type Item = &'a Student;

    fn next(&mut self) -> Option<Self::Item> {
        let view = self.view;
        self.entries
            .find(|entry| view.matches(entry))
            .map(|entry| &entry.student)
    }
}

impl RosterState {
    /// Projects the roster through `filter`.
    pub fn view(&self, filter: &ViewFilter) -> RosterView<'_> {
        RosterView::new(self.entries(), filter)
    }
}

fn matches_search(student: &Student, needle: &str) -> bool {
    [&student.name, &student.email, &student.course]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::matches_search;
    use crate::model::student::{Student, StudentId};

    #[test]
    fn search_matches_email_domain_and_course_text() {
        let student = Student {
            id: StudentId::new("1"),
            name: "Mina Cho".to_string(),
            email: "mina@campus.example".to_string(),
            course: "Data Science".to_string(),
            enrollment_date: "2024-01-01".to_string(),
            avatar: String::new(),
            grade: "A".to_string(),
            attendance: 99,
            bio: None,
            phone: None,
            address: None,
        };
        assert!(matches_search(&student, "campus"));
        assert!(matches_search(&student, "data sci"));
        assert!(!matches_search(&student, "design"));
    }
}
