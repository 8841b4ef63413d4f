//! Dashboard aggregates derived from the roster.

use crate::model::course::CourseId;
use crate::roster::state::RosterState;
use std::collections::HashMap;

/// Header figures for the roster dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterStats {
    pub total_students: usize,
    pub total_courses: usize,
    /// Mean attendance percentage; `None` for an empty roster.
    pub average_attendance: Option<f64>,
    /// Linked course with the highest mean attendance.
    pub top_course: Option<CourseId>,
}

impl RosterState {
    /// Computes dashboard aggregates with a full pass over the roster.
    ///
    /// Top course ties are broken by more students, then by name ascending.
    pub fn stats(&self) -> RosterStats {
        let mut attendance_total = 0_u64;
        let mut per_course: HashMap<&CourseId, (u64, u64)> = HashMap::new();
        for entry in self.entries() {
            let attendance = u64::from(entry.student.attendance);
            attendance_total += attendance;
            if let Some(course_id) = &entry.course_id {
                let slot = per_course.entry(course_id).or_insert((0, 0));
                slot.0 += attendance;
                slot.1 += 1;
            }
        }

        let average_attendance =
            (!self.is_empty()).then(|| attendance_total as f64 / self.len() as f64);

        let top_course = self
            .courses()
            .iter()
            .filter_map(|course| {
                let (sum, count) = per_course.get(&course.id)?;
                Some((course, *sum as f64 / *count as f64, *count))
            })
            .max_by(|left, right| {
                left.1
                    .total_cmp(&right.1)
                    .then(left.2.cmp(&right.2))
                    .then_with(|| right.0.name.cmp(&left.0.name))
            })
            .map(|(course, _, _)| course.id.clone());

        RosterStats {
            total_students: self.len(),
            total_courses: self.courses().len(),
            average_attendance,
            top_course,
        }
    }
}
