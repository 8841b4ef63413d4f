use roster_core::source::mock::{sample_courses, sample_students};
use roster_core::{Course, CourseId, RosterState, Student, StudentId};

#[test]
fn load_recomputes_course_counts_from_students() {
    let state = RosterState::load(sample_students(), sample_courses());

    assert_eq!(state.len(), 8);
    assert_eq!(count_of(&state, "Computer Science"), 2);
    assert_eq!(count_of(&state, "Data Science"), 2);
    assert_eq!(count_of(&state, "Graphic Design"), 1);
    assert_eq!(count_of(&state, "Business Administration"), 1);
    assert_eq!(count_of(&state, "Psychology"), 1);
    assert_eq!(count_of(&state, "Marketing"), 1);
}

#[test]
fn counts_sum_to_linked_students_only() {
    let mut students = sample_students();
    students[0].course = "Astronomy".to_string();
    students[3].course = "computer science".to_string();

    let state = RosterState::load(students, sample_courses());
    let total: u32 = state
        .courses()
        .iter()
        .map(|course| course.student_count)
        .sum();

    assert_eq!(state.len(), 8);
    assert_eq!(total, 6);
    assert!(state.linked_course(&StudentId::new("1")).is_none());
    assert!(state.linked_course(&StudentId::new("4")).is_none());
}

#[test]
fn load_keeps_first_of_repeated_student_ids() {
    let mut students = sample_students();
    let mut repeat = students[1].clone();
    repeat.name = "Second Liam".to_string();
    students.push(repeat);

    let state = RosterState::load(students, sample_courses());

    assert_eq!(state.len(), 8);
    assert_eq!(
        state.student(&StudentId::new("2")).unwrap().name,
        "Liam Smith"
    );
    assert_eq!(count_of(&state, "Data Science"), 2);
}

#[test]
fn load_preserves_source_order() {
    let state = RosterState::load(sample_students(), sample_courses());
    let ids: Vec<&str> = state.students().map(|student| student.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7", "8"]);
}

#[test]
fn empty_load_yields_zero_counts() {
    let state = RosterState::load(Vec::<Student>::new(), sample_courses());
    assert!(state.is_empty());
    assert!(state.courses().iter().all(|course| course.student_count == 0));
}

#[test]
fn course_lookup_by_id_and_name() {
    let state = RosterState::load(
        sample_students(),
        vec![Course::new("c-psy", "Psychology", "#EC4899")],
    );
    assert_eq!(
        state.course_by_name("Psychology").unwrap().id,
        CourseId::new("c-psy")
    );
    assert_eq!(state.course(&CourseId::new("c-psy")).unwrap().student_count, 1);
    assert!(state.course_by_name("psychology").is_none());
}

fn count_of(state: &RosterState, name: &str) -> u32 {
    state.course_by_name(name).unwrap().student_count
}
