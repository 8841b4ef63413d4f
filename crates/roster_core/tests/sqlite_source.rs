use roster_core::source::mock::sample_courses;
use roster_core::{
    ChangeEvent, CourseId, DataSource, RosterConfig, RosterSession, SourceError,
    SqliteDataSource, StudentDraft, StudentId, ViewFilter,
};
use std::sync::{Arc, Mutex};

fn draft(name: &str, course: &str) -> StudentDraft {
    StudentDraft {
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
        course: course.to_string(),
        enrollment_date: "2024-02-20".to_string(),
        avatar: None,
        grade: "A-".to_string(),
        attendance: 94,
        bio: Some("Transfer student.".to_string()),
        phone: None,
        address: None,
    }
}

fn seeded_source() -> SqliteDataSource {
    let source = SqliteDataSource::open_in_memory().unwrap();
    for course in sample_courses() {
        source.insert_course(&course).unwrap();
    }
    source
}

#[test]
fn courses_round_trip_without_store_counts() {
    let source = seeded_source();

    let courses = source.fetch_all_courses().unwrap();

    assert_eq!(courses.len(), 6);
    assert_eq!(courses[0].id, CourseId::new("1"));
    assert_eq!(courses[0].name, "Computer Science");
    assert!(courses.iter().all(|course| course.student_count == 0));
}

#[test]
fn duplicate_course_name_is_rejected() {
    let source = seeded_source();
    let mut course = sample_courses().remove(0);
    course.id = CourseId::new("99");

    let err = source.insert_course(&course).unwrap_err();

    assert!(matches!(err, SourceError::Db(_)));
}

#[test]
fn inserted_students_get_uuid_ids_and_keep_insert_order() {
    let source = seeded_source();

    let first = source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();
    let second = source.insert_student(&draft("Ben Ode", "Marketing")).unwrap();

    assert!(uuid::Uuid::parse_str(first.id.as_str()).is_ok());
    assert_eq!(first.avatar, "https://github.com/shadcn.png");
    let stored = source.fetch_all_students().unwrap();
    assert_eq!(stored, vec![first, second]);
}

#[test]
fn custom_default_avatar_is_used() {
    let source = SqliteDataSource::open_in_memory()
        .unwrap()
        .with_default_avatar("https://example.com/blank.png");

    let student = source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();

    assert_eq!(student.avatar, "https://example.com/blank.png");
}

#[test]
fn update_and_delete_report_missing_rows() {
    let source = seeded_source();
    let student = source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();
    source.delete_student(&student.id).unwrap();

    assert!(matches!(
        source.update_student(&student),
        Err(SourceError::NotFound(_))
    ));
    assert!(matches!(
        source.delete_student(&student.id),
        Err(SourceError::NotFound(_))
    ));
}

#[test]
fn invalid_stored_row_fails_fetch() {
    let source = seeded_source();
    source
        .connection()
        .execute(
            "INSERT INTO students (id, name, email, course, enrollment_date, grade, attendance)
             VALUES ('x', '', 'x@example.com', 'Marketing', '2024-01-01', 'B', 80);",
            [],
        )
        .unwrap();

    let err = source.fetch_all_students().unwrap_err();

    assert!(matches!(err, SourceError::InvalidData(_)));
}

#[test]
fn writes_publish_change_events() {
    let source = seeded_source();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = source.subscribe(Box::new(move |event| {
        sink.lock().unwrap().push(event.clone());
    }));

    let student = source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();
    let mut moved = student.clone();
    moved.course = "Marketing".to_string();
    source.update_student(&moved).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].event, ChangeEvent::Inserted(student));
    assert_eq!(seen[1].version, 2);
    assert_eq!(seen[1].event, ChangeEvent::Updated(moved));
}

#[test]
fn sqlite_writes_flow_through_feed_into_session() {
    let source = seeded_source();
    source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();
    let mut session = RosterSession::open(&source, RosterConfig::default());
    session.refresh().unwrap();

    let added = source.insert_student(&draft("Ben Ode", "Marketing")).unwrap();
    let mut moved = added.clone();
    moved.course = "Psychology".to_string();
    source.update_student(&moved).unwrap();
    let report = session.pump();

    assert_eq!(report.applied, 2);
    assert_eq!(session.state().len(), 2);
    assert_eq!(
        session
            .state()
            .course_by_name("Psychology")
            .unwrap()
            .student_count,
        2
    );
    assert_eq!(
        session
            .view(&ViewFilter::all().with_course("5"))
            .count(),
        2
    );
}

#[test]
fn file_backed_source_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roster.db");

    let source = SqliteDataSource::open(&path).unwrap();
    source.insert_course(&sample_courses().remove(0)).unwrap();
    let student = source
        .insert_student(&draft("Ana Ruiz", "Computer Science"))
        .unwrap();
    drop(source);

    let reopened = SqliteDataSource::open(&path).unwrap();
    assert_eq!(reopened.fetch_all_students().unwrap(), vec![student]);
    assert_eq!(reopened.fetch_all_courses().unwrap().len(), 1);
}

#[test]
fn stored_row_without_avatar_reads_back_default() {
    let source = seeded_source();
    source
        .connection()
        .execute(
            "INSERT INTO students (id, name, email, course, enrollment_date, avatar, grade, attendance)
             VALUES ('a', 'Ana Ruiz', 'ana.ruiz@example.com', 'Marketing', '2024-01-01', NULL, 'B', 80),
                    ('b', 'Ben Ode', 'ben.ode@example.com', 'Marketing', '2024-01-02', '  ', 'A', 90);",
            [],
        )
        .unwrap();

    let students = source.fetch_all_students().unwrap();

    assert_eq!(students.len(), 2);
    assert!(students
        .iter()
        .all(|student| student.avatar == "https://github.com/shadcn.png"));
}

#[test]
fn fetch_student_returns_row_or_not_found() {
    let source = seeded_source();
    let student = source.insert_student(&draft("Ana Ruiz", "Psychology")).unwrap();

    assert_eq!(source.fetch_student(&student.id).unwrap(), student);
    assert!(matches!(
        source.fetch_student(&StudentId::new("missing")),
        Err(SourceError::NotFound(id)) if id.as_str() == "missing"
    ));
}

#[test]
fn stored_row_without_avatar_uses_configured_default() {
    let source = seeded_source().with_default_avatar("https://cdn.example.com/blank.png");
    source
        .connection()
        .execute(
            "INSERT INTO students (id, name, email, course, enrollment_date, grade, attendance)
             VALUES ('a', 'Ana Ruiz', 'ana.ruiz@example.com', 'Marketing', '2024-01-01', 'B', 80);",
            [],
        )
        .unwrap();

    let student = source.fetch_student(&StudentId::new("a")).unwrap();

    assert_eq!(student.avatar, "https://cdn.example.com/blank.png");
}
