use roster_core::source::mock::{sample_courses, sample_students};
use roster_core::{
    Anomaly, ApplyOutcome, ChangeEvent, DataSource, LoadStatus, MockDataSource, RosterConfig,
    RosterSession, SourceError, StudentDraft, StudentId, ViewFilter,
};

fn draft(name: &str) -> StudentDraft {
    StudentDraft {
        name: name.to_string(),
        email: "nia.park@example.com".to_string(),
        course: "Marketing".to_string(),
        enrollment_date: "2024-03-01".to_string(),
        avatar: None,
        grade: "B+".to_string(),
        attendance: 88,
        bio: None,
        phone: None,
        address: None,
    }
}

fn loaded_session(source: &MockDataSource) -> RosterSession<&MockDataSource> {
    let mut session = RosterSession::open(source, RosterConfig::default());
    let status = session.refresh().unwrap();
    assert!(status.is_applied());
    session
}

#[test]
fn refresh_loads_snapshot() {
    let source = MockDataSource::with_sample_data();
    let session = loaded_session(&source);

    assert!(session.is_loaded());
    assert_eq!(session.state().len(), 8);
    assert_eq!(session.stats().total_courses, 6);
    assert_eq!(
        session
            .view(&ViewFilter::all().with_search("liam"))
            .to_vec()
            .len(),
        1
    );
}

#[test]
fn stale_load_ticket_is_discarded() {
    let source = MockDataSource::with_sample_data();
    let mut session = RosterSession::open(&source, RosterConfig::default());

    let older = session.begin_load();
    let newer = session.begin_load();
    let applied = session.finish_load(newer, sample_students(), sample_courses());
    let stale = session.finish_load(older, Vec::new(), Vec::new());

    assert!(applied.is_applied());
    assert_eq!(
        stale,
        LoadStatus::Stale {
            ticket: older,
            current: newer.generation(),
        }
    );
    assert_eq!(session.state().len(), 8);
}

#[test]
fn failed_refresh_keeps_prior_state() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);
    let before = session.state().clone();

    source.set_unavailable(true);
    let err = session.refresh().unwrap_err();

    assert!(matches!(err, SourceError::Unavailable(_)));
    assert_eq!(session.state(), &before);
}

#[test]
fn events_after_failed_refresh_still_apply() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    source.set_unavailable(true);
    assert!(session.refresh().is_err());
    source.set_unavailable(false);
    source.delete_student(&StudentId::new("7")).unwrap();

    let report = session.pump();

    assert_eq!(report.applied, 1);
    assert_eq!(session.state().len(), 7);
}

#[test]
fn events_before_first_load_are_covered_by_snapshot() {
    let source = MockDataSource::with_sample_data();
    let mut session = RosterSession::open(&source, RosterConfig::default());
    source.delete_student(&StudentId::new("1")).unwrap();

    assert_eq!(session.pump().total(), 0);
    let status = session.refresh().unwrap();

    assert_eq!(
        status,
        LoadStatus::Applied {
            students: 7,
            courses: 6,
            dropped_events: 1,
        }
    );
    assert_eq!(session.pump().total(), 0);
}

#[test]
fn events_during_in_flight_load_wait_for_it() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    let ticket = session.begin_load();
    let snapshot = source.fetch_all_students().unwrap();
    source.delete_student(&StudentId::new("2")).unwrap();

    let report = session.pump();
    assert_eq!(report.deferred, 1);
    assert_eq!(session.state().len(), 8);

    session.finish_load(ticket, snapshot, sample_courses());
    let report = session.pump();

    assert_eq!(report.applied, 1);
    assert!(session.state().student(&StudentId::new("2")).is_none());
    assert_eq!(
        session
            .state()
            .course_by_name("Data Science")
            .unwrap()
            .student_count,
        1
    );
}

#[test]
fn pump_applies_events_in_delivery_order() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    let mut first = sample_students()[0].clone();
    first.grade = "B".to_string();
    source.update_student(first).unwrap();
    let mut second = sample_students()[0].clone();
    second.grade = "C".to_string();
    source.update_student(second).unwrap();
    source.delete_student(&StudentId::new("8")).unwrap();

    let report = session.pump();

    assert_eq!(report.applied, 3);
    assert_eq!(
        session.state().student(&StudentId::new("1")).unwrap().grade,
        "C"
    );
    assert_eq!(session.state().last_version(&StudentId::new("1")), Some(2));
    assert_eq!(session.state().len(), 7);
}

#[test]
fn add_student_applies_optimistically_and_absorbs_echo() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    let student = session.add_student(&draft("Nia Park")).unwrap();

    assert_eq!(student.id, StudentId::new("9"));
    assert_eq!(session.state().len(), 9);
    let report = session.pump();
    assert_eq!(report.applied, 0);
    assert_eq!(report.absorbed, 1);
    assert_eq!(
        session
            .state()
            .course_by_name("Marketing")
            .unwrap()
            .student_count,
        2
    );
}

#[test]
fn add_student_rejects_invalid_draft() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);
    let mut invalid = draft("Nia Park");
    invalid.attendance = 101;

    assert!(matches!(
        session.add_student(&invalid),
        Err(SourceError::Rejected(_))
    ));
    assert_eq!(session.state().len(), 8);
    assert_eq!(source.fetch_all_students().unwrap().len(), 8);
}

#[test]
fn undecodable_payload_becomes_anomaly() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);
    let before = session.state().clone();

    let outcome = session.receive_payload("{\"eventType\":\"INSERT\"\n");

    assert!(matches!(
        outcome,
        ApplyOutcome::Skipped(Anomaly::MalformedEvent { .. })
    ));
    assert_eq!(session.state(), &before);
    assert_eq!(session.anomalies().count(), 1);
    assert_eq!(session.take_anomalies().len(), 1);
    assert_eq!(session.anomalies().count(), 0);
}

#[test]
fn receive_payload_applies_decoded_delete() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    let outcome =
        session.receive_payload(r#"{"eventType":"DELETE","new":{},"old":{"id":"3"}}"#);

    assert_eq!(outcome, ApplyOutcome::Deleted(StudentId::new("3")));
    assert_eq!(session.state().len(), 7);
}

#[test]
fn unknown_reference_is_recorded() {
    let source = MockDataSource::with_sample_data();
    let mut session = loaded_session(&source);

    session.apply(ChangeEvent::Deleted(StudentId::new("404")));

    let anomalies = session.take_anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].code(), "unknown_reference");
}

#[test]
fn dropping_session_unsubscribes_listener() {
    let source = MockDataSource::with_sample_data();
    let session = RosterSession::open(source.clone(), RosterConfig::default());
    assert_eq!(source.feed().listener_count(), 1);

    drop(session);

    assert_eq!(source.feed().listener_count(), 0);
    source.delete_student(&StudentId::new("1")).unwrap();
}
