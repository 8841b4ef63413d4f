//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `roster_core` linkage.
//! - Print dashboard stats and a filtered roster of the sample dataset.
//!
//! Usage: `roster_cli [search text]`. Logs go to `$ROSTER_LOG_DIR` when set.

use log::info;
use roster_core::{init_logging, MockDataSource, RosterConfig, RosterSession, ViewFilter};
use std::process::ExitCode;

const LOG_DIR_ENV: &str = "ROSTER_LOG_DIR";

fn main() -> ExitCode {
    let config = RosterConfig::default();
    if let Ok(log_dir) = std::env::var(LOG_DIR_ENV) {
        if let Err(err) = init_logging(&config.log_level, &log_dir) {
            eprintln!("roster_cli logging disabled: {err}");
        }
    }

    println!("roster_core ping={}", roster_core::ping());
    println!("roster_core version={}", roster_core::core_version());

    let search_text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let mut session = RosterSession::open(MockDataSource::with_sample_data(), config);
    if let Err(err) = session.refresh() {
        eprintln!("roster_cli failed to load roster: {err}");
        return ExitCode::FAILURE;
    }

    let stats = session.stats();
    println!("students={}", stats.total_students);
    println!("courses={}", stats.total_courses);
    match stats.average_attendance {
        Some(average) => println!("average_attendance={average:.1}"),
        None => println!("average_attendance=n/a"),
    }
    let top_course = stats
        .top_course
        .as_ref()
        .and_then(|id| session.state().course(id))
        .map(|course| course.name.as_str())
        .unwrap_or("n/a");
    println!("top_course={top_course}");

    let filter = ViewFilter::all().with_search(search_text);
    let view = session.view(&filter);
    for student in &view {
        println!(
            "{}\t{}\t{}\t{}%",
            student.id, student.name, student.course, student.attendance
        );
    }
    info!(
        "event=cli_run module=cli status=ok matched={}",
        view.count()
    );
    ExitCode::SUCCESS
}
