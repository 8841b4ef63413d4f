//! Core roster reconciliation logic for the student dashboard.
//! This crate is the single source of truth for roster invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod roster;
pub mod service;
pub mod source;

pub use config::RosterConfig;
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::course::{Course, CourseId};
pub use model::event::{ChangeEvent, ChangeKind, VersionedEvent};
pub use model::student::{Student, StudentDraft, StudentId, StudentValidationError};
pub use roster::{Anomaly, ApplyOutcome, RosterState, RosterStats, RosterView, ViewFilter};
pub use service::{LoadStatus, LoadTicket, PumpReport, RosterSession};
pub use source::{
    decode_change, ChangeFeed, DataSource, MockDataSource, PayloadError, SourceError,
    SourceResult, SqliteDataSource, Subscription,
};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
