//! Roster session: one data source, one subscription, one roster.
//!
//! # Responsibility
//! - Own the roster state, the change subscription and the load generation.
//! - Serialize snapshot loads and queued change events on the owning thread.
//! - Keep a bounded history of reported anomalies.
//!
//! # Invariants
//! - Feed listeners only enqueue; every state mutation happens in `&mut self`
//!   methods.
//! - Each queued event is stamped with the generation current at receipt.
//!   Events stamped before the applied load are dropped, because the load's
//!   snapshot already reflects them.
//! - Events stamped for a load still in flight wait until that load lands
//!   or is abandoned.
//! - A stale load ticket never replaces newer state.
//! - A failed fetch leaves state untouched.
//! - Dropping the session unsubscribes its listener.

use crate::config::RosterConfig;
use crate::logging::sanitize_message;
use crate::model::course::{Course, CourseId};
use crate::model::event::{ChangeEvent, VersionedEvent};
use crate::model::student::{Student, StudentDraft};
use crate::roster::{Anomaly, ApplyOutcome, RosterState, RosterStats, RosterView, ViewFilter};
use crate::source::{decode_change, DataSource, SourceResult, Subscription};
use log::{error, info, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Instant;

const MAX_LOGGED_PAYLOAD_CHARS: usize = 160;

/// Handle for one snapshot load, issued by [`RosterSession::begin_load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Result of [`RosterSession::finish_load`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Snapshot replaced the roster.
    Applied {
        students: usize,
        courses: usize,
        /// Queued events discarded because the snapshot already covers them.
        dropped_events: usize,
    },
    /// A newer load was started; the snapshot was discarded.
    Stale { ticket: LoadTicket, current: u64 },
}

impl LoadStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Counters for one [`RosterSession::pump`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Events that changed the roster.
    pub applied: usize,
    /// Duplicate or no-op deliveries.
    pub absorbed: usize,
    /// Events skipped with an anomaly.
    pub skipped: usize,
    /// Events dropped because a newer load superseded them.
    pub stale_generation: usize,
    /// Events held back until an in-flight load lands.
    pub deferred: usize,
}

impl PumpReport {
    pub fn total(&self) -> usize {
        self.applied + self.absorbed + self.skipped + self.stale_generation
    }
}

#[derive(Debug)]
struct Inbound {
    generation: u64,
    event: VersionedEvent,
}

/// Explicit roster context bound to one data source.
pub struct RosterSession<S: DataSource> {
    source: S,
    config: RosterConfig,
    state: RosterState,
    generation: Arc<AtomicU64>,
    /// Generation of the last applied load; `0` before the first load.
    loaded_generation: u64,
    /// Generation of the load started but not yet finished or abandoned.
    in_flight: Option<u64>,
    inbox: Receiver<Inbound>,
    pending: VecDeque<Inbound>,
    anomalies: VecDeque<Anomaly>,
    _subscription: Subscription,
}

impl<S: DataSource> RosterSession<S> {
    /// Subscribes to `source` and returns an empty, unloaded session.
    pub fn open(source: S, config: RosterConfig) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (sender, inbox) = mpsc::channel();
        let stamp = Arc::clone(&generation);
        let subscription = source.subscribe(Box::new(move |event: &VersionedEvent| {
            let inbound = Inbound {
                generation: stamp.load(Ordering::SeqCst),
                event: event.clone(),
            };
            // Receiver is gone only while the session is being dropped.
            let _ = sender.send(inbound);
        }));
        info!("event=session_open module=service status=ok");
        Self {
            source,
            config,
            state: RosterState::new(),
            generation,
            loaded_generation: 0,
            in_flight: None,
            inbox,
            pending: VecDeque::new(),
            anomalies: VecDeque::new(),
            _subscription: subscription,
        }
    }

    /// Starts a snapshot load. Tickets from earlier calls become stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.in_flight = Some(generation);
        LoadTicket { generation }
    }

    /// Gives up on a load whose fetch failed.
    ///
    /// Events held back for it become applicable to the current roster.
    pub fn abandon_load(&mut self, ticket: LoadTicket) {
        if self.in_flight == Some(ticket.generation) {
            self.in_flight = None;
        }
    }

    /// Replaces the roster with a fetched snapshot unless `ticket` is stale.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        students: Vec<Student>,
        courses: Vec<Course>,
    ) -> LoadStatus {
        let current = self.generation.load(Ordering::SeqCst);
        if ticket.generation != current {
            warn!(
                "event=session_load module=service status=skipped error_code=stale_ticket ticket={} current={}",
                ticket.generation, current
            );
            return LoadStatus::Stale { ticket, current };
        }

        self.state = RosterState::load(students, courses);
        self.loaded_generation = ticket.generation;
        self.in_flight = None;
        self.collect_inbox();
        let before = self.pending.len();
        self.pending
            .retain(|inbound| inbound.generation >= ticket.generation);
        let dropped_events = before - self.pending.len();

        info!(
            "event=session_load module=service status=ok generation={} students={} courses={} dropped_events={}",
            ticket.generation,
            self.state.len(),
            self.state.courses().len(),
            dropped_events
        );
        LoadStatus::Applied {
            students: self.state.len(),
            courses: self.state.courses().len(),
            dropped_events,
        }
    }

    /// Fetches a fresh snapshot from the source and loads it.
    ///
    /// # Errors
    /// - Any fetch error. The roster keeps its previous state.
    pub fn refresh(&mut self) -> SourceResult<LoadStatus> {
        let started_at = Instant::now();
        let ticket = self.begin_load();
        match self.fetch_snapshot() {
            Ok((students, courses)) => {
                let status = self.finish_load(ticket, students, courses);
                info!(
                    "event=session_refresh module=service status=ok generation={} duration_ms={}",
                    ticket.generation,
                    started_at.elapsed().as_millis()
                );
                Ok(status)
            }
            Err(err) => {
                self.abandon_load(ticket);
                error!(
                    "event=session_refresh module=service status=error generation={} duration_ms={} fetch_failure={} error={}",
                    ticket.generation,
                    started_at.elapsed().as_millis(),
                    err.is_fetch_failure(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Applies queued feed events in delivery order.
    ///
    /// Does nothing before the first load; queued events wait for it.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        if self.loaded_generation == 0 {
            return report;
        }
        self.collect_inbox();

        while let Some(inbound) = self.pending.front() {
            if self.awaits_load(inbound.generation) {
                report.deferred = self.pending.len();
                break;
            }
            let Some(inbound) = self.pending.pop_front() else {
                break;
            };
            if inbound.generation < self.loaded_generation {
                report.stale_generation += 1;
                continue;
            }
            let outcome = self.state.apply_versioned(inbound.event);
            match &outcome {
                outcome if outcome.is_change() => report.applied += 1,
                ApplyOutcome::Skipped(_) => report.skipped += 1,
                _ => report.absorbed += 1,
            }
            self.record(outcome);
        }
        report
    }

    /// Applies one unversioned event directly.
    pub fn apply(&mut self, event: ChangeEvent) -> ApplyOutcome {
        let outcome = self.state.apply(event);
        self.record(outcome.clone());
        outcome
    }

    /// Decodes a realtime wire payload and applies it.
    ///
    /// Undecodable payloads are recorded as `MalformedEvent` anomalies.
    pub fn receive_payload(&mut self, raw: &str) -> ApplyOutcome {
        match decode_change(raw, &self.config.default_avatar) {
            Ok(event) => self.apply(event),
            Err(err) => {
                warn!(
                    "event=payload_decode module=service status=skipped error_code=malformed_event error={} payload={}",
                    err,
                    sanitize_message(raw, MAX_LOGGED_PAYLOAD_CHARS)
                );
                let outcome = ApplyOutcome::Skipped(Anomaly::malformed(None, None, err));
                self.record(outcome.clone());
                outcome
            }
        }
    }

    /// Inserts a draft through the source and applies it optimistically.
    ///
    /// The feed echo of the insert is later absorbed as a duplicate.
    ///
    /// # Errors
    /// - `Rejected` when the draft fails validation.
    /// - Any source write error. The roster is left untouched.
    pub fn add_student(&mut self, draft: &StudentDraft) -> SourceResult<Student> {
        draft.validate()?;
        let student = match self.source.insert_student(draft) {
            Ok(student) => student,
            Err(err) => {
                error!(
                    "event=student_add module=service status=error error={}",
                    err
                );
                return Err(err);
            }
        };
        let outcome = self.apply(ChangeEvent::Inserted(student.clone()));
        info!(
            "event=student_add module=service status=ok student_id={} applied={}",
            student.id,
            outcome.is_change()
        );
        Ok(student)
    }

    /// Renames a course, keeping linked students attached.
    pub fn rename_course(
        &mut self,
        id: &CourseId,
        new_name: impl Into<String>,
    ) -> Result<usize, Anomaly> {
        let renamed = self.state.rename_course(id, new_name);
        if let Err(anomaly) = &renamed {
            self.anomalies_push(anomaly.clone());
        }
        renamed
    }

    pub fn view(&self, filter: &ViewFilter) -> RosterView<'_> {
        self.state.view(filter)
    }

    pub fn stats(&self) -> RosterStats {
        self.state.stats()
    }

    pub fn state(&self) -> &RosterState {
        &self.state
    }

    /// Returns the latest issued load generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded_generation != 0
    }

    /// Recent anomalies, oldest first.
    pub fn anomalies(&self) -> impl Iterator<Item = &Anomaly> + '_ {
        self.anomalies.iter()
    }

    pub fn take_anomalies(&mut self) -> Vec<Anomaly> {
        self.anomalies.drain(..).collect()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &RosterConfig {
        &self.config
    }

    fn fetch_snapshot(&self) -> SourceResult<(Vec<Student>, Vec<Course>)> {
        let courses = self.source.fetch_all_courses()?;
        let students = self.source.fetch_all_students()?;
        Ok((students, courses))
    }

    fn awaits_load(&self, stamp: u64) -> bool {
        self.in_flight
            .is_some_and(|generation| stamp >= generation && stamp > self.loaded_generation)
    }

    fn collect_inbox(&mut self) {
        self.pending.extend(self.inbox.try_iter());
    }

    fn record(&mut self, outcome: ApplyOutcome) {
        if let ApplyOutcome::Skipped(anomaly) = outcome {
            self.anomalies_push(anomaly);
        }
    }

    fn anomalies_push(&mut self, anomaly: Anomaly) {
        if self.config.anomaly_history == 0 {
            return;
        }
        while self.anomalies.len() >= self.config.anomaly_history {
            self.anomalies.pop_front();
        }
        self.anomalies.push_back(anomaly);
    }
}

#[cfg(test)]
mod tests {
    use super::{PumpReport, RosterSession};
    use crate::config::RosterConfig;
    use crate::roster::Anomaly;
    use crate::source::MockDataSource;

    #[test]
    fn anomaly_history_keeps_newest_entries() {
        let config = RosterConfig {
            anomaly_history: 2,
            ..RosterConfig::default()
        };
        let mut session = RosterSession::open(MockDataSource::with_sample_data(), config);
        for raw in ["{", "[]", "null"] {
            session.receive_payload(raw);
        }
        session.anomalies_push(Anomaly::CourseNameTaken("Psychology".to_string()));

        let kept = session.take_anomalies();
        assert_eq!(kept.len(), 2);
        assert_eq!(
            kept[1],
            Anomaly::CourseNameTaken("Psychology".to_string())
        );
        assert_eq!(session.anomalies().count(), 0);
    }

    #[test]
    fn report_total_excludes_deferred_events() {
        let report = PumpReport {
            applied: 1,
            absorbed: 2,
            skipped: 0,
            stale_generation: 1,
            deferred: 5,
        };
        assert_eq!(report.total(), 4);
    }
}
