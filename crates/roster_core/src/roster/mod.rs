//! Roster reconciler.
//!
//! # Responsibility
//! - Keep the local student list and per-course counts consistent under
//!   bulk loads and change feed events.
//! - Serve filtered projections and dashboard aggregates.
//!
//! # Invariants
//! - Operations are total: failures are reported as [`Anomaly`] values,
//!   never panics.
//! - The roster is mutated only through `&mut self`; callers serialize
//!   access on a single dispatch thread.

pub mod anomaly;
pub mod state;
pub mod stats;
pub mod view;

pub use anomaly::Anomaly;
pub use state::{ApplyOutcome, RosterState};
pub use stats::RosterStats;
pub use view::{RosterView, RosterViewIter, ViewFilter};
