//! Roster use-case services.
//!
//! # Responsibility
//! - Bind a data source, its change subscription and the roster into one
//!   explicit session context.
//! - Keep hosts decoupled from generation and inbox bookkeeping.

pub mod roster_session;

pub use roster_session::{LoadStatus, LoadTicket, PumpReport, RosterSession};
