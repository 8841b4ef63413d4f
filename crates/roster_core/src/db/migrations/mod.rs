//! Roster schema scripts and the runner that brings a connection up to date.
//!
//! # Invariants
//! - Script versions start at 1 and increase by one.
//! - Pending scripts run in one transaction; a failing script leaves the
//!   schema version where it was.
//! - After a run, `students` and `courses` must exist.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "roster",
        sql: include_str!("0001_roster.sql"),
    },
    Migration {
        version: 2,
        name: "student_order",
        sql: include_str!("0002_student_order.sql"),
    },
];

const ROSTER_TABLES: [&str; 2] = ["courses", "students"];

/// Schema version this build writes.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Reads the roster schema version recorded on `conn`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Runs every script newer than the recorded version, then checks that the
/// roster tables are present. Returns the number of scripts applied.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is ahead of this build.
/// - `Migration` naming the first script that failed.
/// - `MissingTable` when a current-version file lacks a roster table.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<usize> {
    let from_version = schema_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<Migration> = MIGRATIONS
        .iter()
        .copied()
        .filter(|migration| migration.version > from_version)
        .collect();

    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for migration in &pending {
            tx.execute_batch(migration.sql)
                .and_then(|()| {
                    tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
                })
                .map_err(|source| DbError::Migration {
                    version: migration.version,
                    name: migration.name,
                    source,
                })?;
            info!(
                "event=db_migrate module=db status=ok version={} name={}",
                migration.version, migration.name
            );
        }
        tx.commit()?;
    }

    ensure_roster_tables(conn)?;
    Ok(pending.len())
}

fn ensure_roster_tables(conn: &Connection) -> DbResult<()> {
    for table in ROSTER_TABLES {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1);",
            [table],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(DbError::MissingTable(table));
        }
    }
    Ok(())
}
