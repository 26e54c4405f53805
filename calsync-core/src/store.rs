//! SQLite-backed sync state.
//!
//! Persists, per category:
//! - the remote calendar id and reconciliation status ([`CalendarSyncState`])
//! - every event signature known to exist remotely, unique per calendar id

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};

use crate::error::CalSyncResult;
use crate::record::Signature;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSyncState {
    pub name: String,
    pub calendar_id: String,
    pub expected_count: u64,
    pub synced_count: u64,
    pub complete: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

impl CalendarSyncState {
    /// State for a freshly resolved calendar, nothing confirmed yet.
    pub fn resolved(name: &str, calendar_id: &str, expected_count: u64) -> Self {
        CalendarSyncState {
            name: name.to_string(),
            calendar_id: calendar_id.to_string(),
            expected_count,
            synced_count: 0,
            complete: false,
            last_sync: None,
        }
    }
}

pub struct SyncStore {
    conn: Connection,
}

impl SyncStore {
    /// Open (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> CalSyncResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> CalSyncResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS calendars (
                name           TEXT PRIMARY KEY,
                calendar_id    TEXT NOT NULL,
                expected_count INTEGER NOT NULL DEFAULT 0,
                synced_count   INTEGER NOT NULL DEFAULT 0,
                complete       INTEGER NOT NULL DEFAULT 0,
                last_sync      TEXT
            );

            CREATE TABLE IF NOT EXISTS events (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                calendar_id   TEXT NOT NULL,
                calendar_name TEXT NOT NULL,
                event_id      TEXT,
                subject       TEXT NOT NULL,
                start_time    TEXT NOT NULL,
                end_time      TEXT NOT NULL,
                UNIQUE (calendar_id, subject, start_time, end_time)
            );

            CREATE INDEX IF NOT EXISTS idx_events_calendar_name ON events(calendar_name);",
        )?;
        Ok(())
    }

    pub fn get_calendar_state(&self, name: &str) -> CalSyncResult<Option<CalendarSyncState>> {
        let state = self
            .conn
            .query_row(
                "SELECT name, calendar_id, expected_count, synced_count, complete, last_sync
                 FROM calendars WHERE name = ?1",
                params![name],
                state_from_row,
            )
            .optional()?;
        Ok(state)
    }

    /// Insert or overwrite by name.
    ///
    /// If the name now points at a different calendar id, event rows of the
    /// old calendar are dropped with it.
    pub fn upsert_calendar_state(&self, state: &CalendarSyncState) -> CalSyncResult<()> {
        let tx = self.conn.unchecked_transaction()?;

        let previous_id: Option<String> = tx
            .query_row(
                "SELECT calendar_id FROM calendars WHERE name = ?1",
                params![state.name],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(previous_id) = previous_id.filter(|id| *id != state.calendar_id) {
            tx.execute("DELETE FROM events WHERE calendar_id = ?1", params![previous_id])?;
        }

        tx.execute(
            "INSERT INTO calendars (name, calendar_id, expected_count, synced_count, complete, last_sync)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(name) DO UPDATE SET
                calendar_id    = excluded.calendar_id,
                expected_count = excluded.expected_count,
                synced_count   = excluded.synced_count,
                complete       = excluded.complete,
                last_sync      = excluded.last_sync",
            params![
                state.name,
                state.calendar_id,
                state.expected_count,
                state.synced_count,
                state.complete,
                state.last_sync.map(|t| t.to_rfc3339()),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Remember that `signature` exists on `calendar_id`.
    ///
    /// Returns false if it was already known; that is not an error.
    pub fn record_event(
        &self,
        calendar_id: &str,
        calendar_name: &str,
        signature: &Signature,
        event_id: Option<&str>,
    ) -> CalSyncResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO events (calendar_id, calendar_name, event_id, subject, start_time, end_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                calendar_id,
                calendar_name,
                event_id,
                signature.subject,
                signature.start,
                signature.end,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// [`record_event`](Self::record_event) for many signatures in one
    /// transaction. Returns how many were new.
    pub fn record_events<'a, I>(
        &self,
        calendar_id: &str,
        calendar_name: &str,
        events: I,
    ) -> CalSyncResult<usize>
    where
        I: IntoIterator<Item = (Signature, Option<&'a str>)>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO events (calendar_id, calendar_name, event_id, subject, start_time, end_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for (signature, event_id) in events {
                inserted += stmt.execute(params![
                    calendar_id,
                    calendar_name,
                    event_id,
                    signature.subject,
                    signature.start,
                    signature.end,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    pub fn existing_signatures(&self, calendar_id: &str) -> CalSyncResult<HashSet<Signature>> {
        let mut stmt = self
            .conn
            .prepare("SELECT subject, start_time, end_time FROM events WHERE calendar_id = ?1")?;
        let rows = stmt.query_map(params![calendar_id], |row| {
            Ok(Signature {
                subject: row.get(0)?,
                start: row.get(1)?,
                end: row.get(2)?,
            })
        })?;

        let mut signatures = HashSet::new();
        for row in rows {
            signatures.insert(row?);
        }
        Ok(signatures)
    }

    pub fn event_count(&self, calendar_id: &str) -> CalSyncResult<u64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM events WHERE calendar_id = ?1",
            params![calendar_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All calendar states, ordered by name.
    pub fn list_calendar_states(&self) -> CalSyncResult<Vec<CalendarSyncState>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, calendar_id, expected_count, synced_count, complete, last_sync
             FROM calendars ORDER BY name",
        )?;
        let rows = stmt.query_map([], state_from_row)?;

        let mut states = Vec::new();
        for row in rows {
            states.push(row?);
        }
        Ok(states)
    }

    /// Delete a calendar's state and all of its event rows.
    /// Returns false if nothing was stored under `name`.
    pub fn delete_calendar(&self, name: &str) -> CalSyncResult<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let calendar_id: Option<String> = tx
            .query_row(
                "SELECT calendar_id FROM calendars WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        let mut removed = tx.execute("DELETE FROM events WHERE calendar_name = ?1", params![name])?;
        if let Some(calendar_id) = &calendar_id {
            removed += tx.execute("DELETE FROM events WHERE calendar_id = ?1", params![calendar_id])?;
        }
        let deleted = tx.execute("DELETE FROM calendars WHERE name = ?1", params![name])?;

        tx.commit()?;
        tracing::debug!(calendar = name, events = removed, "Cleared stored calendar");
        Ok(deleted > 0)
    }

    /// Delete everything.
    pub fn reset(&self) -> CalSyncResult<()> {
        self.conn
            .execute_batch("DELETE FROM events; DELETE FROM calendars;")?;
        Ok(())
    }
}

fn state_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarSyncState> {
    let last_sync: Option<String> = row.get(5)?;
    Ok(CalendarSyncState {
        name: row.get(0)?,
        calendar_id: row.get(1)?,
        expected_count: row.get(2)?,
        synced_count: row.get(3)?,
        complete: row.get(4)?,
        last_sync: last_sync
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
    })
}
