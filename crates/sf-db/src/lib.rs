//! Storage layer for shop-floor events.
//!
//! Provides the append-only event store and the worker/workstation registries
//! using `rusqlite`, and implements [`EventSource`] so metrics can be computed
//! directly against a [`Database`].
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Metrics computation reads
//! every sequence on the calling thread before fanning out.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! and a `Z` suffix (e.g., `2025-03-03T08:00:00.000Z`), so `ORDER BY timestamp`
//! is chronological.
//!
//! ## Event Types
//!
//! The `event_type` column is TEXT. Writes through [`Database::insert_event`]
//! only accept the known [`EventType`]s, but rows written by other tools are
//! read back as-is and left for the metrics core to isolate.

mod seed;

pub use seed::{SeedOutcome, seed_demo_data};

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use sf_core::{
    Confidence, EntityKind, Event, EventSource, EventType, ValidationError, Worker, WorkerId,
    Workstation, WorkstationId,
};
use thiserror::Error;

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse an event timestamp.
    #[error("invalid timestamp for event {event_id}: {timestamp}")]
    TimestampParse {
        event_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row violates a domain invariant.
    #[error("invalid {table} row {row_id}: {message}")]
    InvalidRecord {
        table: &'static str,
        row_id: String,
        message: String,
    },
    /// An event referenced a worker that is not registered.
    #[error("unknown worker: {0}")]
    UnknownWorker(String),
    /// An event referenced a workstation that is not registered.
    #[error("unknown workstation: {0}")]
    UnknownWorkstation(String),
    /// A `count` was given for an event that does not record production.
    #[error("count is only valid for product_count events, got {event_type}")]
    UnexpectedCount { event_type: EventType },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An event ready to be appended to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub worker_id: WorkerId,
    pub workstation_id: WorkstationId,
    pub event_type: EventType,
    pub confidence: Confidence,
    pub count: u32,
}

/// Row counts for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCounts {
    pub workers: u64,
    pub workstations: u64,
    pub events: u64,
}

/// Raw event row before domain validation.
struct EventRow {
    id: i64,
    timestamp: String,
    worker_id: String,
    workstation_id: String,
    event_type: String,
    confidence: f64,
    count: i64,
}

const EVENT_COLUMNS: &str =
    "id, timestamp, worker_id, workstation_id, event_type, confidence, count";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Idempotent.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS workers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workstations (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL
            );

            -- Events table: append-only sensor facts
            -- timestamp: RFC 3339 with milliseconds (e.g., '2025-03-03T08:00:00.000Z')
            -- event_type: working | idle | absent | product_count
            -- count: units produced, only meaningful for product_count
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                worker_id TEXT NOT NULL,
                workstation_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                confidence REAL NOT NULL CHECK (confidence BETWEEN 0.0 AND 1.0),
                count INTEGER NOT NULL DEFAULT 0 CHECK (count >= 0),
                FOREIGN KEY (worker_id) REFERENCES workers(id),
                FOREIGN KEY (workstation_id) REFERENCES workstations(id)
            );

            CREATE INDEX IF NOT EXISTS idx_events_worker ON events(worker_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_workstation ON events(workstation_id, timestamp);
            ",
        )?;
        Ok(())
    }

    /// Registers a worker, updating the name if the id already exists.
    pub fn insert_worker(&mut self, worker: &Worker) -> Result<(), DbError> {
        upsert_worker_row(&self.conn, worker)
    }

    /// Registers a workstation, updating the type if the id already exists.
    pub fn insert_workstation(&mut self, station: &Workstation) -> Result<(), DbError> {
        upsert_workstation_row(&self.conn, station)
    }

    /// Lists workers ordered by ID.
    pub fn list_workers(&self) -> Result<Vec<Worker>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM workers ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut workers = Vec::new();
        for row in rows {
            let (id, name) = row?;
            let id = WorkerId::new(id.clone()).map_err(|err| invalid("workers", id, &err))?;
            workers.push(Worker { id, name });
        }
        Ok(workers)
    }

    /// Lists workstations ordered by ID.
    pub fn list_workstations(&self) -> Result<Vec<Workstation>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, type FROM workstations ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut stations = Vec::new();
        for row in rows {
            let (id, kind) = row?;
            let id =
                WorkstationId::new(id.clone()).map_err(|err| invalid("workstations", id, &err))?;
            stations.push(Workstation { id, kind });
        }
        Ok(stations)
    }

    /// Appends one event and returns it as stored.
    pub fn insert_event(&mut self, event: &NewEvent) -> Result<Event, DbError> {
        let tx = self.conn.transaction()?;
        let id = insert_event_row(&tx, event)?;
        tx.commit()?;
        Ok(Event {
            id,
            timestamp: event.timestamp,
            worker_id: event.worker_id.clone(),
            workstation_id: event.workstation_id.clone(),
            event_type: event.event_type.to_string(),
            confidence: event.confidence,
            count: event.count,
        })
    }

    /// Appends a batch of events in one transaction.
    pub fn insert_events(&mut self, events: &[NewEvent]) -> Result<usize, DbError> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        for event in events {
            insert_event_row(&tx, event)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// Registers entities and appends their events as one unit.
    ///
    /// Either everything is written or nothing is.
    pub fn seed_batch(
        &mut self,
        workers: &[Worker],
        stations: &[Workstation],
        events: &[NewEvent],
    ) -> Result<usize, DbError> {
        let tx = self.conn.transaction()?;
        for worker in workers {
            upsert_worker_row(&tx, worker)?;
        }
        for station in stations {
            upsert_workstation_row(&tx, station)?;
        }
        for event in events {
            insert_event_row(&tx, event)?;
        }
        tx.commit()?;
        Ok(events.len())
    }

    /// Lists a worker's events ordered by timestamp then ID.
    pub fn list_events_for_worker(&self, worker_id: &str) -> Result<Vec<Event>, DbError> {
        self.query_events("worker_id", worker_id)
    }

    /// Lists a workstation's events ordered by timestamp then ID.
    pub fn list_events_for_workstation(
        &self,
        workstation_id: &str,
    ) -> Result<Vec<Event>, DbError> {
        self.query_events("workstation_id", workstation_id)
    }

    fn query_events(&self, column: &str, entity_id: &str) -> Result<Vec<Event>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE {column} = ?
            ORDER BY timestamp ASC, id ASC
            "
        ))?;
        let rows = stmt.query_map([entity_id], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                timestamp: row.get(1)?,
                worker_id: row.get(2)?,
                workstation_id: row.get(3)?,
                event_type: row.get(4)?,
                confidence: row.get(5)?,
                count: row.get(6)?,
            })
        })?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?.into_event()?);
        }
        Ok(events)
    }

    /// Returns true if no worker has been registered yet.
    pub fn is_empty(&self) -> Result<bool, DbError> {
        let exists: Option<String> = self
            .conn
            .query_row("SELECT id FROM workers LIMIT 1", [], |row| row.get(0))
            .optional()?;
        Ok(exists.is_none())
    }

    /// Counts rows in each table.
    #[allow(clippy::cast_sign_loss)]
    pub fn counts(&self) -> Result<StoreCounts, DbError> {
        let count = |table: &str| -> Result<u64, DbError> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as u64)
        };
        Ok(StoreCounts {
            workers: count("workers")?,
            workstations: count("workstations")?,
            events: count("events")?,
        })
    }

    /// Returns the timestamp of the most recent event, if any.
    pub fn last_event_at(&self) -> Result<Option<DateTime<Utc>>, DbError> {
        let row: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT id, timestamp FROM events ORDER BY timestamp DESC, id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(id, timestamp)| parse_timestamp(&timestamp, id))
            .transpose()
    }

    fn worker_exists(conn: &Connection, id: &str) -> Result<bool, DbError> {
        let found: Option<String> = conn
            .query_row("SELECT id FROM workers WHERE id = ?", [id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn workstation_exists(conn: &Connection, id: &str) -> Result<bool, DbError> {
        let found: Option<String> = conn
            .query_row("SELECT id FROM workstations WHERE id = ?", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(found.is_some())
    }
}

impl EventSource for Database {
    type Error = DbError;

    fn list_workers(&self) -> Result<Vec<Worker>, Self::Error> {
        Self::list_workers(self)
    }

    fn list_workstations(&self) -> Result<Vec<Workstation>, Self::Error> {
        Self::list_workstations(self)
    }

    fn list_events_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Vec<Event>, Self::Error> {
        match kind {
            EntityKind::Worker => self.list_events_for_worker(entity_id),
            EntityKind::Workstation => self.list_events_for_workstation(entity_id),
        }
    }
}

impl EventRow {
    fn into_event(self) -> Result<Event, DbError> {
        let row_id = self.id.to_string();
        let timestamp = parse_timestamp(&self.timestamp, self.id)?;
        let worker_id =
            WorkerId::new(self.worker_id).map_err(|err| invalid("events", row_id.clone(), &err))?;
        let workstation_id = WorkstationId::new(self.workstation_id)
            .map_err(|err| invalid("events", row_id.clone(), &err))?;
        let count = u32::try_from(self.count).map_err(|_| DbError::InvalidRecord {
            table: "events",
            row_id,
            message: format!("count out of range: {}", self.count),
        })?;
        Ok(Event {
            id: self.id,
            timestamp,
            worker_id,
            workstation_id,
            event_type: self.event_type,
            confidence: Confidence::saturating(self.confidence),
            count,
        })
    }
}

fn upsert_worker_row(conn: &Connection, worker: &Worker) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT INTO workers (id, name) VALUES (?, ?)
        ON CONFLICT(id) DO UPDATE SET name = excluded.name
        ",
        params![worker.id.as_str(), worker.name],
    )?;
    Ok(())
}

fn upsert_workstation_row(conn: &Connection, station: &Workstation) -> Result<(), DbError> {
    conn.execute(
        "
        INSERT INTO workstations (id, type) VALUES (?, ?)
        ON CONFLICT(id) DO UPDATE SET type = excluded.type
        ",
        params![station.id.as_str(), station.kind],
    )?;
    Ok(())
}

fn insert_event_row(conn: &Connection, event: &NewEvent) -> Result<i64, DbError> {
    if event.count > 0 && event.event_type != EventType::ProductCount {
        return Err(DbError::UnexpectedCount {
            event_type: event.event_type,
        });
    }
    if !Database::worker_exists(conn, event.worker_id.as_str())? {
        return Err(DbError::UnknownWorker(event.worker_id.to_string()));
    }
    if !Database::workstation_exists(conn, event.workstation_id.as_str())? {
        return Err(DbError::UnknownWorkstation(event.workstation_id.to_string()));
    }
    conn.execute(
        "
        INSERT INTO events (timestamp, worker_id, workstation_id, event_type, confidence, count)
        VALUES (?, ?, ?, ?, ?, ?)
        ",
        params![
            format_timestamp(event.timestamp),
            event.worker_id.as_str(),
            event.workstation_id.as_str(),
            event.event_type.as_str(),
            event.confidence.get(),
            event.count,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn invalid(table: &'static str, row_id: String, err: &ValidationError) -> DbError {
    DbError::InvalidRecord {
        table,
        row_id,
        message: err.to_string(),
    }
}

fn parse_timestamp(timestamp: &str, event_id: i64) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            event_id,
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use sf_core::{MetricsConfig, compute_metrics};
    use std::collections::HashSet;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
    }

    fn registered_db() -> Database {
        let mut db = Database::open_in_memory().expect("open in-memory db");
        db.insert_worker(&Worker {
            id: WorkerId::new("W1").unwrap(),
            name: "Worker 1".to_string(),
        })
        .unwrap();
        db.insert_workstation(&Workstation {
            id: WorkstationId::new("S1").unwrap(),
            kind: "Assembly Station 1".to_string(),
        })
        .unwrap();
        db
    }

    fn new_event(offset_secs: i64, event_type: EventType, count: u32) -> NewEvent {
        NewEvent {
            timestamp: base() + Duration::seconds(offset_secs),
            worker_id: WorkerId::new("W1").unwrap(),
            workstation_id: WorkstationId::new("S1").unwrap(),
            event_type,
            confidence: Confidence::new(0.9).unwrap(),
            count,
        }
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    fn index_names(conn: &Connection, table: &str) -> HashSet<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA index_list({table})"))
            .expect("prepare index_list");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query index_list");
        rows.map(|row| row.expect("index_list row")).collect()
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(table_columns(&db.conn, "workers"), vec!["id", "name"]);
        assert_eq!(table_columns(&db.conn, "workstations"), vec!["id", "type"]);
        assert_eq!(
            table_columns(&db.conn, "events"),
            vec![
                "id",
                "timestamp",
                "worker_id",
                "workstation_id",
                "event_type",
                "confidence",
                "count",
            ]
        );

        let indexes = index_names(&db.conn, "events");
        assert!(indexes.contains("idx_events_worker"));
        assert!(indexes.contains("idx_events_workstation"));
    }

    #[test]
    fn reopening_file_database_keeps_data() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("sf.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.insert_worker(&Worker {
                id: WorkerId::new("W9").unwrap(),
                name: "Worker 9".to_string(),
            })
            .unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_workers().unwrap().len(), 1);
        assert!(!db.is_empty().unwrap());
    }

    #[test]
    fn insert_worker_updates_existing_name() {
        let mut db = registered_db();
        db.insert_worker(&Worker {
            id: WorkerId::new("W1").unwrap(),
            name: "Renamed".to_string(),
        })
        .unwrap();
        let workers = db.list_workers().unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].name, "Renamed");
    }

    #[test]
    fn insert_event_returns_stored_row() {
        let mut db = registered_db();
        let stored = db
            .insert_event(&new_event(0, EventType::ProductCount, 4))
            .unwrap();
        assert_eq!(stored.id, 1);
        assert_eq!(stored.event_type, "product_count");
        assert_eq!(db.list_events_for_worker("W1").unwrap(), vec![stored]);
    }

    #[test]
    fn events_are_ordered_by_timestamp_then_arrival() {
        let mut db = registered_db();
        db.insert_events(&[
            new_event(600, EventType::Idle, 0),
            new_event(0, EventType::Working, 0),
            new_event(600, EventType::Working, 0),
        ])
        .unwrap();

        let events = db.list_events_for_workstation("S1").unwrap();
        let order: Vec<_> = events.iter().map(|e| (e.id, e.event_type.as_str())).collect();
        assert_eq!(order, vec![(2, "working"), (1, "idle"), (3, "working")]);
    }

    #[test]
    fn rejects_unknown_worker() {
        let mut db = registered_db();
        let mut event = new_event(0, EventType::Working, 0);
        event.worker_id = WorkerId::new("W404").unwrap();
        let err = db.insert_event(&event).unwrap_err();
        assert!(matches!(err, DbError::UnknownWorker(id) if id == "W404"));
    }

    #[test]
    fn rejects_unknown_workstation() {
        let mut db = registered_db();
        let mut event = new_event(0, EventType::Working, 0);
        event.workstation_id = WorkstationId::new("S404").unwrap();
        let err = db.insert_event(&event).unwrap_err();
        assert!(matches!(err, DbError::UnknownWorkstation(_)));
    }

    #[test]
    fn rejects_count_on_state_event() {
        let mut db = registered_db();
        let err = db
            .insert_event(&new_event(0, EventType::Working, 3))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "count is only valid for product_count events, got working"
        );
    }

    #[test]
    fn failed_batch_inserts_nothing() {
        let mut db = registered_db();
        let mut bad = new_event(60, EventType::Idle, 0);
        bad.worker_id = WorkerId::new("W404").unwrap();
        let result = db.insert_events(&[new_event(0, EventType::Working, 0), bad]);
        assert!(result.is_err());
        assert_eq!(db.counts().unwrap().events, 0);
    }

    #[test]
    fn failed_seed_batch_leaves_store_empty() {
        let mut db = Database::open_in_memory().unwrap();
        let worker = Worker {
            id: WorkerId::new("W1").unwrap(),
            name: "Worker 1".to_string(),
        };
        let station = Workstation {
            id: WorkstationId::new("S1").unwrap(),
            kind: "Assembly Station 1".to_string(),
        };
        let result = db.seed_batch(
            &[worker],
            &[station],
            &[
                new_event(0, EventType::Working, 0),
                new_event(60, EventType::Idle, 2),
            ],
        );
        assert!(matches!(result, Err(DbError::UnexpectedCount { .. })));
        assert!(db.is_empty().unwrap());
        assert_eq!(db.counts().unwrap(), StoreCounts::default());
    }

    #[test]
    fn foreign_rows_with_unknown_types_are_read_back() {
        let db = registered_db();
        db.conn
            .execute(
                "INSERT INTO events (timestamp, worker_id, workstation_id, event_type, confidence, count)
                 VALUES ('2025-03-03T08:00:00.000Z', 'W1', 'S1', 'maintenance', 0.5, 0)",
                [],
            )
            .unwrap();
        let events = db.list_events_for_worker("W1").unwrap();
        assert_eq!(events[0].event_type, "maintenance");
        assert_eq!(events[0].kind(), None);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let db = registered_db();
        db.conn
            .execute(
                "INSERT INTO events (timestamp, worker_id, workstation_id, event_type, confidence, count)
                 VALUES ('yesterday', 'W1', 'S1', 'working', 0.5, 0)",
                [],
            )
            .unwrap();
        let err = db.list_events_for_worker("W1").unwrap_err();
        assert!(matches!(err, DbError::TimestampParse { event_id: 1, .. }));
    }

    #[test]
    fn counts_and_last_event() {
        let mut db = registered_db();
        assert_eq!(db.last_event_at().unwrap(), None);
        db.insert_events(&[
            new_event(0, EventType::Working, 0),
            new_event(900, EventType::Idle, 0),
        ])
        .unwrap();
        assert_eq!(
            db.counts().unwrap(),
            StoreCounts {
                workers: 1,
                workstations: 1,
                events: 2,
            }
        );
        assert_eq!(
            db.last_event_at().unwrap(),
            Some(base() + Duration::seconds(900))
        );
    }

    #[test]
    fn metrics_computed_from_store() {
        let mut db = registered_db();
        db.insert_events(&[
            new_event(0, EventType::ProductCount, 5),
            new_event(600, EventType::Working, 0),
            new_event(1800, EventType::Idle, 0),
        ])
        .unwrap();

        let report = compute_metrics(&db, &MetricsConfig::default()).unwrap();
        let worker = &report.workers[0];
        // product_count segment accrues no activity for the worker
        assert!((worker.total_active_time_seconds - 1200.0).abs() < f64::EPSILON);
        assert_eq!(worker.total_units_produced, 5);

        let station = &report.workstations[0];
        // ...but does occupy the station
        assert!((station.occupancy_time_seconds - 1800.0).abs() < f64::EPSILON);
        assert!((station.utilization_percent - 100.0).abs() < f64::EPSILON);
    }
}
