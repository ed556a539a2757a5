//! Record command for appending a single sensor event.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::Utc;
use sf_core::{Confidence, EventType, WorkerId, WorkstationId};
use sf_db::{Database, NewEvent};

use super::util::parse_datetime;

/// A sensor reading as entered on the command line.
#[derive(Debug)]
pub struct RecordArgs<'a> {
    pub worker: &'a str,
    pub station: &'a str,
    pub event_type: EventType,
    pub at: Option<&'a str>,
    pub confidence: f64,
    pub count: Option<u32>,
}

pub fn run<W: Write>(writer: &mut W, db: &mut Database, args: &RecordArgs<'_>) -> Result<()> {
    let timestamp = match args.at {
        Some(at) => parse_datetime(at)?,
        None => Utc::now(),
    };
    let event = NewEvent {
        timestamp,
        worker_id: WorkerId::new(args.worker)?,
        workstation_id: WorkstationId::new(args.station)?,
        event_type: args.event_type,
        confidence: Confidence::new(args.confidence)?,
        count: args.count.unwrap_or(0),
    };

    let stored = db.insert_event(&event).context("failed to record event")?;
    tracing::debug!(event_id = stored.id, "event recorded");

    write!(
        writer,
        "Recorded event {}: {} at {} {}",
        stored.id, stored.worker_id, stored.workstation_id, stored.event_type
    )?;
    if event.event_type == EventType::ProductCount {
        write!(writer, " ({} units)", stored.count)?;
    }
    writeln!(writer, " @ {}", stored.timestamp.to_rfc3339())?;
    Ok(())
}
