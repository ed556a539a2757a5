//! Worker and workstation registry commands.

use std::io::Write;

use anyhow::{Context, Result};
use sf_core::{Worker, WorkerId, Workstation, WorkstationId};
use sf_db::Database;

/// Registers or renames a worker.
pub fn add_worker<W: Write>(writer: &mut W, db: &mut Database, id: &str, name: &str) -> Result<()> {
    let worker = Worker {
        id: WorkerId::new(id)?,
        name: name.to_string(),
    };
    db.insert_worker(&worker)
        .context("failed to register worker")?;
    writeln!(writer, "Registered worker {}: {}", worker.id, worker.name)?;
    Ok(())
}

/// Registers or re-labels a workstation.
pub fn add_workstation<W: Write>(
    writer: &mut W,
    db: &mut Database,
    id: &str,
    kind: &str,
) -> Result<()> {
    let station = Workstation {
        id: WorkstationId::new(id)?,
        kind: kind.to_string(),
    };
    db.insert_workstation(&station)
        .context("failed to register workstation")?;
    writeln!(writer, "Registered workstation {}: {}", station.id, station.kind)?;
    Ok(())
}

pub fn list_workers<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let workers = db.list_workers()?;
    if json {
        serde_json::to_writer_pretty(&mut *writer, &workers)?;
        writeln!(writer)?;
        return Ok(());
    }
    if workers.is_empty() {
        writeln!(writer, "No workers registered.")?;
        return Ok(());
    }
    for worker in workers {
        writeln!(writer, "{:<6}{}", worker.id.as_str(), worker.name)?;
    }
    Ok(())
}

pub fn list_workstations<W: Write>(writer: &mut W, db: &Database, json: bool) -> Result<()> {
    let stations = db.list_workstations()?;
    if json {
        serde_json::to_writer_pretty(&mut *writer, &stations)?;
        writeln!(writer)?;
        return Ok(());
    }
    if stations.is_empty() {
        writeln!(writer, "No workstations registered.")?;
        return Ok(());
    }
    for station in stations {
        writeln!(writer, "{:<6}{}", station.id.as_str(), station.kind)?;
    }
    Ok(())
}
