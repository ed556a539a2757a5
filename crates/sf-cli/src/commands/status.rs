//! Status command for showing what the store holds.

use std::io::Write;

use anyhow::Result;
use sf_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let counts = db.counts()?;

    writeln!(writer, "Shop-floor metrics status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Workers:      {}", counts.workers)?;
    writeln!(writer, "Workstations: {}", counts.workstations)?;
    writeln!(writer, "Events:       {}", counts.events)?;

    match db.last_event_at()? {
        Some(last) => writeln!(writer, "Last event:   {}", last.to_rfc3339())?,
        None => writeln!(writer, "No events recorded.")?,
    }

    Ok(())
}
