//! Seed command for loading a simulated shift.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use sf_db::{Database, SeedOutcome, seed_demo_data};

/// Runs the seed command.
///
/// The shift starts at 08:00 UTC today. A fixed `seed` makes the generated
/// events reproducible.
pub fn run<W: Write>(writer: &mut W, db: &mut Database, seed: Option<u64>) -> Result<()> {
    let base_time = shift_start(Utc::now())?;
    let mut rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

    let outcome =
        seed_demo_data(db, &mut rng, base_time).context("failed to seed demo data")?;
    match outcome {
        SeedOutcome::AlreadySeeded => {
            writeln!(writer, "Store already has workers; nothing seeded.")?;
        }
        SeedOutcome::Seeded {
            workers,
            workstations,
            events,
        } => {
            writeln!(
                writer,
                "Seeded {workers} workers, {workstations} workstations, {events} events."
            )?;
        }
    }
    Ok(())
}

fn shift_start(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let eight = NaiveTime::from_hms_opt(8, 0, 0).context("invalid shift start")?;
    Ok(now.date_naive().and_time(eight).and_utc())
}
