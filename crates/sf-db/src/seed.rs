//! Demo data for an empty store.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sf_core::{Confidence, EventType, Worker, WorkerId, Workstation, WorkstationId};
use tracing::{debug, info};

use crate::{Database, DbError, NewEvent};

const DEMO_WORKERS: usize = 6;
const SEGMENTS_PER_WORKER: usize = 20;

/// Result of a seeding attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store already had workers; nothing was written.
    AlreadySeeded,
    /// Demo entities and events were written.
    Seeded {
        workers: usize,
        workstations: usize,
        events: usize,
    },
}

/// Seeds a simulated shift if the store has no workers yet.
///
/// Worker `Wn` is paired with station `Sn`. Each worker gets
/// 20 events starting at `base_time`, 5–15 minutes apart: 70% `working`,
/// 10% `idle`, 20% `product_count` with 1–5 units.
pub fn seed_demo_data<R: Rng>(
    db: &mut Database,
    rng: &mut R,
    base_time: DateTime<Utc>,
) -> Result<SeedOutcome, DbError> {
    if !db.is_empty()? {
        debug!("store already has workers, skipping seed");
        return Ok(SeedOutcome::AlreadySeeded);
    }

    let mut workers = Vec::with_capacity(DEMO_WORKERS);
    let mut stations = Vec::with_capacity(DEMO_WORKERS);
    for i in 1..=DEMO_WORKERS {
        workers.push(Worker {
            id: demo_id(WorkerId::new(format!("W{i}")))?,
            name: format!("Worker {i}"),
        });
        stations.push(Workstation {
            id: demo_id(WorkstationId::new(format!("S{i}")))?,
            kind: format!("Assembly Station {i}"),
        });
    }

    let mut events = Vec::with_capacity(DEMO_WORKERS * SEGMENTS_PER_WORKER);
    for (worker, station) in workers.iter().zip(&stations) {
        let mut current = base_time;
        for _ in 0..SEGMENTS_PER_WORKER {
            let step_minutes: i64 = rng.random_range(5..=15);
            let roll: f64 = rng.random();
            let (event_type, count) = if roll < 0.7 {
                (EventType::Working, 0)
            } else if roll < 0.8 {
                (EventType::Idle, 0)
            } else {
                (EventType::ProductCount, rng.random_range(1..=5))
            };

            events.push(NewEvent {
                timestamp: current,
                worker_id: worker.id.clone(),
                workstation_id: station.id.clone(),
                event_type,
                confidence: Confidence::saturating(rng.random_range(0.8..0.99)),
                count,
            });
            current += Duration::minutes(step_minutes);
        }
    }

    let inserted = db.seed_batch(&workers, &stations, &events)?;
    info!(workers = workers.len(), events = inserted, "seeded demo data");

    Ok(SeedOutcome::Seeded {
        workers: workers.len(),
        workstations: stations.len(),
        events: inserted,
    })
}

fn demo_id<T>(id: Result<T, sf_core::ValidationError>) -> Result<T, DbError> {
    id.map_err(|err| DbError::InvalidRecord {
        table: "seed",
        row_id: String::new(),
        message: err.to_string(),
    })
}
