//! Metrics computation over an event source snapshot.
//!
//! The event source is read sequentially, then each entity's timeline is
//! reconstructed and aggregated in parallel. Entity computations share no
//! mutable state, and output order follows the registry order of the source.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::event::{EntityKind, Event, Worker, Workstation};
use crate::factory::FactoryMetrics;
use crate::interval::{DEFAULT_GAP_CAP_SECONDS, reconstruct};
use crate::worker::WorkerMetric;
use crate::workstation::WorkstationMetric;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`compute_metrics`].
///
/// Only adapter failures are fatal; malformed records degrade to zero
/// contributions instead.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// The entity registry could not be read.
    #[error("failed to list {kind}s")]
    Registry {
        kind: EntityKind,
        #[source]
        source: BoxError,
    },
    /// Events for an entity could not be read.
    #[error("failed to load events for {kind} {entity_id}")]
    Events {
        kind: EntityKind,
        entity_id: String,
        #[source]
        source: BoxError,
    },
}

/// Read access to stored events and entity registries.
///
/// Implementations must return events ascending by timestamp with ties in
/// arrival order, and should serve all calls of one computation from a
/// consistent view of the store.
pub trait EventSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists registered workers.
    fn list_workers(&self) -> Result<Vec<Worker>, Self::Error>;

    /// Lists registered workstations.
    fn list_workstations(&self) -> Result<Vec<Workstation>, Self::Error>;

    /// Lists the ordered events attributed to one entity.
    fn list_events_for_entity(
        &self,
        kind: EntityKind,
        entity_id: &str,
    ) -> Result<Vec<Event>, Self::Error>;
}

/// Half-open time window `[start, end)` restricting which events are used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Returns true if `timestamp` falls inside the window.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| timestamp >= start)
            && self.end.is_none_or(|end| timestamp < end)
    }
}

/// Configuration for metrics computation.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Inter-event gaps longer than this are discarded.
    /// Default: 3600 (1 hour).
    pub gap_cap_seconds: u32,

    /// Restrict each entity's sequence to this window before reconstruction.
    pub window: Option<TimeWindow>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            gap_cap_seconds: DEFAULT_GAP_CAP_SECONDS,
            window: None,
        }
    }
}

/// The full metrics bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub factory: FactoryMetrics,
    pub workers: Vec<WorkerMetric>,
    pub workstations: Vec<WorkstationMetric>,
}

/// Computes worker, workstation and factory metrics from the source.
///
/// This is a pure function of the stored events: calling it twice against an
/// unchanged source yields equal reports.
pub fn compute_metrics<S>(
    source: &S,
    config: &MetricsConfig,
) -> Result<MetricsReport, MetricsError>
where
    S: EventSource + ?Sized,
{
    let workers = source
        .list_workers()
        .map_err(|err| registry_error(EntityKind::Worker, err))?;
    let workstations = source
        .list_workstations()
        .map_err(|err| registry_error(EntityKind::Workstation, err))?;

    let worker_events = load_sequences(source, EntityKind::Worker, workers, |w| w.id.as_str())?;
    let station_events = load_sequences(source, EntityKind::Workstation, workstations, |s| {
        s.id.as_str()
    })?;

    let worker_metrics: Vec<WorkerMetric> = worker_events
        .par_iter()
        .map(|(worker, events)| {
            let events = apply_window(events, config.window);
            let timeline = reconstruct(&events, config.gap_cap_seconds);
            WorkerMetric::from_timeline(worker, &timeline)
        })
        .collect();

    let workstation_metrics: Vec<WorkstationMetric> = station_events
        .par_iter()
        .map(|(station, events)| {
            let events = apply_window(events, config.window);
            let timeline = reconstruct(&events, config.gap_cap_seconds);
            WorkstationMetric::from_timeline(station, &timeline)
        })
        .collect();

    let factory = FactoryMetrics::from_workers(&worker_metrics);

    debug!(
        workers = worker_metrics.len(),
        workstations = workstation_metrics.len(),
        total_production_count = factory.total_production_count,
        "metrics computed"
    );

    Ok(MetricsReport {
        factory,
        workers: worker_metrics,
        workstations: workstation_metrics,
    })
}

fn load_sequences<S, T>(
    source: &S,
    kind: EntityKind,
    entities: Vec<T>,
    id_of: impl Fn(&T) -> &str,
) -> Result<Vec<(T, Vec<Event>)>, MetricsError>
where
    S: EventSource + ?Sized,
{
    entities
        .into_iter()
        .map(|entity| {
            let events = source
                .list_events_for_entity(kind, id_of(&entity))
                .map_err(|err| MetricsError::Events {
                    kind,
                    entity_id: id_of(&entity).to_string(),
                    source: Box::new(err),
                })?;
            Ok((entity, events))
        })
        .collect()
}

fn apply_window(events: &[Event], window: Option<TimeWindow>) -> Vec<&Event> {
    events
        .iter()
        .filter(|event| window.is_none_or(|w| w.contains(event.timestamp)))
        .collect()
}

fn registry_error<E>(kind: EntityKind, err: E) -> MetricsError
where
    E: std::error::Error + Send + Sync + 'static,
{
    MetricsError::Registry {
        kind,
        source: Box::new(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Confidence, WorkerId, WorkstationId};
    use chrono::{Duration, TimeZone};
    use std::fmt;

    /// In-memory event source holding events in arrival order.
    #[derive(Default)]
    struct MemorySource {
        workers: Vec<Worker>,
        workstations: Vec<Workstation>,
        events: Vec<Event>,
        fail: bool,
    }

    #[derive(Debug)]
    struct Unavailable;

    impl fmt::Display for Unavailable {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "store unavailable")
        }
    }

    impl std::error::Error for Unavailable {}

    impl MemorySource {
        fn seeded() -> Self {
            let mut source = Self::default();
            for i in 1..=2 {
                source.workers.push(Worker {
                    id: WorkerId::new(format!("W{i}")).unwrap(),
                    name: format!("Worker {i}"),
                });
                source.workstations.push(Workstation {
                    id: WorkstationId::new(format!("S{i}")).unwrap(),
                    kind: format!("Assembly Station {i}"),
                });
            }
            source
        }

        fn push(&mut self, offset_secs: i64, worker: &str, station: &str, event_type: &str, count: u32) {
            let id = i64::try_from(self.events.len()).unwrap() + 1;
            self.events.push(Event {
                id,
                timestamp: Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap()
                    + Duration::seconds(offset_secs),
                worker_id: WorkerId::new(worker).unwrap(),
                workstation_id: WorkstationId::new(station).unwrap(),
                event_type: event_type.to_string(),
                confidence: Confidence::new(0.9).unwrap(),
                count,
            });
        }
    }

    impl EventSource for MemorySource {
        type Error = Unavailable;

        fn list_workers(&self) -> Result<Vec<Worker>, Self::Error> {
            if self.fail {
                return Err(Unavailable);
            }
            Ok(self.workers.clone())
        }

        fn list_workstations(&self) -> Result<Vec<Workstation>, Self::Error> {
            Ok(self.workstations.clone())
        }

        fn list_events_for_entity(
            &self,
            kind: EntityKind,
            entity_id: &str,
        ) -> Result<Vec<Event>, Self::Error> {
            let mut events: Vec<Event> = self
                .events
                .iter()
                .filter(|e| match kind {
                    EntityKind::Worker => e.worker_id.as_str() == entity_id,
                    EntityKind::Workstation => e.workstation_id.as_str() == entity_id,
                })
                .cloned()
                .collect();
            events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
            Ok(events)
        }
    }

    #[test]
    fn empty_store_reports_zeroes_for_every_entity() {
        let report = compute_metrics(&MemorySource::seeded(), &MetricsConfig::default()).unwrap();
        assert_eq!(report.workers.len(), 2);
        assert_eq!(report.workstations.len(), 2);
        assert_eq!(report.factory, FactoryMetrics::default());
        assert!(
            report
                .workstations
                .iter()
                .all(|s| s.utilization_percent.abs() < f64::EPSILON)
        );
    }

    #[test]
    fn workers_and_stations_follow_registry_order() {
        let report = compute_metrics(&MemorySource::seeded(), &MetricsConfig::default()).unwrap();
        let ids: Vec<_> = report.workers.iter().map(|w| w.worker_id.as_str()).collect();
        assert_eq!(ids, ["W1", "W2"]);
        let ids: Vec<_> = report
            .workstations
            .iter()
            .map(|s| s.workstation_id.as_str())
            .collect();
        assert_eq!(ids, ["S1", "S2"]);
    }

    #[test]
    fn station_sequence_interleaves_workers() {
        let mut source = MemorySource::seeded();
        source.push(0, "W1", "S1", "working", 0);
        source.push(600, "W2", "S1", "absent", 0);
        source.push(1200, "W1", "S1", "product_count", 3);

        let report = compute_metrics(&source, &MetricsConfig::default()).unwrap();

        let w1 = &report.workers[0];
        assert!((w1.total_active_time_seconds - 1200.0).abs() < f64::EPSILON);
        assert_eq!(w1.total_units_produced, 3);

        let s1 = &report.workstations[0];
        // working 0..600 occupies, absent 600..1200 does not
        assert!((s1.occupancy_time_seconds - 600.0).abs() < f64::EPSILON);
        assert!((s1.utilization_percent - 50.0).abs() < f64::EPSILON);
        assert_eq!(s1.total_units_produced, 3);
    }

    #[test]
    fn factory_folds_worker_results() {
        let mut source = MemorySource::seeded();
        source.push(0, "W1", "S1", "working", 0);
        source.push(1800, "W1", "S1", "idle", 0);
        source.push(2700, "W1", "S1", "product_count", 6);
        source.push(0, "W2", "S2", "idle", 0);
        source.push(900, "W2", "S2", "working", 0);

        let report = compute_metrics(&source, &MetricsConfig::default()).unwrap();
        // active 1800, idle 900 + 900
        assert!((report.factory.total_productive_time_seconds - 1800.0).abs() < f64::EPSILON);
        assert_eq!(report.factory.total_production_count, 6);
        assert!((report.factory.avg_utilization_percent - 50.0).abs() < 1e-9);
        assert!((report.factory.avg_production_rate - 6.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_computation_is_identical() {
        let mut source = MemorySource::seeded();
        source.push(0, "W1", "S1", "working", 0);
        source.push(333, "W1", "S1", "idle", 0);
        source.push(1000, "W1", "S1", "product_count", 2);

        let config = MetricsConfig::default();
        let first = compute_metrics(&source, &config).unwrap();
        let second = compute_metrics(&source, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn window_restricts_events_before_reconstruction() {
        let mut source = MemorySource::seeded();
        source.push(0, "W1", "S1", "working", 0);
        source.push(1800, "W1", "S1", "working", 0);
        source.push(2400, "W1", "S1", "idle", 0);

        let base = Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap();
        let config = MetricsConfig {
            window: Some(TimeWindow {
                start: Some(base + Duration::seconds(1800)),
                end: None,
            }),
            ..MetricsConfig::default()
        };
        let report = compute_metrics(&source, &config).unwrap();
        assert!((report.workers[0].total_active_time_seconds - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn custom_gap_cap_discards_shorter_gaps() {
        let mut source = MemorySource::seeded();
        source.push(0, "W1", "S1", "working", 0);
        source.push(900, "W1", "S1", "idle", 0);

        let config = MetricsConfig {
            gap_cap_seconds: 600,
            ..MetricsConfig::default()
        };
        let report = compute_metrics(&source, &config).unwrap();
        assert!(report.workers[0].total_active_time_seconds.abs() < f64::EPSILON);
    }

    #[test]
    fn source_failure_fails_whole_computation() {
        let source = MemorySource {
            fail: true,
            ..MemorySource::seeded()
        };
        let err = compute_metrics(&source, &MetricsConfig::default()).unwrap_err();
        assert_eq!(err.to_string(), "failed to list workers");
        assert!(matches!(err, MetricsError::Registry { kind: EntityKind::Worker, .. }));
    }

    #[test]
    fn window_contains_is_half_open() {
        let base = Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap();
        let window = TimeWindow {
            start: Some(base),
            end: Some(base + Duration::hours(1)),
        };
        assert!(window.contains(base));
        assert!(!window.contains(base + Duration::hours(1)));
        assert!(TimeWindow::default().contains(base));
    }
}
