//! Per-worker activity metrics.

use serde::{Deserialize, Serialize};

use crate::event::Worker;
use crate::event_type::EventType;
use crate::interval::Timeline;
use crate::rate::{per_hour, percent, round2};
use crate::types::WorkerId;

/// Activity metrics for one worker.
///
/// Utilization is active time over the worker's own active + idle time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetric {
    pub worker_id: WorkerId,
    pub name: String,
    pub total_active_time_seconds: f64,
    pub total_idle_time_seconds: f64,
    pub utilization_percent: f64,
    pub total_units_produced: u64,
    pub units_per_hour: f64,
}

impl WorkerMetric {
    /// Derives worker metrics from a reconstructed timeline.
    ///
    /// Only `working` and `idle` segments accrue time; a segment opened by
    /// `product_count` or `absent` counts toward neither.
    pub fn from_timeline(worker: &Worker, timeline: &Timeline) -> Self {
        let active = timeline.duration_where(|kind| kind == EventType::Working);
        let idle = timeline.duration_where(|kind| kind == EventType::Idle);
        let total_time = active + idle;
        let units = timeline.units_produced;

        Self {
            worker_id: worker.id.clone(),
            name: worker.name.clone(),
            total_active_time_seconds: active,
            total_idle_time_seconds: idle,
            utilization_percent: round2(percent(active, total_time)),
            total_units_produced: units,
            units_per_hour: round2(per_hour(units, total_time)),
        }
    }
}
