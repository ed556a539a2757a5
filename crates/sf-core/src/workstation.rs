//! Per-workstation occupancy metrics.

use serde::{Deserialize, Serialize};

use crate::event::Workstation;
use crate::event_type::EventType;
use crate::interval::Timeline;
use crate::rate::{per_hour, percent, round2};
use crate::types::WorkstationId;

/// Occupancy metrics for one workstation.
///
/// Utilization is occupancy over the raw first-to-last event span, not over
/// occupied + unoccupied time as for workers. The span is not gap-capped, so
/// long gaps lower station utilization while leaving occupancy untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkstationMetric {
    pub workstation_id: WorkstationId,
    #[serde(rename = "type")]
    pub kind: String,
    pub occupancy_time_seconds: f64,
    pub utilization_percent: f64,
    pub total_units_produced: u64,
    pub throughput_rate: f64,
}

impl WorkstationMetric {
    /// Derives workstation metrics from a reconstructed timeline.
    pub fn from_timeline(station: &Workstation, timeline: &Timeline) -> Self {
        let occupancy = timeline.duration_where(EventType::occupies_station);
        let range = timeline.observed_range_seconds();
        let units = timeline.units_produced;

        Self {
            workstation_id: station.id.clone(),
            kind: station.kind.clone(),
            occupancy_time_seconds: occupancy,
            utilization_percent: round2(percent(occupancy, range)),
            total_units_produced: units,
            throughput_rate: round2(per_hour(units, occupancy)),
        }
    }
}
