//! Plant-wide totals folded from worker metrics.

use serde::{Deserialize, Serialize};

use crate::rate::{per_hour, percent, round2};
use crate::worker::WorkerMetric;

/// Plant-wide productivity summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryMetrics {
    pub total_productive_time_seconds: f64,
    pub total_production_count: u64,
    pub avg_production_rate: f64,
    pub avg_utilization_percent: f64,
}

impl FactoryMetrics {
    /// Folds worker metrics into factory totals.
    ///
    /// Workstation metrics are not consulted; station occupancy would double
    /// count time already attributed to workers.
    pub fn from_workers(workers: &[WorkerMetric]) -> Self {
        let (active, idle, units) = workers.iter().fold((0.0, 0.0, 0_u64), |acc, w| {
            (
                acc.0 + w.total_active_time_seconds,
                acc.1 + w.total_idle_time_seconds,
                acc.2 + w.total_units_produced,
            )
        });
        let total_factory_time = active + idle;

        Self {
            total_productive_time_seconds: active,
            total_production_count: units,
            avg_production_rate: round2(per_hour(units, total_factory_time)),
            avg_utilization_percent: round2(percent(active, total_factory_time)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkerId;

    fn metric(id: &str, active: f64, idle: f64, units: u64) -> WorkerMetric {
        WorkerMetric {
            worker_id: WorkerId::new(id).unwrap(),
            name: format!("Worker {id}"),
            total_active_time_seconds: active,
            total_idle_time_seconds: idle,
            utilization_percent: 0.0,
            total_units_produced: units,
            units_per_hour: 0.0,
        }
    }

    #[test]
    fn no_workers_yields_zeroes() {
        assert_eq!(FactoryMetrics::from_workers(&[]), FactoryMetrics::default());
    }

    #[test]
    fn sums_across_workers() {
        let factory = FactoryMetrics::from_workers(&[
            metric("W1", 3000.0, 600.0, 10),
            metric("W2", 1500.0, 2100.0, 2),
        ]);
        assert!((factory.total_productive_time_seconds - 4500.0).abs() < f64::EPSILON);
        assert_eq!(factory.total_production_count, 12);
        // 4500 / 7200
        assert!((factory.avg_utilization_percent - 62.5).abs() < 1e-9);
        // 12 units over 2 factory-hours
        assert!((factory.avg_production_rate - 6.0).abs() < 1e-9);
    }

    #[test]
    fn units_without_time_give_zero_rate() {
        let factory = FactoryMetrics::from_workers(&[metric("W1", 0.0, 0.0, 7)]);
        assert_eq!(factory.total_production_count, 7);
        assert!(factory.avg_production_rate.abs() < f64::EPSILON);
        assert!(factory.avg_utilization_percent.abs() < f64::EPSILON);
    }
}
