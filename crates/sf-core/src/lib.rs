//! Core domain logic for shop-floor productivity metrics.
//!
//! This crate contains the fundamental types and logic for:
//! - Interval reconstruction: turning sparse sensor events into state segments
//! - Worker, workstation and factory aggregation over those segments
//! - The [`EventSource`] seam through which stored events are read

pub mod event;
pub mod event_type;
mod factory;
pub mod interval;
mod metrics;
mod rate;
pub mod types;
mod worker;
mod workstation;

pub use event::{EntityKind, Event, TimelineEvent, Worker, Workstation};
pub use event_type::{EventType, UnknownEventType};
pub use factory::FactoryMetrics;
pub use interval::{DEFAULT_GAP_CAP_SECONDS, Segment, Timeline, reconstruct};
pub use metrics::{
    EventSource, MetricsConfig, MetricsError, MetricsReport, TimeWindow, compute_metrics,
};
pub use types::{Confidence, ValidationError, WorkerId, WorkstationId};
pub use worker::WorkerMetric;
pub use workstation::WorkstationMetric;
