//! Sensor events and the entities they reference.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event_type::EventType;
use crate::types::{Confidence, WorkerId, WorkstationId};

/// A single timestamped fact about a worker/workstation pair.
///
/// Every event is attributed to both the worker and the workstation; there
/// are no worker-only or station-only events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier. Also the tie-breaker for equal timestamps.
    pub id: i64,
    /// When the sensor observed the fact.
    pub timestamp: DateTime<Utc>,
    pub worker_id: WorkerId,
    pub workstation_id: WorkstationId,
    /// Raw event type as recorded.
    ///
    /// Kept as a string so a record outside the known set can still be read
    /// and isolated instead of failing the whole load. Use [`Event::kind`].
    pub event_type: String,
    pub confidence: Confidence,
    /// Units produced. Only meaningful for `product_count` events.
    #[serde(default)]
    pub count: u32,
}

impl Event {
    /// Returns the parsed event type, or `None` for unknown types.
    pub fn kind(&self) -> Option<EventType> {
        self.event_type.parse().ok()
    }
}

/// A worker registered on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub name: String,
}

/// A workstation registered on the floor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workstation {
    pub id: WorkstationId,
    /// Display attribute, e.g. "Assembly Station 1".
    #[serde(rename = "type")]
    pub kind: String,
}

/// Which registry an entity id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Worker,
    Workstation,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Worker => write!(f, "worker"),
            Self::Workstation => write!(f, "workstation"),
        }
    }
}

/// An event suitable for interval reconstruction.
///
/// This trait allows reconstruction to work with different event
/// representations (stored [`Event`]s, borrowed filtered views, or test fixtures).
pub trait TimelineEvent {
    /// Returns the event's timestamp.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Returns the raw event type string.
    fn event_type(&self) -> &str;

    /// Returns the produced unit count.
    fn count(&self) -> u32;

    /// Identifier used in diagnostics.
    fn event_id(&self) -> i64;
}

impl TimelineEvent for Event {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn event_type(&self) -> &str {
        &self.event_type
    }

    fn count(&self) -> u32 {
        self.count
    }

    fn event_id(&self) -> i64 {
        self.id
    }
}

impl<E: TimelineEvent> TimelineEvent for &E {
    fn timestamp(&self) -> DateTime<Utc> {
        (*self).timestamp()
    }

    fn event_type(&self) -> &str {
        (*self).event_type()
    }

    fn count(&self) -> u32 {
        (*self).count()
    }

    fn event_id(&self) -> i64 {
        (*self).event_id()
    }
}
