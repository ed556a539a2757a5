//! Interval reconstruction.
//!
//! Turns a sparse, ordered event sequence into continuous state segments.
//!
//! # Timeline Model
//!
//! 1. The state named by an event holds from its timestamp until the next
//!    event for the same entity.
//! 2. Each adjacent pair of events yields one [`Segment`] attributed to the
//!    *earlier* event's type. The last event opens no segment.
//! 3. Segments longer than the gap cap, or with a negative delta, are
//!    discarded (duration `0`), never clamped.
//! 4. `product_count` units are summed over every event, including the last.
//!
//! Which segment types count as duration is up to the consumer; see
//! [`Timeline::duration_where`].

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::event::TimelineEvent;
use crate::event_type::EventType;

/// Default gap cap: one hour.
pub const DEFAULT_GAP_CAP_SECONDS: u32 = 3600;

/// One interval between two consecutive events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Type of the event that opened the segment (`None` if unknown).
    pub state: Option<EventType>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Contributed duration; `0` when the segment was discarded.
    pub duration_seconds: f64,
    /// Whether the raw delta was discarded by the gap cap or misordering.
    pub discarded: bool,
}

/// Reconstructed timeline for a single entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub segments: Vec<Segment>,
    /// Sum of `product_count` counts across all events.
    pub units_produced: u64,
    /// Timestamps of the first and last event, if any.
    pub span: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl Timeline {
    /// Sums contributed durations of segments whose start type matches.
    ///
    /// Segments opened by unknown event types never match.
    pub fn duration_where(&self, bearing: impl Fn(EventType) -> bool) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.state.is_some_and(&bearing))
            .map(|s| s.duration_seconds)
            .sum()
    }

    /// Raw first-to-last span in seconds, without gap capping.
    ///
    /// Empty timelines have a zero-length range.
    pub fn observed_range_seconds(&self) -> f64 {
        self.span
            .map_or(0.0, |(first, last)| delta_seconds(first, last))
    }
}

/// Reconstructs the state timeline of one entity.
///
/// Events must be sorted by timestamp ascending, ties in arrival order.
/// Out-of-order input does not fail: negative deltas are discarded.
pub fn reconstruct<E: TimelineEvent>(events: &[E], gap_cap_seconds: u32) -> Timeline {
    let gap_cap = f64::from(gap_cap_seconds);

    let kinds: Vec<Option<EventType>> = events
        .iter()
        .map(|event| match event.event_type().parse::<EventType>() {
            Ok(kind) => Some(kind),
            Err(err) => {
                warn!(event_id = event.event_id(), %err, "ignoring event with unknown type");
                None
            }
        })
        .collect();

    let units_produced = events
        .iter()
        .zip(&kinds)
        .filter(|(_, kind)| **kind == Some(EventType::ProductCount))
        .map(|(event, _)| u64::from(event.count()))
        .sum();

    let segments = events
        .windows(2)
        .zip(&kinds)
        .map(|(pair, state)| {
            let start = pair[0].timestamp();
            let end = pair[1].timestamp();
            let raw = delta_seconds(start, end);
            let discarded = raw < 0.0 || raw > gap_cap;
            if raw < 0.0 {
                debug!(
                    event_id = pair[1].event_id(),
                    delta_seconds = raw,
                    "discarding negative interval from out-of-order events"
                );
            }
            Segment {
                state: *state,
                start,
                end,
                duration_seconds: if discarded { 0.0 } else { raw },
                discarded,
            }
        })
        .collect();

    let span = events
        .first()
        .zip(events.last())
        .map(|(first, last)| (first.timestamp(), last.timestamp()));

    Timeline {
        segments,
        units_produced,
        span,
    }
}

#[allow(clippy::cast_precision_loss)]
fn delta_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / 1000.0
}
