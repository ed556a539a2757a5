//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sf_core::EventType;

/// Shop-floor productivity metrics.
///
/// Records sensor events for workers and workstations and derives
/// utilization and throughput from them.
#[derive(Debug, Parser)]
#[command(name = "sf", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show store contents at a glance.
    Status,

    /// Compute factory, worker and workstation metrics.
    Metrics {
        /// Output as JSON.
        #[arg(long)]
        json: bool,

        /// Only use events at or after this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        since: Option<String>,

        /// Only use events before this time (ISO 8601 or "2 hours ago").
        #[arg(long)]
        until: Option<String>,
    },

    /// Record a sensor event.
    Record {
        /// Worker the event is attributed to.
        #[arg(long)]
        worker: String,

        /// Workstation the event is attributed to.
        #[arg(long)]
        station: String,

        /// Event type: working, idle, absent or `product_count`.
        #[arg(long = "type")]
        event_type: EventType,

        /// When the event occurred (ISO 8601 or "2 hours ago"). Defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Sensor confidence between 0.0 and 1.0.
        #[arg(long, default_value_t = 1.0)]
        confidence: f64,

        /// Units produced (`product_count` events only).
        #[arg(long)]
        count: Option<u32>,
    },

    /// Seed a simulated shift if the store is empty.
    Seed {
        /// Random seed for a reproducible shift.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage the worker registry.
    #[command(subcommand)]
    Workers(RegistryAction),

    /// Manage the workstation registry.
    #[command(subcommand)]
    Stations(RegistryAction),
}

/// Registry subcommands shared by workers and workstations.
#[derive(Debug, Subcommand)]
pub enum RegistryAction {
    /// Register an entity, or update its display attribute.
    Add {
        /// Stable identifier (e.g. W1 or S1).
        id: String,

        /// Worker name or workstation type.
        label: String,
    },

    /// List registered entities.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
