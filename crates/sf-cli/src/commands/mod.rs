//! CLI subcommand implementations.

pub mod metrics;
pub mod record;
pub mod registry;
pub mod seed;
pub mod status;
mod util;
