//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sf_core::{DEFAULT_GAP_CAP_SECONDS, MetricsConfig};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Inter-event gaps longer than this many seconds are discarded.
    pub gap_cap_seconds: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("sf.db"),
            gap_cap_seconds: DEFAULT_GAP_CAP_SECONDS,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let platform_file = dirs_config_path().map(|dir| dir.join("config.toml"));

        // Later layers win: defaults, platform file, --config, then SF_* env.
        let figment = [platform_file.as_deref(), config_path]
            .into_iter()
            .flatten()
            .fold(
                Figment::from(Serialized::defaults(Self::default())),
                |figment, file| figment.merge(Toml::file(file)),
            )
            .merge(Env::prefixed("SF_"));

        figment.extract()
    }

    /// Metrics settings derived from this configuration.
    pub fn metrics(&self) -> MetricsConfig {
        MetricsConfig {
            gap_cap_seconds: self.gap_cap_seconds,
            ..MetricsConfig::default()
        }
    }
}

/// Returns the platform-specific config directory for sf.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("sf"))
}

/// Returns the platform-specific data directory for sf.
///
/// On Linux: `~/.local/share/sf`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("sf"))
}
