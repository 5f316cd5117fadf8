//! GeoIP resolution configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// GeoIP resolver parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct GeoConfig {
    /// Whether command streams are geo-enriched at all. When disabled the
    /// MaxMind database is never opened.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path to a MaxMind City database (`.mmdb`).
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_enabled() -> bool {
    true
}

fn default_database() -> PathBuf {
    PathBuf::from("data/GeoLite2-City.mmdb")
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            database: default_database(),
        }
    }
}
