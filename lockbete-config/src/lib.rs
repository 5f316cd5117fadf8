//! # Lockbete Configuration System
//!
//! Hierarchical configuration for the honeypot monitor.
//!
//! ## Features
//! - **Unified Configuration**: single source of truth across all components
//! - **Validation**: runtime validation of intervals, paths, and addresses
//! - **Environment Awareness**: `LOCKBETE_*` variables override file values

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

mod error;
mod geo;
mod server;
mod store;
mod tailer;
mod validation;

pub use error::ConfigError;
pub use geo::GeoConfig;
pub use server::ServerConfig;
pub use store::StoreConfig;
pub use tailer::{ReplayConfig, TailerConfig};

/// Top-level configuration container for all Lockbete components.
#[derive(Debug, Serialize, Deserialize, Validate, Default, Clone)]
pub struct LockbeteConfig {
    /// Event store location.
    #[validate(nested)]
    pub store: StoreConfig,

    /// Tail/replay polling parameters.
    #[validate(nested)]
    pub tailer: TailerConfig,

    /// GeoIP resolution parameters.
    #[validate(nested)]
    pub geo: GeoConfig,

    /// HTTP server and liveness arbitration parameters.
    #[validate(nested)]
    pub server: ServerConfig,
}

impl LockbeteConfig {
    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. Default values
    /// 2. `config/lockbete.yaml` - base settings. If missing, defaults are used.
    /// 3. `LOCKBETE_*` environment variables (nested keys joined with `__`).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(LockbeteConfig::default()));

        if Path::new("config/lockbete.yaml").exists() {
            figment = figment.merge(Yaml::file("config/lockbete.yaml"));
        }

        figment
            .merge(Env::prefixed("LOCKBETE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(PathBuf::from(
                path.to_string_lossy().to_string(),
            )));
        }

        Figment::from(Serialized::defaults(LockbeteConfig::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed("LOCKBETE_").split("__"))
            .extract()
            .map_err(ConfigError::from)
            .and_then(|config: Self| {
                config.validate()?;
                Ok(config)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config_validation() {
        let config = LockbeteConfig::default();
        config.validate().expect("Default config should validate");
    }

    #[test]
    fn environment_override() {
        std::env::set_var("LOCKBETE_TAILER__POLL_INTERVAL_SECS", "7");
        let config = LockbeteConfig::load().unwrap();
        assert_eq!(config.tailer.poll_interval_secs, 7);
        std::env::remove_var("LOCKBETE_TAILER__POLL_INTERVAL_SECS");
    }

    #[test]
    fn missing_file_is_reported() {
        let err = LockbeteConfig::load_from_path("config/does-not-exist.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }
}
