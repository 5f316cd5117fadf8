//! HTTP server and liveness arbitration configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Server configuration parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ServerConfig {
    /// Bind address for the HTTP API, `host:port`.
    #[validate(custom(function = validation::validate_bind_addr))]
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Seconds of live-stream silence before a consumer degrades to replay.
    #[validate(range(min = 5, max = 600))]
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_secs: u64,

    /// Seconds between liveness re-evaluations.
    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_check_interval")]
    pub mode_check_interval_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}

fn default_liveness_timeout() -> u64 {
    30
}

fn default_check_interval() -> u64 {
    5
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            liveness_timeout_secs: default_liveness_timeout(),
            mode_check_interval_secs: default_check_interval(),
        }
    }
}

impl ServerConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_secs(self.liveness_timeout_secs)
    }

    pub fn mode_check_interval(&self) -> Duration {
        Duration::from_secs(self.mode_check_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn malformed_bind_address_is_rejected() {
        let config = ServerConfig {
            bind: "not-an-address".into(),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
