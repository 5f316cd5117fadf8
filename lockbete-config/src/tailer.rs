//! Tail and replay polling parameters.
//!
//! These drive the per-connection poll loops: how often the store is asked
//! for new rows, how much backlog the command stream delivers up front, and
//! how fast historical replay walks its virtual clock.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Tailer configuration parameters.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TailerConfig {
    /// Seconds between poll cycles on the live streams.
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Number of most-recent command rows delivered as immediate backlog
    /// when a command stream opens.
    #[validate(range(min = 1, max = 500))]
    #[serde(default = "default_initial_batch")]
    pub initial_batch: u32,

    /// Historical replay parameters.
    #[validate(nested)]
    #[serde(default)]
    pub replay: ReplayConfig,
}

fn default_poll_interval() -> u64 {
    3
}

fn default_initial_batch() -> u32 {
    20
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            initial_batch: default_initial_batch(),
            replay: ReplayConfig::default(),
        }
    }
}

impl TailerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Replay mode parameters. Defaults replay one minute of history every ten
/// real seconds, a 6x acceleration.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReplayConfig {
    /// Width of one virtual replay window, in seconds of historical time.
    #[validate(range(min = 1, max = 86400))]
    #[serde(default = "default_window")]
    pub window_secs: u64,

    /// Real seconds slept between windows.
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_replay_interval")]
    pub interval_secs: u64,
}

fn default_window() -> u64 {
    60
}

fn default_replay_interval() -> u64 {
    10
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window(),
            interval_secs: default_replay_interval(),
        }
    }
}

impl ReplayConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
