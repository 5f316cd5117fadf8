//! Live/replay mode arbitration.
//!
//! A consumer normally follows the live stream. When no live batch has
//! arrived within the liveness timeout it degrades to replay. Degradation
//! is not one-way: the liveness probe keeps running while in replay mode,
//! and the first live batch promotes the consumer straight back to live.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;

use crate::session::StreamSession;

/// Which feed the consumer should currently follow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamMode {
    Live,
    Replay,
}

pub struct ModeArbiter {
    liveness_timeout: Duration,
    check_interval: Duration,
    last_live: Mutex<Instant>,
    mode: watch::Sender<StreamMode>,
}

impl ModeArbiter {
    pub fn new(liveness_timeout: Duration, check_interval: Duration) -> Self {
        let (mode, _) = watch::channel(StreamMode::Live);
        Self {
            liveness_timeout,
            check_interval,
            last_live: Mutex::new(Instant::now()),
            mode,
        }
    }

    /// Mode updates for a consumer to follow.
    pub fn subscribe(&self) -> watch::Receiver<StreamMode> {
        self.mode.subscribe()
    }

    pub fn current(&self) -> StreamMode {
        *self.mode.borrow()
    }

    /// Records that a live batch arrived. Promotes back to live
    /// immediately when replaying.
    pub fn note_live_batch(&self) {
        *self.last_live.lock() = Instant::now();
        if self.current() == StreamMode::Replay {
            info!("live traffic resumed, leaving replay mode");
            self.mode.send_replace(StreamMode::Live);
        }
    }

    /// Periodic liveness evaluation. Runs until the session closes.
    pub async fn run(&self, session: StreamSession) {
        while session.sleep(self.check_interval).await {
            let silent_for = self.last_live.lock().elapsed();
            if self.current() == StreamMode::Live && silent_for >= self.liveness_timeout {
                info!(silent_secs = silent_for.as_secs(), "live stream silent, degrading to replay");
                self.mode.send_replace(StreamMode::Replay);
            }
        }
    }
}
