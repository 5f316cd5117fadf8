//! Shared application state.

use std::sync::Arc;

use lockbete_config::LockbeteConfig;
use lockbete_geo::GeoResolver;
use lockbete_store::EventStore;
use lockbete_telemetry::MetricsRecorder;

/// Everything the handlers need. Cheap to clone; all heavy members are
/// shared behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub geo: Arc<GeoResolver>,
    pub config: Arc<LockbeteConfig>,
    pub metrics: MetricsRecorder,
}

impl AppState {
    pub fn new(
        store: Arc<dyn EventStore>,
        geo: Arc<GeoResolver>,
        config: LockbeteConfig,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            store,
            geo,
            config: Arc::new(config),
            metrics,
        }
    }
}
