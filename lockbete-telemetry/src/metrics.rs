//! Prometheus metrics for the streaming pipeline.

use prometheus::{Counter, IntGauge, Registry};

#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    pub registry: Registry,
    /// Non-empty batches pushed onto any stream.
    pub batches_emitted: Counter,
    /// Individual rows carried by those batches.
    pub rows_emitted: Counter,
    /// Streams currently in the Active state.
    pub open_streams: IntGauge,
    /// Store query failures that closed a stream.
    pub store_failures: Counter,
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRecorder {
    pub fn new() -> Self {
        let registry = Registry::new();
        let batches_emitted =
            Counter::new("lockbete_batches_total", "Non-empty batches emitted").unwrap();
        let rows_emitted =
            Counter::new("lockbete_rows_total", "Event rows emitted in batches").unwrap();
        let open_streams =
            IntGauge::new("lockbete_open_streams", "Streaming connections currently open").unwrap();
        let store_failures = Counter::new(
            "lockbete_store_failures_total",
            "Store query failures that terminated a stream",
        )
        .unwrap();

        registry.register(Box::new(batches_emitted.clone())).unwrap();
        registry.register(Box::new(rows_emitted.clone())).unwrap();
        registry.register(Box::new(open_streams.clone())).unwrap();
        registry.register(Box::new(store_failures.clone())).unwrap();

        Self {
            registry,
            batches_emitted,
            rows_emitted,
            open_streams,
            store_failures,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }

    pub fn record_batch(&self, rows: usize) {
        self.batches_emitted.inc();
        self.rows_emitted.inc_by(rows as f64);
    }
}
