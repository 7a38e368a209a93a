//! Metrics collection for observability

use prometheus::{
    CounterVec, Encoder, HistogramVec, Opts, Registry, TextEncoder,
    register_counter_vec_with_registry, register_histogram_vec_with_registry,
};
use std::sync::Arc;
use std::time::Duration;
use once_cell::sync::Lazy;

/// Global metrics registry
pub static METRICS: Lazy<Arc<Metrics>> = Lazy::new(|| {
    Arc::new(Metrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct Metrics {
    registry: Registry,

    // HTTP API metrics
    pub http_requests: CounterVec,
    pub http_request_duration: HistogramVec,

    // Vision model metrics
    pub model_calls: CounterVec,

    // Control script metrics
    pub script_runs: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests = register_counter_vec_with_registry!(
            Opts::new("http_requests_total", "Total API requests by endpoint and status code"),
            &["endpoint", "status"],
            registry
        )?;

        let http_request_duration = register_histogram_vec_with_registry!(
            "http_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            registry
        )?;

        let model_calls = register_counter_vec_with_registry!(
            Opts::new("model_calls_total", "Vision model call attempts by outcome"),
            &["outcome"],
            registry
        )?;

        let script_runs = register_counter_vec_with_registry!(
            Opts::new("control_script_runs_total", "Control script executions by outcome"),
            &["outcome"],
            registry
        )?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self {
            registry,
            http_requests,
            http_request_duration,
            model_calls,
            script_runs,
        })
    }

    /// Get the metrics registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a finished API request
    pub fn record_request(&self, endpoint: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        self.http_requests
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
        self.http_request_duration
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
    }

    /// Record one model call attempt (`success`, `retry` or `error`)
    pub fn record_model_call(&self, outcome: &str) {
        self.model_calls.with_label_values(&[outcome]).inc();
    }

    /// Record a control script run (`success`, `failed` or `launch_error`)
    pub fn record_script_run(&self, outcome: &str) {
        self.script_runs.with_label_values(&[outcome]).inc();
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();

        String::from_utf8(buffer).unwrap_or_default()
    }
}
