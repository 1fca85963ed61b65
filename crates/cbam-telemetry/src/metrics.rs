//! Prometheus metrics for emission accounting.
//!
//! All metrics live in a dedicated registry and are exposed in the text
//! exposition format by `gather_metrics`.

use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ========================================================================
    // Attribution
    // ========================================================================

    /// Emission records written by attribution
    pub static ref ATTRIBUTIONS_CALCULATED: Counter = Counter::new(
        "cbam_attributions_calculated_total",
        "Emission records written by attribution"
    ).expect("metric creation failed");

    // ========================================================================
    // Propagation
    // ========================================================================

    /// Propagation steps applied, by propagation type
    pub static ref PROPAGATION_STEPS: CounterVec = CounterVec::new(
        Opts::new("cbam_propagation_steps_total", "Propagation steps applied"),
        &["propagation_type"]
    ).expect("metric creation failed");

    /// Chain propagation runs
    pub static ref CHAIN_PROPAGATIONS: Counter = Counter::new(
        "cbam_chain_propagations_total",
        "Chain propagation runs"
    ).expect("metric creation failed");

    /// Graph propagation runs
    pub static ref GRAPH_PROPAGATIONS: Counter = Counter::new(
        "cbam_graph_propagations_total",
        "Graph propagation runs"
    ).expect("metric creation failed");

    /// Processes visited per graph propagation
    pub static ref GRAPH_SIZE: Histogram = Histogram::with_opts(
        HistogramOpts::new("cbam_graph_processes", "Processes visited per graph propagation")
            .buckets(vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 10000.0])
    ).expect("metric creation failed");

    // ========================================================================
    // Operations
    // ========================================================================

    /// Failed operations, by operation and error kind
    pub static ref OPERATION_FAILURES: CounterVec = CounterVec::new(
        Opts::new("cbam_operation_failures_total", "Failed operations"),
        &["operation", "kind"]
    ).expect("metric creation failed");

    /// Operation latency in seconds
    pub static ref OPERATION_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new("cbam_operation_duration_seconds", "Operation latency")
            .buckets(prometheus::exponential_buckets(0.0001, 2.0, 16).expect("valid buckets")),
        &["operation"]
    ).expect("metric creation failed");
}

/// Register all metrics with the registry. Safe to call more than once.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ATTRIBUTIONS_CALCULATED.clone()),
        Box::new(PROPAGATION_STEPS.clone()),
        Box::new(CHAIN_PROPAGATIONS.clone()),
        Box::new(GRAPH_PROPAGATIONS.clone()),
        Box::new(GRAPH_SIZE.clone()),
        Box::new(OPERATION_FAILURES.clone()),
        Box::new(OPERATION_DURATION.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Encode the registry in the Prometheus text format.
pub fn gather_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count one failed operation.
pub fn record_failure(operation: &str, kind: &str) {
    OPERATION_FAILURES
        .with_label_values(&[operation, kind])
        .inc();
}

/// Helper to time operations
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            histogram,
            start: std::time::Instant::now(),
        }
    }

    /// Timer feeding `OPERATION_DURATION` for one operation.
    pub fn for_operation(operation: &str) -> Self {
        Self::new(OPERATION_DURATION.with_label_values(&[operation]))
    }

    pub fn observe(self) {
        // Drop does the work
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram
            .observe(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_gather_contains_recorded_failure() {
        register_metrics().unwrap();
        record_failure("propagate_chain", "not_found");

        let text = gather_metrics().unwrap();
        assert!(text.contains("cbam_operation_failures_total"));
        assert!(text.contains(r#"operation="propagate_chain""#));
    }

    #[test]
    fn test_timer_observes_on_drop() {
        let histogram = OPERATION_DURATION.with_label_values(&["timer_test"]);
        let before = histogram.get_sample_count();
        HistogramTimer::for_operation("timer_test").observe();
        assert_eq!(histogram.get_sample_count(), before + 1);
    }
}
