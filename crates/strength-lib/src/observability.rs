//! Observability infrastructure for the prediction server
//!
//! Provides:
//! - Prometheus metrics (prediction latency, batch sizes, outcome counters, model info)
//! - Structured JSON logging with tracing

use prometheus::{
    register_gauge_vec, register_histogram, register_int_counter, GaugeVec, Histogram,
    IntCounter,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for batch sizes (rows)
const BATCH_ROW_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0];

static GLOBAL_METRICS: OnceLock<StrengthMetricsInner> = OnceLock::new();

struct StrengthMetricsInner {
    prediction_latency_seconds: Histogram,
    batch_rows: Histogram,
    predictions_total: IntCounter,
    batch_predictions_total: IntCounter,
    validation_failures_total: IntCounter,
    prediction_errors_total: IntCounter,
    model_info: GaugeVec,
}

impl StrengthMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "concreteiq_prediction_latency_seconds",
                "Time spent running model inference",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            batch_rows: register_histogram!(
                "concreteiq_batch_rows",
                "Number of rows per batch prediction",
                BATCH_ROW_BUCKETS.to_vec()
            )
            .expect("Failed to register batch_rows"),

            predictions_total: register_int_counter!(
                "concreteiq_predictions_total",
                "Total number of single predictions served"
            )
            .expect("Failed to register predictions_total"),

            batch_predictions_total: register_int_counter!(
                "concreteiq_batch_predictions_total",
                "Total number of completed batch predictions"
            )
            .expect("Failed to register batch_predictions_total"),

            validation_failures_total: register_int_counter!(
                "concreteiq_validation_failures_total",
                "Total number of mix designs rejected by validation"
            )
            .expect("Failed to register validation_failures_total"),

            prediction_errors_total: register_int_counter!(
                "concreteiq_prediction_errors_total",
                "Total number of failed predictions"
            )
            .expect("Failed to register prediction_errors_total"),

            model_info: register_gauge_vec!(
                "concreteiq_model_info",
                "Information about the loaded model artifact",
                &["algorithm", "schema"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide Prometheus metrics.
///
/// Clones share the same underlying registry entries.
#[derive(Clone)]
pub struct StrengthMetrics {
    _private: (),
}

impl Default for StrengthMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl StrengthMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(StrengthMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &StrengthMetricsInner {
        GLOBAL_METRICS.get_or_init(StrengthMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Record a completed batch and its size
    pub fn observe_batch(&self, rows: usize) {
        self.inner().batch_rows.observe(rows as f64);
        self.inner().batch_predictions_total.inc();
    }

    pub fn inc_validation_failures(&self) {
        self.inner().validation_failures_total.inc();
    }

    pub fn inc_prediction_errors(&self) {
        self.inner().prediction_errors_total.inc();
    }

    pub fn set_model_info(&self, algorithm: &str, schema: &str) {
        self.inner().model_info.reset();
        self.inner()
            .model_info
            .with_label_values(&[algorithm, schema])
            .set(1.0);
    }

    pub fn predictions_total(&self) -> u64 {
        self.inner().predictions_total.get()
    }
}

/// Structured logger for server events
///
/// Emits consistent event-typed records for predictions, rejected input
/// and lifecycle changes.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    pub fn log_startup(&self, version: &str, algorithm: &str, schema: &str, port: u16) {
        info!(
            event = "server_started",
            instance = %self.instance,
            server_version = %version,
            algorithm = %algorithm,
            schema = %schema,
            port = port,
            "Strength prediction server started"
        );
    }

    pub fn log_prediction(
        &self,
        session: &str,
        prediction_mpa: f64,
        grade: &str,
        water_cement_ratio: f64,
    ) {
        info!(
            event = "prediction_generated",
            instance = %self.instance,
            session = %session,
            prediction_mpa = prediction_mpa,
            grade = %grade,
            water_cement_ratio = water_cement_ratio,
            "Generated strength prediction"
        );
    }

    pub fn log_batch(&self, rows: usize, mean_mpa: f64, min_mpa: f64, max_mpa: f64) {
        info!(
            event = "batch_completed",
            instance = %self.instance,
            rows = rows,
            mean_mpa = mean_mpa,
            min_mpa = min_mpa,
            max_mpa = max_mpa,
            "Batch prediction completed"
        );
    }

    pub fn log_rejected(&self, kind: &str, messages: &[String]) {
        warn!(
            event = "input_rejected",
            instance = %self.instance,
            kind = %kind,
            messages = ?messages,
            "Input rejected"
        );
    }

    pub fn log_failure(&self, error: &str) {
        warn!(
            event = "prediction_failed",
            instance = %self.instance,
            error = %error,
            "Prediction failed"
        );
    }

    pub fn log_history_cleared(&self, session: &str, removed: usize) {
        info!(
            event = "history_cleared",
            instance = %self.instance,
            session = %session,
            removed = removed,
            "Prediction history cleared"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "server_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Strength prediction server shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = StrengthMetrics::new();
        let other = metrics.clone();

        let before = metrics.predictions_total();
        metrics.observe_prediction_latency(0.002);
        metrics.observe_batch(3);
        metrics.inc_validation_failures();
        metrics.inc_prediction_errors();
        metrics.set_model_info("LinearRegression", "default");
        other.inc_predictions();

        assert!(metrics.predictions_total() > before);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("test-instance");
        assert_eq!(logger.instance(), "test-instance");
        logger.log_rejected("validation", &["Cement too low".to_string()]);
    }
}
