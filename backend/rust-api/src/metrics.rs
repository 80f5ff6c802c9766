use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Database Metrics (MongoDB)
    pub static ref DB_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "db_operations_total",
        "Total number of database operations",
        &["operation", "collection", "status"]
    )
    .unwrap();

    pub static ref DB_OPERATION_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "db_operation_duration_seconds",
        "Database operation duration in seconds",
        &["operation", "collection"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .unwrap();

    // Tutoring Metrics
    pub static ref ATTEMPTS_SUBMITTED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "attempts_submitted_total",
        "Total number of graded attempts",
        &["stage", "correct"]
    )
    .unwrap();

    pub static ref GATE_DENIALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gate_denials_total",
        "Stage access denials by reason",
        &["reason"]
    )
    .unwrap();

    pub static ref SECTION_BOOTSTRAPS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "section_bootstraps_total",
        "Next-section bootstrap outcomes",
        &["outcome"]
    )
    .unwrap();

    pub static ref STUDENT_LOGINS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "student_logins_total",
        "Student logins by outcome",
        &["outcome"]
    )
    .unwrap();
}

pub fn observe_db_operation(operation: &str, collection: &str, started: Instant, ok: bool) {
    let status = if ok { "success" } else { "error" };
    DB_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection, status])
        .inc();
    DB_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(started.elapsed().as_secs_f64());
}

pub fn record_attempt(stage: &str, correct: bool) {
    let correct = if correct { "true" } else { "false" };
    ATTEMPTS_SUBMITTED_TOTAL
        .with_label_values(&[stage, correct])
        .inc();
}

pub fn record_gate_denial(reason: &str) {
    GATE_DENIALS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_bootstrap(outcome: &str) {
    SECTION_BOOTSTRAPS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_login(created: bool) {
    let outcome = if created { "created" } else { "returning" };
    STUDENT_LOGINS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Render all registered metrics in Prometheus text format.
pub fn render_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| format!("Failed to encode metrics: {}", e))?;

    String::from_utf8(buffer).map_err(|e| format!("Failed to convert metrics to string: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_contains_tutoring_counters() {
        record_attempt("practice", true);
        record_gate_denial("practice_incomplete");

        let text = render_metrics().unwrap();
        assert!(text.contains("attempts_submitted_total"));
        assert!(text.contains("gate_denials_total"));
    }
}
