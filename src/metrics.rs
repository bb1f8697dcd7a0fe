use once_cell::sync::Lazy;
use prometheus::{
    Encoder, Histogram, IntCounter, IntCounterVec, TextEncoder, register_histogram,
    register_int_counter, register_int_counter_vec,
};

pub static REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chart_signal_requests_total",
        "Handled invocations by response status",
        &["status"]
    )
    .expect("requests counter")
});

pub static UPSTREAM_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "chart_signal_upstream_latency_seconds",
        "Vision model call latency",
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0]
    )
    .expect("upstream_latency histogram")
});

pub static UPSTREAM_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chart_signal_upstream_failures_total",
        "Vision model calls that failed before returning text"
    )
    .expect("upstream_failures counter")
});

pub static PARSE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chart_signal_parse_failures_total",
        "Model replies rejected by the signal parser"
    )
    .expect("parse_failures counter")
});

pub fn inc_requests(status: u16) {
    let status = status.to_string();
    REQUESTS.with_label_values(&[status.as_str()]).inc();
}

pub fn observe_upstream_latency(duration_sec: f64) {
    UPSTREAM_LATENCY.observe(duration_sec);
}

pub fn inc_upstream_failures() {
    UPSTREAM_FAILURES.inc();
}

pub fn inc_parse_failures() {
    PARSE_FAILURES.inc();
}

/// Prometheus text exposition of the default registry.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
