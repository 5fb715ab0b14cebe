use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    pub static ref PAGE_FETCH_DURATION: HistogramVec = register_histogram_vec!(
        "page_fetch_duration_seconds",
        "Duration of a single list page request in seconds",
        &["resource", "status"]
    ).unwrap();

    pub static ref AGGREGATION_COUNTER: IntCounterVec = register_int_counter_vec!(
        "aggregations_total",
        "Total number of paged aggregations",
        &["resource", "status"]
    ).unwrap();

    pub static ref PAGES_FETCHED: IntCounterVec = register_int_counter_vec!(
        "pages_fetched_total",
        "Total number of list pages fetched",
        &["resource"]
    ).unwrap();

    pub static ref COUNT_MISMATCH_COUNTER: IntCounterVec = register_int_counter_vec!(
        "aggregation_count_mismatch_total",
        "Aggregations whose collected length differed from the backend's reported count",
        &["resource"]
    ).unwrap();
}

fn status_label(success: bool) -> &'static str {
    if success { "success" } else { "failure" }
}

pub fn record_page_fetch(resource: &str, success: bool, duration: f64) {
    PAGE_FETCH_DURATION
        .with_label_values(&[resource, status_label(success)])
        .observe(duration);
    if success {
        PAGES_FETCHED.with_label_values(&[resource]).inc();
    }
}

pub fn record_aggregation(resource: &str, success: bool) {
    AGGREGATION_COUNTER
        .with_label_values(&[resource, status_label(success)])
        .inc();
}

pub fn record_count_mismatch(resource: &str) {
    COUNT_MISMATCH_COUNTER.with_label_values(&[resource]).inc();
}

/// Prometheus text exposition of everything registered in the default registry.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if encoder.encode(&prometheus::gather(), &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics_are_rendered() {
        record_aggregation("metrics_test", true);
        record_page_fetch("metrics_test", true, 0.01);
        let text = render();
        assert!(text.contains("aggregations_total"));
        assert!(text.contains("pages_fetched_total"));
    }
}
