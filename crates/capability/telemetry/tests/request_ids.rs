use appng_telemetry::{metrics, new_correlation_id, new_request_ids, record_redirect};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn correlation_ids_are_numeric_and_distinct() {
    let first = new_correlation_id();
    let second = new_correlation_id();
    assert_ne!(first, second);
    assert!(first <= i64::MAX as u64);
    assert!(first.to_string().chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn counters_accumulate() {
    let before = metrics().snapshot().redirects;
    record_redirect();
    assert!(metrics().snapshot().redirects > before);
}
