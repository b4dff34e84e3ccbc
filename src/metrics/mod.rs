//! Prometheus metrics for the dispatch engine.
//!
//! Counters track lifecycle transitions by channel; the bulk histogram
//! records batch sizes. Purely observational: no engine logic depends on
//! these succeeding.

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

use crate::notification::Channel;

/// Prefix for all metrics
const METRIC_PREFIX: &str = "notify";

lazy_static! {
    /// Notifications created, by channel
    pub static ref NOTIFICATIONS_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_created_total", METRIC_PREFIX),
        "Total notification records created",
        &["channel"]
    ).unwrap();

    /// Notifications handed to a channel sender without error, by channel
    pub static ref NOTIFICATIONS_SENT_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_sent_total", METRIC_PREFIX),
        "Total notifications dispatched successfully",
        &["channel"]
    ).unwrap();

    /// Dispatch failures, by channel
    pub static ref NOTIFICATIONS_FAILED_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_failed_total", METRIC_PREFIX),
        "Total notification dispatch failures",
        &["channel"]
    ).unwrap();

    /// Retry attempts started
    pub static ref NOTIFICATIONS_RETRIED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_retried_total", METRIC_PREFIX),
        "Total notification retry attempts"
    ).unwrap();

    /// Pending notifications cancelled
    pub static ref NOTIFICATIONS_CANCELLED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_notifications_cancelled_total", METRIC_PREFIX),
        "Total notifications cancelled while pending"
    ).unwrap();

    /// Notifications per bulk request
    pub static ref BULK_SIZE: Histogram = register_histogram!(
        format!("{}_bulk_size", METRIC_PREFIX),
        "Number of notifications per bulk send",
        vec![1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 100.0]
    ).unwrap();
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording dispatch metrics
pub struct DispatchMetrics;

impl DispatchMetrics {
    pub fn record_created(channel: Channel) {
        NOTIFICATIONS_CREATED_TOTAL
            .with_label_values(&[channel.as_str()])
            .inc();
    }

    pub fn record_sent(channel: Channel) {
        NOTIFICATIONS_SENT_TOTAL
            .with_label_values(&[channel.as_str()])
            .inc();
    }

    pub fn record_failed(channel: Channel) {
        NOTIFICATIONS_FAILED_TOTAL
            .with_label_values(&[channel.as_str()])
            .inc();
    }

    pub fn record_retried() {
        NOTIFICATIONS_RETRIED_TOTAL.inc();
    }

    pub fn record_cancelled() {
        NOTIFICATIONS_CANCELLED_TOTAL.inc();
    }

    pub fn record_bulk(size: usize) {
        BULK_SIZE.observe(size as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static requires first access before gather sees the family
        DispatchMetrics::record_created(Channel::Email);

        let result = encode_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("notify_notifications_created_total"));
    }

    #[test]
    fn test_record_helpers_do_not_panic() {
        DispatchMetrics::record_sent(Channel::Sms);
        DispatchMetrics::record_failed(Channel::Push);
        DispatchMetrics::record_retried();
        DispatchMetrics::record_cancelled();
        DispatchMetrics::record_bulk(10);
    }
}
