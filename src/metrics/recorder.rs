//! Metrics recorder for the emulated link and filter chain

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return; // Already initialized
    }

    // Pipe counters
    describe_counter!(
        "bwe_pipe_packets_dropped_total",
        "Packets dropped by the fake network pipe"
    );
    describe_counter!(
        "bwe_pipe_packets_delivered_total",
        "Packets delivered to the receiver by the fake network pipe"
    );
    describe_counter!(
        "bwe_pipe_bytes_delivered_total",
        "Payload bytes delivered by the fake network pipe"
    );

    // Filter counters
    describe_counter!(
        "bwe_filter_packets_dropped_total",
        "Packets removed by filter chain stages"
    );

    // Gauges
    describe_gauge!(
        "bwe_pipe_queue_depth",
        "Packets waiting in a fake network pipe stage"
    );

    // Histograms
    describe_histogram!(
        "bwe_pipe_packet_delay_ms",
        "Scheduled delay from send to delivery"
    );
    describe_histogram!("bwe_rate_counter_pps", "Sliding window packet rate");
    describe_histogram!("bwe_rate_counter_kbps", "Sliding window bitrate");
}

/// Why the pipe refused a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    QueueFull,
    RandomLoss,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::QueueFull => "queue_full",
            DropReason::RandomLoss => "random_loss",
        }
    }
}

// ============== Pipe ==============

/// Record a packet dropped by the pipe
pub fn record_pipe_drop(reason: DropReason) {
    counter!("bwe_pipe_packets_dropped_total", "reason" => reason.as_str()).increment(1);
}

/// Record a packet handed to the receiver
pub fn record_pipe_delivery(bytes: usize, delay_ms: i64) {
    counter!("bwe_pipe_packets_delivered_total").increment(1);
    counter!("bwe_pipe_bytes_delivered_total").increment(bytes as u64);
    histogram!("bwe_pipe_packet_delay_ms").record(delay_ms as f64);
}

/// Update queue depth gauge
pub fn set_queue_depth(queue: &'static str, depth: usize) {
    gauge!("bwe_pipe_queue_depth", "queue" => queue).set(depth as f64);
}

// ============== Filter chain ==============

/// Record packets removed by a filter
pub fn record_filter_drops(stage: &'static str, count: usize) {
    counter!("bwe_filter_packets_dropped_total", "stage" => stage).increment(count as u64);
}

/// Record one rate-counter sample
pub fn record_rate(pps: f64, kbps: f64) {
    histogram!("bwe_rate_counter_pps").record(pps);
    histogram!("bwe_rate_counter_kbps").record(kbps);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics() {
        // Should not panic when called multiple times
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_recording_without_recorder() {
        record_pipe_drop(DropReason::QueueFull);
        record_pipe_delivery(1200, 52);
        set_queue_depth("capacity", 3);
        record_filter_drops("LossFilter", 2);
        record_rate(30.0, 256.0);
    }

    #[test]
    fn test_drop_reason_labels() {
        assert_eq!(DropReason::QueueFull.as_str(), "queue_full");
        assert_eq!(DropReason::RandomLoss.as_str(), "random_loss");
    }
}
