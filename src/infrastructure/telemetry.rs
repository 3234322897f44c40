//! Prometheus metrics for the announcement pipeline
//!
//! Recording goes through the `metrics` facade and is a no-op until
//! [`init_metrics`] installs the exporter.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with an HTTP scrape listener
pub fn init_metrics(listen: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(listen)
        .set_buckets_for_metric(
            Matcher::Full("session_recovery_duration_seconds".to_string()),
            &[0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0],
        )?
        .install()?;

    describe_counter!(
        "announcements_enqueued_total",
        "Total number of announcements accepted into the queue"
    );
    describe_counter!(
        "announcements_completed_total",
        "Total number of announcements that finished both phases"
    );
    describe_counter!(
        "announcements_dropped_total",
        "Total number of announcements discarded without finishing"
    );
    describe_counter!(
        "focus_interruptions_total",
        "Total number of times the output device was ceded"
    );
    describe_counter!(
        "session_recoveries_total",
        "Total number of output session recovery cycles"
    );
    describe_histogram!(
        "session_recovery_duration_seconds",
        "Output session recovery duration in seconds"
    );
    describe_gauge!(
        "announcement_queue_depth",
        "Announcements waiting behind the one in flight"
    );

    Ok(())
}

pub fn record_enqueued() {
    counter!("announcements_enqueued_total").increment(1);
}

pub fn record_completed() {
    counter!("announcements_completed_total").increment(1);
}

pub fn record_dropped(reason: &str) {
    counter!("announcements_dropped_total", "reason" => reason.to_string()).increment(1);
}

pub fn record_focus_interruption() {
    counter!("focus_interruptions_total").increment(1);
}

/// Record a recovery cycle; `outcome` is "clean", "forced_stop" or "failed"
pub fn record_session_recovery(outcome: &str, duration: Duration) {
    counter!("session_recoveries_total", "outcome" => outcome.to_string()).increment(1);
    histogram!("session_recovery_duration_seconds").record(duration.as_secs_f64());
}

pub fn set_queue_depth(depth: usize) {
    gauge!("announcement_queue_depth").set(depth as f64);
}
