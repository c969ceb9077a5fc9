//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Backend attempts (per backend and outcome)
//! - Record conversions (terminal result of each attempt)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Backend Metrics
// =============================================================================

/// Backend attempts by backend and outcome.
pub static BACKEND_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tuneshift_backend_attempts_total",
            "Total conversion attempts per backend",
        ),
        &["backend", "outcome"], // outcome: "converted", "unavailable", "failed"
    )
    .unwrap()
});

/// Backend attempt duration in seconds.
pub static BACKEND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tuneshift_conversion_duration_seconds",
            "Duration of a single backend attempt",
        )
        .buckets(vec![0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["backend"],
    )
    .unwrap()
});

// =============================================================================
// Record Metrics
// =============================================================================

/// Record conversion attempts by terminal result.
pub static RECORD_CONVERSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tuneshift_record_conversions_total",
            "Total record conversion attempts",
        ),
        &["result"], // "success", "failed", "conflict"
    )
    .unwrap()
});

/// All core metrics, for registration in the server's registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(BACKEND_ATTEMPTS.clone()),
        Box::new(BACKEND_DURATION.clone()),
        Box::new(RECORD_CONVERSIONS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn test_all_metrics_register() {
        let registry = Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        BACKEND_ATTEMPTS
            .with_label_values(&["ffmpeg", "converted"])
            .inc();
        RECORD_CONVERSIONS.with_label_values(&["success"]).inc();

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|mf| mf.get_name().to_string())
            .collect();
        assert!(names.contains(&"tuneshift_backend_attempts_total".to_string()));
        assert!(names.contains(&"tuneshift_record_conversions_total".to_string()));
    }
}
