//! Analysis metrics.
//!
//! Recorded through the `metrics` facade; the hosting binary decides
//! whether a recorder is installed.

use std::time::Duration;

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const ANALYSES_TOTAL: &str = "cutline_analyses_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "cutline_analysis_duration_seconds";
    pub const CACHE_HITS_TOTAL: &str = "cutline_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "cutline_cache_misses_total";
    pub const CACHE_WRITE_FAILURES_TOTAL: &str = "cutline_cache_write_failures_total";
    pub const SINGLE_FLIGHT_WAITS_TOTAL: &str = "cutline_single_flight_waits_total";
    pub const SILENCE_SEGMENTS: &str = "cutline_silence_segments";
}

/// Outcome label for a finished analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisOutcome {
    Computed,
    Cached,
    Failed,
    Cancelled,
    TimedOut,
}

impl AnalysisOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisOutcome::Computed => "computed",
            AnalysisOutcome::Cached => "cached",
            AnalysisOutcome::Failed => "failed",
            AnalysisOutcome::Cancelled => "cancelled",
            AnalysisOutcome::TimedOut => "timed_out",
        }
    }
}

/// Record a finished analysis request.
pub fn record_analysis(outcome: AnalysisOutcome, elapsed: Duration) {
    let labels = [("outcome", outcome.as_str().to_string())];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

pub fn record_cache_write_failure() {
    counter!(names::CACHE_WRITE_FAILURES_TOTAL).increment(1);
}

/// Record a request that waited on an in-flight computation of the same key.
pub fn record_single_flight_wait() {
    counter!(names::SINGLE_FLIGHT_WAITS_TOTAL).increment(1);
}

pub fn record_silence_segments(count: usize) {
    histogram!(names::SILENCE_SEGMENTS).record(count as f64);
}
