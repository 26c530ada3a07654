//! Silence analysis service.
//!
//! This crate provides:
//! - Cached, single-flight analysis of video audio tracks
//! - Cooperative cancellation and per-analysis timeouts
//! - Structured analysis logging and metrics
//! - The `cutline-analyze` command-line tool

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::AnalysisLogger;
pub use service::{AnalysisOutput, AnalysisService};
