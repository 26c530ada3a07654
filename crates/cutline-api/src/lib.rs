//! Axum HTTP API for silence analysis.
//!
//! This crate provides:
//! - Silence analysis over the cached analysis service
//! - Timeline mapping for the preview scrub head
//! - Health checks and Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
