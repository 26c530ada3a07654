//! Local storage for silence analysis results.
//!
//! This crate provides:
//! - Content signatures and parameter-aware cache keys
//! - Gzip-compressed JSON encoding of analysis results
//! - An on-disk cache with atomic writes and self-healing reads

pub mod analysis_cache;
pub mod error;

pub use analysis_cache::{
    analysis_cache_key, compress_analysis, decompress_analysis, AnalysisCache, CacheKey,
    ContentSignature, StoreResult,
};
pub use error::{StorageError, StorageResult};
