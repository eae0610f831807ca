//! # API Response Types
//!
//! Batch calls use the engine's own `BatchCall`/`BatchResponse`; only the
//! health check has a shape of its own.

use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Models currently held in memory.
    pub models: usize,
}

impl HealthResponse {
    #[must_use]
    pub fn new(models: usize) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            models,
        }
    }
}
