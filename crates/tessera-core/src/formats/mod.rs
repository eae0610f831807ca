//! # Formats
//!
//! Binary snapshot encoding for persisted models.

pub mod persistence;

pub use persistence::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
