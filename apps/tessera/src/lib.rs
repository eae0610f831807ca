//! # Tessera Application Library
//!
//! The HTTP host and configuration loading, shared by the binary and the
//! integration tests.

pub mod api;
pub mod config;
