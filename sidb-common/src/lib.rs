//! # sidb Common Library
//!
//! Shared code for the sidb data-enrichment services:
//! - Error type and result alias
//! - TOML bootstrap configuration and per-source overrides
//! - Config file and data directory resolution

pub mod config;
pub mod error;

pub use error::{Error, Result};
