//! Core data types for the modgraph module tool.
//!
//! This crate defines the values every other crate passes around: versions
//! and version ranges, releases and their requirements, the `metadata.json`
//! model of an installed module, and the global configuration file.
//!
//! This crate is intentionally free of async code and network I/O.

/// Registry queried when neither the CLI nor the config file names one.
pub const DEFAULT_REGISTRY_URL: &str = "https://forgeapi.example.org";

pub mod config;
pub mod inventory;
pub mod metadata;
pub mod release;
pub mod version;
