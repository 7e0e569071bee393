//! Shared utilities for the modgraph module tool.
//!
//! This crate provides cross-cutting concerns used by all other modgraph crates:
//! the unified error type, filesystem helpers, checksum hashing, and terminal
//! status output.

pub mod errors;
pub mod fs;
pub mod hash;
pub mod progress;
