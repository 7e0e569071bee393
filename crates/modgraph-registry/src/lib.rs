//! Module registry protocol: listing releases from a Forge-style HTTP API
//! or a local fixture directory, and reading what is installed on disk.

pub mod api;
pub mod checksum;
pub mod client;
pub mod fixture;
pub mod inventory;
