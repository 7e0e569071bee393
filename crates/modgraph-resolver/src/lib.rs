//! Dependency resolution engine: release graph, release sources, the
//! constraint-satisfaction search, and the installation planner.
//!
//! Data flows one way: sources feed the [`graph::Graph`], the
//! [`resolver::Resolver`] picks one release per module, and [`plan`] turns
//! the projected tree into install actions.

pub mod conflict;
pub mod error;
pub mod graph;
pub mod install_dir;
pub mod plan;
pub mod resolution;
pub mod resolver;
pub mod source;
pub mod tree;
