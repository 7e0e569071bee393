//! CLI argument definitions for modgraph.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "modgraph",
    version,
    about = "Install and upgrade modules with dependency resolution",
    long_about = "modgraph resolves a module's dependency graph against a release registry \
                  and the modules already installed on the module path, then plans \
                  installs and upgrades that keep every installed module satisfied."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directories searched for installed modules (path[:path...])
    #[arg(long, global = true, env = "MODGRAPH_MODULEPATH")]
    pub modulepath: Option<String>,

    /// Base URL of the release registry
    #[arg(long, global = true, env = "MODGRAPH_REGISTRY")]
    pub registry: Option<String>,

    /// Read registry releases from a directory of `<module>.json` files
    #[arg(long, global = true, hide = true)]
    pub source: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install a module and its dependencies
    Install {
        #[command(flatten)]
        target: ModuleArgs,
        /// Install into this directory instead of the first module path entry
        #[arg(long)]
        target_dir: Option<PathBuf>,
    },

    /// Upgrade an installed module in place
    Upgrade {
        #[command(flatten)]
        target: ModuleArgs,
        /// Upgrade even if the module has local modifications
        #[arg(long)]
        ignore_changes: bool,
    },

    /// List installed modules
    List,
}

/// Arguments shared by `install` and `upgrade`.
#[derive(Args, Debug)]
pub struct ModuleArgs {
    /// Module name (e.g., alice-apollo or alice/apollo)
    pub module: String,
    /// Version range to install (e.g., 1.x, ">= 1.2.0 < 2.0.0")
    #[arg(long)]
    pub version: Option<String>,
    /// Only touch the named module, ignoring installed modules
    #[arg(short, long)]
    pub force: bool,
    /// Do not install or upgrade dependencies
    #[arg(long)]
    pub ignore_dependencies: bool,
}

/// Parse CLI arguments from `std::env::args`.
pub fn parse() -> Cli {
    Cli::parse()
}
